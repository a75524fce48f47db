//! Pattern evaluation for URL speed rules, site access and skip site rules.
//!
//! User patterns are tried as case-insensitive regular expressions first. A
//! pattern that fails to compile falls back to a case-insensitive substring
//! match; malformed patterns never surface as errors.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::settings::{Settings, SiteAccessMode, SkipSiteRule, UrlRule};

#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    Substring(String),
}

impl Pattern {
    pub fn compile(pattern: &str) -> Self {
        let mut builder = RegexBuilder::new(pattern);
        builder.case_insensitive(true);
        match builder.build() {
            Ok(regex) => Pattern::Regex(regex),
            Err(e) => {
                log::debug!("Pattern {:?} is not a valid regex ({}), using substring match", pattern, e);
                Pattern::Substring(pattern.to_lowercase())
            }
        }
    }

    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            Pattern::Regex(regex) => regex.is_match(haystack),
            Pattern::Substring(needle) => haystack.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Convenience for one-off evaluation.
pub fn pattern_matches(pattern: &str, haystack: &str) -> bool {
    Pattern::compile(pattern).matches(haystack)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    Disabled,
    Blocklisted,
    NotAllowlisted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub blocked: bool,
    pub reason: Option<BlockReason>,
}

impl AccessDecision {
    fn allowed() -> Self {
        Self {
            blocked: false,
            reason: None,
        }
    }

    fn blocked(reason: BlockReason) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }
}

/// Site access precedence: globally disabled, then the configured mode.
pub fn evaluate_site_access(settings: &Settings, url: &str) -> AccessDecision {
    if !settings.enabled {
        return AccessDecision::blocked(BlockReason::Disabled);
    }
    match settings.site_access_mode {
        SiteAccessMode::AllowAll => AccessDecision::allowed(),
        SiteAccessMode::Allowlist => {
            // An empty allowlist would lock the user out of every site.
            if settings.allowlist.is_empty()
                || settings.allowlist.iter().any(|p| pattern_matches(p, url))
            {
                AccessDecision::allowed()
            } else {
                AccessDecision::blocked(BlockReason::NotAllowlisted)
            }
        }
        SiteAccessMode::Blocklist => {
            if settings.blocklist.iter().any(|p| pattern_matches(p, url)) {
                AccessDecision::blocked(BlockReason::Blocklisted)
            } else {
                AccessDecision::allowed()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRuleMatch {
    pub matched: bool,
    pub speed: Option<f64>,
    pub pattern: Option<String>,
}

impl UrlRuleMatch {
    pub fn none() -> Self {
        Self {
            matched: false,
            speed: None,
            pattern: None,
        }
    }
}

/// First rule whose pattern matches `url` wins.
pub fn find_url_rule(rules: &[UrlRule], url: &str) -> UrlRuleMatch {
    rules
        .iter()
        .find(|rule| pattern_matches(&rule.pattern, url))
        .map(|rule| UrlRuleMatch {
            matched: true,
            speed: Some(rule.speed),
            pattern: Some(rule.pattern.clone()),
        })
        .unwrap_or_else(UrlRuleMatch::none)
}

/// Skip site rules match the hostname exactly or by substring, ignoring case.
pub fn find_skip_rule<'a>(rules: &'a [SkipSiteRule], hostname: &str) -> Option<&'a SkipSiteRule> {
    let host = hostname.to_lowercase();
    rules.iter().find(|rule| {
        let pattern = rule.pattern.trim().to_lowercase();
        !pattern.is_empty() && (host == pattern || host.contains(&pattern))
    })
}

/// Hostname of a page address, empty when the address has none.
pub fn hostname_of(page_url: &str) -> String {
    url::Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
