//! Context-invalidation guard around the host channel.
//!
//! The channel can die at any moment without an event (extension reloaded or
//! updated while the page stays open). Every outbound call goes through
//! [`ContextGuard::request`]: a dead channel trips the latch instead of
//! raising, and the caller reads [`Reply::Unavailable`].

use std::cell::Cell;

use crate::host::HostChannel;
use crate::message::{Request, Response};

/// Outcome of a guarded round-trip.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply<T> {
    Value(T),
    NotFound,
    /// Channel failed or is gone; treat as a neutral result.
    Unavailable,
}

#[derive(Debug)]
pub struct ContextGuard<C> {
    channel: C,
    tripped: Cell<bool>,
}

impl<C: HostChannel> ContextGuard<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            tripped: Cell::new(false),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Latched once the channel has been found dead.
    pub fn is_tripped(&self) -> bool {
        self.tripped.get()
    }

    fn trip(&self, why: &str) {
        if !self.tripped.replace(true) {
            log::warn!("[GUARD] host context invalidated ({}), shutting down", why);
        }
    }

    pub async fn request(&self, request: Request) -> Reply<Response> {
        if self.tripped.get() {
            return Reply::Unavailable;
        }
        if !self.channel.is_alive() {
            self.trip("liveness probe failed");
            return Reply::Unavailable;
        }
        let kind = request.kind();
        match self.channel.send(request).await {
            Ok(Response::Error { message }) => {
                log::warn!("[GUARD] `{}` rejected by host: {}", kind, message);
                Reply::Unavailable
            }
            Ok(response) => Reply::Value(response),
            Err(e) => {
                if e.is_fatal() || !self.channel.is_alive() {
                    self.trip(&e.to_string());
                } else {
                    log::debug!("[GUARD] `{}` failed: {}", kind, e);
                }
                Reply::Unavailable
            }
        }
    }

    /// Fire-and-forget write; failures only matter through the latch.
    pub async fn notify(&self, request: Request) {
        let _ = self.request(request).await;
    }
}
