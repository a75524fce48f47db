//! Per-page media control engine: discovers media elements, attaches an
//! overlay to each, resolves and applies playback speed, and drives A/B
//! loops, intro/outro skips, shortcuts and persistence through a settings
//! service.

pub mod ab_loop;
pub mod actions;
mod app;
pub mod commands;
pub mod discovery;
pub mod effects;
pub mod error;
pub mod guard;
pub mod host;
pub mod message;
pub mod navigation;
pub mod overlay;
pub mod pitch;
pub mod resolve;
pub mod rules;
pub mod service;
pub mod settings;
pub mod skip;
pub mod state;
pub mod store;
mod trace;
pub mod tracker;

pub use actions::LoopPoint;
pub use discovery::MutationRecord;
pub use state::{Engine, EngineConfig, EngineStatus};
