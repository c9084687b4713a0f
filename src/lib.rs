//! Floppy Duck Core Library
//!
//! Fixed-rate simulation, scoring and head-to-head sync for a tap-to-flap
//! obstacle game. Rendering and platform SDKs sit behind the traits in
//! [`services`] and [`net::channel`].
//!
//! # Features
//!
//! - `lobby` - Tournament brackets layered on head-to-head matches (enabled by default)

pub mod config;
pub mod util;
pub mod game;
pub mod net;
pub mod metrics;
pub mod services;
pub mod runner;

#[cfg(feature = "lobby")]
pub mod lobby;
