//! Capture Session - lifecycle management for Framecast
//!
//! Owns the run/stopped state and the active-monitor selection, drives the
//! periodic frame pump, and delivers frames plus monitor metadata to a
//! single consumer over an ordered, latest-wins channel.

mod commands;
mod delivery;
mod error;
mod session;

pub use commands::*;
pub use delivery::*;
pub use error::*;
pub use session::*;
