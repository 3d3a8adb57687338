//! Frame Source - the pixel acquisition boundary for Framecast
//!
//! Defines the contract the capture session pulls pixels through: monitor
//! enumeration, single-frame grabs, and active-target selection. Platform
//! backends (DXGI desktop duplication, ScreenCaptureKit) live behind the
//! `FrameSource` trait.

mod error;
mod frame;
mod source;

pub use error::*;
pub use frame::*;
pub use source::*;
