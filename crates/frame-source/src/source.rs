//! Frame source trait abstraction

use crate::{Frame, MonitorInfo, SourceResult};

/// Pixel acquisition boundary.
///
/// Implementations are stateful: `capture_frame` grabs from whichever
/// monitor was most recently made active via `set_active_monitor`.
pub trait FrameSource: Send {
    /// Enumerate the monitors currently available.
    ///
    /// Indices in the result are valid only until the next enumeration;
    /// re-enumeration may renumber.
    fn list_monitors(&mut self) -> SourceResult<Vec<MonitorInfo>>;

    /// Capture one frame from the active monitor (blocking).
    fn capture_frame(&mut self) -> SourceResult<Frame>;

    /// Retarget subsequent captures to `index` from the last enumeration.
    fn set_active_monitor(&mut self, index: usize) -> SourceResult<()>;
}
