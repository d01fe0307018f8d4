//! Core trait definitions for pluggable collaborators.

pub mod clock;
pub mod renderer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use renderer::{DocumentRenderer, RenderedDocument};
