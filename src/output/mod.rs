//! Output abstraction layer that routes to colored, plain, JSON or quiet output.

pub mod context;
pub mod theme;

pub use context::{CaptureBuffer, OutputContext, OutputMode};
pub use theme::Theme;
