pub mod config;
pub mod event;
pub mod extract;
pub mod format;
pub mod markup;
pub mod truncate;

pub use config::{DiagConfig, TruncationLimits};
pub use event::{DiagEvent, TextLayout, ToolCallRef};
