//! Operator control surface
//!
//! Runs beside the assistant: edits the persona file, supervises the
//! assistant process, and tracks a status light from its events.

pub mod console;
mod status;
mod supervisor;

pub use console::{Command, Console};
pub use status::{Light, Status, StatusIndicator};
pub use supervisor::{ChildCommand, Supervisor};
