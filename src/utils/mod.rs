//! Terminal helpers shared by the binary and the long-running pipeline steps

pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;
