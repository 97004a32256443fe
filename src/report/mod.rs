//! Report module - aggregating, displaying and packaging experiment results

pub mod bundle;
pub mod results;
pub mod summary;

pub use bundle::*;
pub use results::*;
pub use summary::*;
