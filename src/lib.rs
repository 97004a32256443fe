//! hfpipe: heart-failure survival experiment pipeline
//!
//! Loads the clinical records dataset, derives feature sets, trains random
//! forests and multilayer perceptrons under stratified splits, and collects
//! the evaluation metrics of every experiment into comparable reports.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
