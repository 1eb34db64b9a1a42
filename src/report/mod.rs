//! Report module - pipeline summaries and evaluation output

pub mod evaluation_export;
pub mod summary;

pub use evaluation_export::*;
pub use summary::*;
