//! Pipeline module - feature-engineering stages and their orchestration

pub mod binning;
pub mod columns;
pub mod data;
pub mod encoding;
pub mod imputer;
pub mod loader;
pub mod missing;
pub mod outliers;
pub mod scaling;
pub mod splitter;

pub use binning::*;
pub use columns::*;
pub use data::*;
pub use encoding::*;
pub use imputer::*;
pub use loader::*;
pub use missing::*;
pub use outliers::*;
pub use scaling::*;
pub use splitter::*;
