//! Model module - classifier training, evaluation, persistence, and replay

pub mod artifact;
pub mod classifier;
pub mod evaluation;
pub mod features;
pub mod inference;
pub mod trainer;

pub use artifact::*;
pub use classifier::*;
pub use evaluation::*;
pub use features::*;
pub use inference::*;
pub use trainer::*;
