pub mod engine;

pub use engine::{classify, matching_variants};
