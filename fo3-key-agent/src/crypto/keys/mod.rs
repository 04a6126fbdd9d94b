//! Hierarchical key derivation shared by the chain drivers

mod derivation;

pub use derivation::*;
