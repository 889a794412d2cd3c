//! Store-boundary traits for ostrich backends.

mod opener;
mod store;

pub use opener::*;
pub use store::*;
