//! Core types for ostrich.

mod context;
mod pattern;
mod result;

pub use context::*;
pub use pattern::*;
pub use result::*;
