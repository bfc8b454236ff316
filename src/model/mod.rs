//! Core data types

mod hash;

pub use hash::{ContentHash, HashingWriter};
