//! Writing build output to disk.

pub mod writer;

pub use writer::{write_assets_to, write_file_atomic};
