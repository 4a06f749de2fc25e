//! # riptide-json
//!
//! The JSON text codec.
//!
//! This crate provides:
//! - A single-pass, depth-bounded streaming parser from bytes to
//!   [`riptide_variant::Variant`] trees
//! - A compact / pretty serializer with locale-independent number formatting
//! - Atomic save / load helpers for JSON settings files

pub mod decode;
pub mod encode;
pub mod error;
pub mod file;

pub use decode::decode;
pub use encode::encode;
pub use error::DecodeError;
pub use file::{load_file, save_file, FileError};
