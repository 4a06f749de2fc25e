//! # riptide-benc
//!
//! The compact binary (bencode) codec.
//!
//! This crate provides:
//! - A non-recursive parser from bytes to [`riptide_variant::Variant`] trees
//! - A canonical, key-sorted, non-recursive serializer
//! - Atomic save / load helpers for the persisted-state file format

pub mod decode;
pub mod encode;
pub mod error;
pub mod file;

pub use decode::decode;
pub use encode::encode;
pub use error::DecodeError;
pub use file::{load_file, save_file, FileError};
