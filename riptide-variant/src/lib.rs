//! # riptide-variant
//!
//! The tagged-union value tree shared by riptide's codecs.
//!
//! This crate provides:
//! - The [`Variant`] tree type (int, bool, real, byte string, list, dict)
//! - Owned vs. borrowed byte strings as an explicit sum type ([`VariantStr`])
//! - Type-checked accessors that fail with [`VariantError::TypeMismatch`]
//! - A non-recursive tree walk ([`walk`]) used by every serializer

pub mod error;
pub mod string;
pub mod variant;
pub mod walk;

pub use error::VariantError;
pub use string::VariantStr;
pub use variant::Variant;
pub use walk::{walk, WalkHandler};
