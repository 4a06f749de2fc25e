//! Value-model error types.

use thiserror::Error;

/// Errors raised by typed access into a [`crate::Variant`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
