//! Engine error types

use thiserror::Error;

/// Errors from resolving a settings snapshot
///
/// Out-of-range numbers are never an error: they are clamped. Only values
/// that cannot be interpreted at all end up here, and the tick that saw them
/// is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// A float field holds NaN or an infinity
    #[error("setting {field} is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f64 },
}
