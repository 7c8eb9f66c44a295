//! Error types, re-exported from the shared `lfc-error` crate.

pub use lfc_error::{LfcError, Result};
