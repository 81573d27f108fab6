use thiserror::Error;

use crate::domain::Field;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown {field} option: {value:?}")]
    UnknownOption { field: Field, value: String },
    #[error("unknown form profile: {0:?} (expected regional or campus)")]
    UnknownProfile(String),
}

impl FormError {
    pub fn unknown_option(field: Field, value: impl Into<String>) -> Self {
        Self::UnknownOption {
            field,
            value: value.into(),
        }
    }
}
