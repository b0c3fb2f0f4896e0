use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Field `{field}` must not be empty")]
    EmptyField { field: &'static str },
    #[error("Unknown layout mode: {0}")]
    UnknownLayoutMode(String),
}
