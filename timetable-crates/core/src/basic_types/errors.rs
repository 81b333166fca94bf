use thiserror::Error;

/// Errors raised while parsing the textual references of distribution constraints and
/// preferences.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference does not name any known group constraint type.
    #[error("Unknown group constraint type '{0}'")]
    UnknownGroupConstraint(String),
    /// The reference does not match the grammar of any flexible constraint.
    #[error("Unknown flexible constraint reference '{0}'")]
    UnknownFlexibleConstraint(String),
    /// The reference matched a grammar but one of its parameters could not be parsed.
    #[error("Invalid parameter '{parameter}' in constraint reference '{reference}'")]
    InvalidParameter { reference: String, parameter: String },
    /// The preference is neither a named level nor an integer.
    #[error("Invalid preference '{0}'")]
    InvalidPreference(String),
}

/// Error which indicates that a property could not be interpreted as the requested type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("The value '{value}' of property '{key}' cannot be read as {expected}")]
pub struct PropertyError {
    pub key: String,
    pub value: String,
    pub expected: &'static str,
}

/// Errors which can occur while building a [`TimetableModel`](crate::model::TimetableModel).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Failed to parse a constraint reference: {0}")]
    Reference(#[from] ReferenceError),
    #[error("Failed to read the configuration: {0}")]
    Property(#[from] PropertyError),
    /// A lecture was referenced which was not added to the builder.
    #[error("Unknown lecture with id {0}")]
    UnknownLecture(u64),
    /// A room was referenced which was not added to the builder.
    #[error("Unknown room with id {0}")]
    UnknownRoom(u64),
    /// A lecture has no placement left after the unavailable ones have been removed.
    #[error("Lecture '{0}' has an empty domain")]
    EmptyDomain(String),
    /// A lecture was marked as committed without an initial placement.
    #[error("Lecture '{0}' is committed but has no initial placement")]
    CommittedWithoutPlacement(String),
}
