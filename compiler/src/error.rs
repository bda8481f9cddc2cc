use std::path::PathBuf;

use thiserror::Error;

use crate::types::Family;

#[derive(Debug, Error)]
pub enum CloudgenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {source}")]
    Json {
        path:   PathBuf,
        source: serde_json::Error,
    },

    #[error("{family} schema violation: {violation}")]
    SchemaViolation {
        family:    Family,
        violation: Violation,
    },

    #[error("{family}: unknown type \"{type_name}\" for field \"{field}\" of \"{owner}\"")]
    UnknownType {
        family:    Family,
        owner:     String,
        field:     String,
        type_name: String,
    },

    #[error("{family}: definition file {path} does not exist")]
    MissingInput {
        family: Family,
        path:   PathBuf,
    },
}

/// The rule a schema document broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("extension ID {id} must be greater than {threshold}")]
    ExtensionIdInBaseRange { id: u32, threshold: u32 },

    #[error("base ID {id} must not be greater than {threshold}")]
    BaseIdInExtensionRange { id: u32, threshold: u32 },

    #[error("ID {0} is defined twice")]
    DuplicateId(u32),

    #[error("struct \"{0}\" is defined by both the base and extension documents")]
    DuplicateStruct(String),

    #[error("enum \"{0}\" is defined by both the base and extension documents")]
    DuplicateEnum(String),

    #[error("name \"{name}\" is used by both ID {first} and ID {second}")]
    DuplicateName { name: String, first: u32, second: u32 },

    #[error("\"{0}\" is not a valid C identifier")]
    InvalidIdentifier(String),

    #[error("recursive nesting of struct \"{0}\" is not allowed")]
    RecursiveStruct(String),

    #[error("ID {0} does not fit in 16 bits")]
    IdTooLarge(u32),

    #[error("key {id} has range {range}, expected 1 to 255")]
    InvalidRange { id: u32, range: u32 },

    #[error("key {id} with range {range} overlaps key {other}")]
    OverlappingRange { id: u32, range: u32, other: u32 },

    #[error("definition {id} (\"{name}\") has no fields")]
    EmptyDefinition { id: u32, name: String },

    #[error("flexible field \"{field}\" must be the last field of \"{owner}\"")]
    FlexibleNotLast { owner: String, field: String },

    #[error("field \"{field}\" of \"{owner}\" is declared multiple times")]
    DuplicateField { owner: String, field: String },

    #[error("base \"{owner}\" references extension struct \"{target}\"")]
    BaseReferencesExtension { owner: String, target: String },
}

impl CloudgenError {
    pub(crate) fn violation(family: Family, violation: Violation) -> Self {
        CloudgenError::SchemaViolation { family, violation }
    }

    /// The rule broken, if this is a schema violation.
    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            CloudgenError::SchemaViolation { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

/// Failure of the external style pass. Never fatal, only logged.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool:   String,
        source: std::io::Error,
    },

    #[error("{tool} exited with {status} on {path}")]
    Status {
        tool:   String,
        status: std::process::ExitStatus,
        path:   PathBuf,
    },
}
