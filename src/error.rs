//! Error types for the requisition engine
//!
//! Problems with the *typed line* are never errors in the `Result` sense:
//! they are reported as a [`Status`](crate::Status) plus message on the
//! offending assignment, tagged with a [`DiagnosticKind`]. The `thiserror`
//! enums here cover the places where a caller really gets an `Err`:
//! catalog registration, configuration loading, and the error half of an
//! execution outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of an assignment diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No registered command matches the typed name
    UnknownCommand,
    /// A required parameter has no argument yet
    MissingRequiredParameter,
    /// The argument text could not be converted to the parameter type
    ConversionError,
    /// More arguments than the command accepts, or an unknown option
    OverflowArgument,
}

/// Errors raised while building a command catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("Command '{command}' needs parent command '{parent}' to be registered first")]
    MissingParent { command: String, parent: String },

    #[error("Command name must not be empty")]
    EmptyName,

    #[error("Command '{command}' declares parameter '{param}' twice")]
    DuplicateParameter { command: String, param: String },

    #[error("Command '{command}': flag '{flag}' is used by more than one parameter")]
    DuplicateFlag { command: String, flag: String },

    #[error("Command '{command}': only one rest-of-line parameter is allowed")]
    MultipleRestParameters { command: String },

    #[error("Command '{command}': parameter '{param}' of type {kind} cannot take the rest of the line")]
    InvalidRestType {
        command: String,
        param: String,
        kind: String,
    },

    #[error("Command '{command}': rest-of-line parameter '{param}' must be the last positional parameter")]
    RestNotLast { command: String, param: String },

    #[error("Command '{command}': parameter '{param}' cannot be required and have a default")]
    RequiredWithDefault { command: String, param: String },

    #[error("Command '{command}': default for '{param}' is invalid: {message}")]
    InvalidDefault {
        command: String,
        param: String,
        message: String,
    },

    #[error("Command '{command}': parameter '{param}' is a selection with no options")]
    EmptySelection { command: String, param: String },
}

/// Errors raised while loading a YAML command catalog
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Command '{command}' refers to unknown handler '{handler}'")]
    UnknownHandler { command: String, handler: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Failure half of an execution outcome
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionError {
    #[error("{0}")]
    UnknownCommand(String),

    #[error("{0}")]
    Handler(String),

    #[error("Command '{0}' returned a deferred reply without deferring")]
    NotDeferred(String),

    #[error("Command '{0}' was abandoned before it completed")]
    Abandoned(String),
}
