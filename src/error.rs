//! Error types.
//!
//! Errors come in two tiers. [`ProviderError`] and [`TraversalError`] are
//! per-file: the driver records them and moves on to the next file.
//! [`ExtractError`] is pipeline-level and aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a program for one file.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },

    #[error("failed to load grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax tree nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Failure while walking one file's syntax tree.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("malformed {kind} at line {line}: missing `{field}`")]
    MalformedNode {
        kind: &'static str,
        field: &'static str,
        line: usize,
    },

    #[error("syntax tree nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

impl TraversalError {
    pub fn missing(node: tree_sitter::Node, field: &'static str) -> Self {
        TraversalError::MalformedNode {
            kind: node.kind(),
            field,
            line: node.start_position().row + 1,
        }
    }
}

/// Per-file failure as recorded in the run report.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error(transparent)]
    Unify(#[from] ExtractError),
}

/// Unrecoverable pipeline failure.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    pub fn invariant(message: impl Into<String>) -> Self {
        ExtractError::Invariant(message.into())
    }
}
