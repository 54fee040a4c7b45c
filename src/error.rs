// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while loading, drawing or encoding a comparison.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}, column {column}: '{token}' is not a number")]
    Parse {
        line: usize,
        column: usize,
        token: String,
    },

    #[error("line {line}: expected {expected} values, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("no data rows found")]
    Empty,

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<CompareError>,
    },

    #[error("column window {start}..{end} is empty for {n_points} points")]
    EmptyWindow {
        start: usize,
        end: usize,
        n_points: usize,
    },

    #[error("windows differ in width: {control} (control) vs {other} ({condition})")]
    WidthMismatch {
        condition: &'static str,
        control: usize,
        other: usize,
    },

    #[error("{what} at column {column} is outside the window width {width}")]
    ProbeOutOfRange {
        what: &'static str,
        column: f64,
        width: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("plot error: {0}")]
    Plot(String),

    #[error("frame has {found} bytes, expected {expected}")]
    FrameSize { expected: usize, found: usize },

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompareError>;

impl CompareError {
    /// Wrap an I/O error with the path it happened on.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Stringify a plotting backend error.
    pub fn plot(e: impl std::fmt::Display) -> Self {
        Self::Plot(e.to_string())
    }
}
