use thiserror::Error;

use crate::constants::Iteration;

#[derive(Error, Debug)]
pub enum TunerError {
    #[error("External tool failed: `{command}`: {reason}")]
    ExternalTool { command: String, reason: String },

    #[error("Invalid progression file {path}: {reason}")]
    TraceFormat { path: String, reason: String },

    #[error("Progression file contains no iteration: {0}")]
    TraceEmpty(String),

    #[error("Iteration {iteration} is out of range [0, {iteration_count}]")]
    IndexOutOfRange {
        iteration: i64,
        iteration_count: Iteration,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid tube file {path}: {reason}")]
    TubeFormat { path: String, reason: String },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl TunerError {
    pub(crate) fn trace_format(path: impl ToString, reason: impl ToString) -> Self {
        TunerError::TraceFormat {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn tube_format(path: impl ToString, reason: impl ToString) -> Self {
        TunerError::TubeFormat {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl PartialEq for TunerError {
    fn eq(&self, other: &Self) -> bool {
        use TunerError::*;
        match (self, other) {
            (
                ExternalTool {
                    command: c1,
                    reason: r1,
                },
                ExternalTool {
                    command: c2,
                    reason: r2,
                },
            ) => c1 == c2 && r1 == r2,
            (
                TraceFormat {
                    path: p1,
                    reason: r1,
                },
                TraceFormat {
                    path: p2,
                    reason: r2,
                },
            ) => p1 == p2 && r1 == r2,
            (TraceEmpty(a), TraceEmpty(b)) => a == b,
            (
                IndexOutOfRange {
                    iteration: i1,
                    iteration_count: n1,
                },
                IndexOutOfRange {
                    iteration: i2,
                    iteration_count: n2,
                },
            ) => i1 == i2 && n1 == n2,
            (Config(a), Config(b)) => a == b,
            (
                TubeFormat {
                    path: p1,
                    reason: r1,
                },
                TubeFormat {
                    path: p2,
                    reason: r2,
                },
            ) => p1 == p2 && r1 == r2,

            // wrapped errors are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}
