use billsync_core::{DateParseError, StoreError};
use std::num::ParseFloatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("CSV file is missing required columns: {}", .missing.join(", "))]
    SchemaValidation { missing: Vec<&'static str> },
    #[error("Error parsing row{}: {row:?}: {reason}", line_suffix(.line))]
    RowParsing {
        line: Option<u64>,
        row: String,
        #[source]
        reason: RowFault,
    },
    #[error("Bill store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Why a single row could not be turned into a bill.
#[derive(Error, Debug)]
pub enum RowFault {
    #[error("invalid amount")]
    InvalidAmount(#[source] ParseFloatError),
    #[error("amount is not a finite number")]
    NonFiniteAmount,
    #[error("missing value for column {0:?}")]
    MissingField(&'static str),
    #[error("unreadable CSV data")]
    Malformed(#[source] csv::Error),
    #[error(transparent)]
    InvalidDate(#[from] DateParseError),
}

impl IngestError {
    /// True when the failure is caused by the uploaded data rather than the
    /// store; transports map these to a client error.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            IngestError::SchemaValidation { .. } | IngestError::RowParsing { .. }
        )
    }
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|n| format!(" {n}")).unwrap_or_default()
}
