//! Error handling for the Elimu QA client

use std::fmt;
use thiserror::Error;

use elimu_qa_admin::AdminError;
use elimu_qa_assessments::AssessmentsError;
use elimu_qa_export::ExportError;
use elimu_qa_facilities::FacilitiesError;
use elimu_qa_review::ReviewError;
use elimu_qa_table::TableError;

/// Unified error type for the Elimu QA client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Filesystem errors from the local session cache
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Facility, entity and school-metric errors
    #[error("Facilities error: {0}")]
    Facilities(#[from] FacilitiesError),

    /// Assessment intake and listing errors
    #[error("Assessments error: {0}")]
    Assessments(#[from] AssessmentsError),

    /// Review workflow errors
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// User, role and onboarding administration errors
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Snapshot export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Table view errors
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            Error::Facilities(e) => e.user_message(),
            Error::Assessments(e) => e.user_message(),
            Error::Review(e) => e.user_message(),
            Error::Admin(e) => e.user_message(),
            Error::Export(e) => e.user_message(),
            Error::Table(e) => e.user_message(),
            Error::Http(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            Error::General(msg) => msg.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}
