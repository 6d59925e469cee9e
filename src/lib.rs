//! Elimu QA Rust Client Library
//!
//! A Rust client for the Elimu QA backend, the school-facility
//! quality-assurance API behind the administration console. It covers
//! facility and entity management, assessment intake and listing, the
//! tiered review workflow, user/role administration, school onboarding,
//! and tabular exports of whatever a list screen is showing.
//!
//! The backend owns all business state; everything here is a typed
//! consumption layer over its REST collections.

pub mod config;
pub mod error;
pub mod session;

use log::warn;
use reqwest::Client;

pub use elimu_qa_admin as admin;
pub use elimu_qa_assessments as assessments;
pub use elimu_qa_export as export;
pub use elimu_qa_facilities as facilities;
pub use elimu_qa_review as review;
pub use elimu_qa_table as table;

use crate::admin::{AdminClient, OnboardingClient};
use crate::assessments::{AssessmentKind, AssessmentsClient};
use crate::config::ClientOptions;
use crate::facilities::{EntitiesClient, FacilitiesClient, MetricsClient};
use crate::review::ReviewClient;

/// The main entry point for the Elimu QA client
pub struct ElimuQa {
    /// The base URL of the Elimu QA deployment
    pub url: String,
    /// The API key issued for this console
    pub key: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Client options
    pub options: ClientOptions,
}

impl ElimuQa {
    /// Create a new Elimu QA client
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the Elimu QA deployment
    /// * `api_key` - The API key issued for this console
    ///
    /// # Example
    ///
    /// ```
    /// use elimu_qa::ElimuQa;
    ///
    /// let client = ElimuQa::new("https://qa.elimu.example", "your-api-key");
    /// ```
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::new_with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new Elimu QA client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use elimu_qa::{config::ClientOptions, ElimuQa};
    ///
    /// let options = ClientOptions::default().with_api_prefix("/api/v2");
    /// let client = ElimuQa::new_with_options("https://qa.elimu.example", "your-api-key", options);
    /// ```
    pub fn new_with_options(base_url: &str, api_key: &str, options: ClientOptions) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().unwrap_or_else(|e| {
            warn!("failed to build configured HTTP client, using defaults: {}", e);
            Client::new()
        });

        Self {
            url: base_url.trim_end_matches('/').to_string(),
            key: api_key.to_string(),
            http_client,
            options,
        }
    }

    /// The prefixed URL every service collection hangs off.
    fn service_url(&self) -> String {
        format!("{}{}", self.url, self.options.api_prefix)
    }

    /// Client for the facilities collection
    pub fn facilities(&self) -> FacilitiesClient {
        FacilitiesClient::new(&self.service_url(), &self.key, self.http_client.clone())
    }

    /// Client for the entities collection
    pub fn entities(&self) -> EntitiesClient {
        EntitiesClient::new(&self.service_url(), &self.key, self.http_client.clone())
    }

    /// Client for the school-metrics collection
    pub fn metrics(&self) -> MetricsClient {
        MetricsClient::new(&self.service_url(), &self.key, self.http_client.clone())
    }

    /// Client for one assessment collection (maintenance or safety)
    ///
    /// # Example
    ///
    /// ```
    /// use elimu_qa::assessments::AssessmentKind;
    /// use elimu_qa::ElimuQa;
    ///
    /// let client = ElimuQa::new("https://qa.elimu.example", "your-api-key");
    /// let maintenance = client.assessments(AssessmentKind::Maintenance);
    /// ```
    pub fn assessments(&self, kind: AssessmentKind) -> AssessmentsClient {
        AssessmentsClient::new(&self.service_url(), &self.key, kind, self.http_client.clone())
    }

    /// Client for the review workflow endpoint
    pub fn review(&self) -> ReviewClient {
        ReviewClient::new(&self.service_url(), &self.key, self.http_client.clone())
    }

    /// Client for user, role and permission administration
    pub fn admin(&self) -> AdminClient {
        AdminClient::new(&self.service_url(), &self.key, self.http_client.clone())
    }

    /// Client for school onboarding and the county lookups behind it
    pub fn onboarding(&self) -> OnboardingClient {
        OnboardingClient::new(&self.service_url(), &self.key, self.http_client.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::session::InstitutionCache;
    pub use crate::ElimuQa;

    pub use crate::assessments::{
        with_facility_names, AssessmentForm, AssessmentKind, AssessmentRecord, Condition,
        FacilityType, ListFilters, ReviewStatus,
    };
    pub use crate::export::{file_name, to_csv, to_docx, to_pdf, to_xlsx, ExportFormat};
    pub use crate::review::{
        surface_for_role, transition, Priority, ReviewDecision, ReviewForm, ReviewSurface,
        ReviewerTier,
    };
    pub use crate::table::{Column, SortOrder, TableSnapshot, TableView};
}
