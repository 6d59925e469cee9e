//! Facility assessment intake and listing for the Elimu QA API
//!
//! An assessment is a dated inspection of one facility: every part of the
//! building is rated Good / Attention / Urgent, optional feedback and
//! supporting files are attached, and the whole thing is posted to the
//! backend as `multipart/form-data`. The backend computes the summary
//! counts and the score; this crate never aggregates ratings itself.
//!
//! The condition and review-status vocabularies are deliberately lenient
//! on input: the historical record contains several spellings of the same
//! label (`needs-attention`, `attention required`, `Attention Required`),
//! and all of them must keep deserializing. Output always uses the
//! canonical spelling.

use log::warn;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use chrono::{DateTime, NaiveDate, Utc};

/// Result type
pub type Result<T> = std::result::Result<T, AssessmentsError>;

/// Detail block of a backend API error
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Error type
#[derive(Error, Debug)]
pub enum AssessmentsError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: ApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AssessmentsError {
    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            AssessmentsError::ApiError { details, .. } => details
                .message
                .clone()
                .unwrap_or_else(|| "The server rejected the request.".to_string()),
            AssessmentsError::UnparsedApiError { message, .. } => message.clone(),
            AssessmentsError::NetworkError(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            AssessmentsError::InvalidParameters(message) => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

async fn api_error(response: reqwest::Response) -> AssessmentsError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    match serde_json::from_str::<ApiErrorDetails>(&text) {
        Ok(details) => AssessmentsError::ApiError { details, status },
        Err(_) => AssessmentsError::UnparsedApiError {
            message: text,
            status,
        },
    }
}

/// Condition rating for one part of a building.
///
/// Canonical labels are `Good`, `Attention` and `Urgent Attention`; every
/// legacy spelling found in stored records parses to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Good,
    Attention,
    Urgent,
}

/// Raised when a condition or status label is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized label: {0}")]
pub struct UnknownLabel(pub String);

impl Condition {
    /// Canonical wire and display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Good => "Good",
            Condition::Attention => "Attention",
            Condition::Urgent => "Urgent Attention",
        }
    }

    /// Label shown for a record's overall condition on the list screens.
    pub fn overall_label(&self) -> &'static str {
        match self {
            Condition::Good => "Good",
            Condition::Attention => "Needs Attention",
            Condition::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "good" => Ok(Condition::Good),
            "attention" | "needs attention" | "attention required" => Ok(Condition::Attention),
            "urgent" | "critical" | "urgent attention" => Ok(Condition::Urgent),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Where an assessment sits in the review chain.
///
/// The authoritative state machine is server-side; this is the client's
/// typed view of the status strings it renders and patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewStatus {
    PendingCounty,
    PendingNational,
    Approved,
    Rejected,
    Disbursed,
    RequiresClarification,
}

impl ReviewStatus {
    /// Canonical wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::PendingCounty => "pending-county",
            ReviewStatus::PendingNational => "pending-national",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Disbursed => "disbursed",
            ReviewStatus::RequiresClarification => "requires-clarification",
        }
    }

    /// Label shown on the status badge in the list screens.
    pub fn badge_label(&self) -> &'static str {
        match self {
            ReviewStatus::PendingCounty => "Pending County Review",
            ReviewStatus::PendingNational => "Pending National Review",
            ReviewStatus::Approved => "Approved",
            ReviewStatus::Rejected => "Rejected",
            ReviewStatus::Disbursed => "Disbursed",
            ReviewStatus::RequiresClarification => "Requires Clarification",
        }
    }

    /// Terminal states accept no further review decisions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReviewStatus::Approved | ReviewStatus::Rejected | ReviewStatus::Disbursed
        )
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "pending" | "pending county" => Ok(ReviewStatus::PendingCounty),
            "pending national" => Ok(ReviewStatus::PendingNational),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "disbursed" => Ok(ReviewStatus::Disbursed),
            "requires clarification" | "clarification" | "needs clarification" => {
                Ok(ReviewStatus::RequiresClarification)
            }
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl Serialize for ReviewStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReviewStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Facility category, keying the fixed checklist of parts to rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacilityType {
    Classroom,
    Laboratory,
    Dormitory,
    Library,
    Kitchen,
    Sanitation,
    AdminBlock,
    Other,
}

impl FacilityType {
    /// Canonical wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityType::Classroom => "classroom",
            FacilityType::Laboratory => "laboratory",
            FacilityType::Dormitory => "dormitory",
            FacilityType::Library => "library",
            FacilityType::Kitchen => "kitchen",
            FacilityType::Sanitation => "sanitation",
            FacilityType::AdminBlock => "admin-block",
            FacilityType::Other => "other",
        }
    }

    /// The checklist of building parts rated for this facility type, in
    /// the order the intake form presents them. The catalog is fixed:
    /// changing it changes every historical comparison, so additions go
    /// through the backend team first.
    pub fn parts(&self) -> &'static [&'static str] {
        match self {
            FacilityType::Classroom => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Windows",
                "Paintwork",
                "Lighting",
                "Furniture",
            ],
            FacilityType::Laboratory => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Windows",
                "Workbenches",
                "Gas Lines",
                "Water Supply",
                "Fume Chamber",
            ],
            FacilityType::Dormitory => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Windows",
                "Beds",
                "Ventilation",
                "Fire Escapes",
            ],
            FacilityType::Library => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Windows",
                "Shelving",
                "Reading Area",
            ],
            FacilityType::Kitchen => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Stoves",
                "Chimney",
                "Food Store",
                "Drainage",
            ],
            FacilityType::Sanitation => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Water Supply",
                "Drainage",
                "Hand-washing Points",
            ],
            FacilityType::AdminBlock => &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Windows",
                "Paintwork",
                "Furniture",
            ],
            FacilityType::Other => &["Walls", "Roof", "Doors", "Floor", "Windows"],
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacilityType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "classroom" => Ok(FacilityType::Classroom),
            "laboratory" | "lab" => Ok(FacilityType::Laboratory),
            "dormitory" => Ok(FacilityType::Dormitory),
            "library" => Ok(FacilityType::Library),
            "kitchen" => Ok(FacilityType::Kitchen),
            "sanitation" => Ok(FacilityType::Sanitation),
            "admin block" => Ok(FacilityType::AdminBlock),
            "other" => Ok(FacilityType::Other),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl Serialize for FacilityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FacilityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Which assessment collection a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentKind {
    Maintenance,
    Safety,
}

impl AssessmentKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            AssessmentKind::Maintenance => "maintenance",
            AssessmentKind::Safety => "safety",
        }
    }
}

/// One rated part of a building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDetail {
    pub part_of_building: String,
    pub assessment_status: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// A stored assessment record as the list and review screens consume it.
///
/// Summary counts and the score are computed server-side from the detail
/// rows; `facility_name` is filled in client-side from the facilities
/// lookup and never serialized back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub school_name: String,
    pub facility_id: Uuid,
    pub facility_type: FacilityType,
    #[serde(skip)]
    pub facility_name: Option<String>,
    pub assessment_date: NaiveDate,
    pub urgent_items: u32,
    pub attention_items: u32,
    pub good_items: u32,
    pub total_items: u32,
    pub overall_condition: Condition,
    pub status: ReviewStatus,
    pub school_feedback: Option<String>,
    pub agent_feedback: Option<String>,
    pub score_percent: Option<f32>,
    #[serde(default)]
    pub details: Vec<AssessmentDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fill in display names from the facilities lookup. Records whose
/// facility id has no entry get an em-dash placeholder so the table cell
/// is never blank.
pub fn with_facility_names(records: &mut [AssessmentRecord], names: &HashMap<Uuid, String>) {
    for record in records.iter_mut() {
        record.facility_name = Some(
            names
                .get(&record.facility_id)
                .cloned()
                .unwrap_or_else(|| "—".to_string()),
        );
    }
}

/// Server-side filters for the assessment list screens
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub institution_id: Option<Uuid>,
    pub facility_type: Option<FacilityType>,
    pub status: Option<ReviewStatus>,
}

impl ListFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn institution(mut self, institution_id: Uuid) -> Self {
        self.institution_id = Some(institution_id);
        self
    }

    pub fn facility_type(mut self, facility_type: FacilityType) -> Self {
        self.facility_type = Some(facility_type);
        self
    }

    pub fn status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// A file attached to an assessment submission
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Client for one assessment collection (maintenance or safety)
pub struct AssessmentsClient {
    base_url: String,
    api_key: String,
    kind: AssessmentKind,
    access_token: Option<String>,
    http_client: Client,
}

impl AssessmentsClient {
    /// Create a client for `kind`. `base_url` includes the API prefix.
    pub fn new(base_url: &str, api_key: &str, kind: AssessmentKind, http_client: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            kind,
            access_token: None,
            http_client,
        }
    }

    /// Attach a bearer token to every request from this client.
    pub fn with_auth(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn kind(&self) -> AssessmentKind {
        self.kind
    }

    fn collection_url(&self) -> String {
        format!("{}/assessments/{}", self.base_url, self.kind.path_segment())
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.api_key);
        match &self.access_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Fetch assessment records, optionally narrowed server-side.
    pub async fn list(&self, filters: &ListFilters) -> Result<Vec<AssessmentRecord>> {
        let mut url = Url::parse(&self.collection_url())?;
        let has_filters = filters.institution_id.is_some()
            || filters.facility_type.is_some()
            || filters.status.is_some();
        if has_filters {
            let mut query_pairs = url.query_pairs_mut();
            if let Some(institution_id) = filters.institution_id {
                query_pairs.append_pair("institution_id", &institution_id.to_string());
            }
            if let Some(facility_type) = filters.facility_type {
                query_pairs.append_pair("facility_type", facility_type.as_str());
            }
            if let Some(status) = filters.status {
                query_pairs.append_pair("status", status.as_str());
            }
        }

        let response = self.request(self.http_client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<Vec<AssessmentRecord>>()
            .await
            .map_err(|e| AssessmentsError::DeserializationError(e.to_string()))
    }

    /// Fetch records, degrading to an empty collection on failure.
    pub async fn list_or_empty(&self, filters: &ListFilters) -> Vec<AssessmentRecord> {
        match self.list(filters).await {
            Ok(records) => records,
            Err(e) => {
                warn!("assessment fetch failed, rendering empty list: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch one record by id.
    pub async fn get(&self, id: Uuid) -> Result<AssessmentRecord> {
        let url = format!("{}/{}", self.collection_url(), id);
        let response = self.request(self.http_client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<AssessmentRecord>()
            .await
            .map_err(|e| AssessmentsError::DeserializationError(e.to_string()))
    }

    async fn submit_multipart(&self, form: Form) -> Result<Option<AssessmentRecord>> {
        let response = self
            .request(self.http_client.post(&self.collection_url()))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let body = response
            .text()
            .await
            .map_err(|e| AssessmentsError::DeserializationError(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<AssessmentRecord>(&body)
            .map(Some)
            .map_err(|e| AssessmentsError::DeserializationError(e.to_string()))
    }
}

/// The intake form for one facility assessment.
///
/// Constructing the form pre-populates one `Good` rating per checklist
/// part, in catalog order, matching the radio defaults on screen.
#[derive(Debug, Clone)]
pub struct AssessmentForm {
    facility_type: FacilityType,
    facility_id: Uuid,
    institution_id: Uuid,
    assessment_date: NaiveDate,
    ratings: Vec<(String, Condition)>,
    school_feedback: Option<String>,
    files: Vec<FileAttachment>,
}

impl AssessmentForm {
    pub fn new(
        facility_type: FacilityType,
        facility_id: Uuid,
        institution_id: Uuid,
        assessment_date: NaiveDate,
    ) -> Self {
        let ratings = facility_type
            .parts()
            .iter()
            .map(|part| (part.to_string(), Condition::Good))
            .collect();
        Self {
            facility_type,
            facility_id,
            institution_id,
            assessment_date,
            ratings,
            school_feedback: None,
            files: Vec::new(),
        }
    }

    pub fn facility_type(&self) -> FacilityType {
        self.facility_type
    }

    /// The parts of the building this form rates, in presentation order.
    pub fn parts(&self) -> Vec<&str> {
        self.ratings.iter().map(|(part, _)| part.as_str()).collect()
    }

    /// Rate one part. The part must belong to the facility type's catalog.
    pub fn rate(&mut self, part: &str, condition: Condition) -> Result<()> {
        let slot = self
            .ratings
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(part))
            .ok_or_else(|| {
                AssessmentsError::InvalidParameters(format!(
                    "{} is not a rated part of a {}",
                    part, self.facility_type
                ))
            })?;
        slot.1 = condition;
        Ok(())
    }

    /// Free-text feedback from the school.
    pub fn feedback(&mut self, text: &str) {
        self.school_feedback = Some(text.to_string());
    }

    /// Attach a supporting file from memory.
    pub fn attach(&mut self, file_name: &str, content: Vec<u8>) {
        self.files.push(FileAttachment {
            file_name: file_name.to_string(),
            content,
        });
    }

    /// Attach a supporting file from disk.
    pub async fn attach_path(&mut self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                AssessmentsError::InvalidParameters(format!(
                    "{} has no file name",
                    path.display()
                ))
            })?;
        let content = tokio::fs::read(path).await?;
        self.files.push(FileAttachment { file_name, content });
        Ok(())
    }

    /// The detail rows as they will be submitted, in catalog order.
    pub fn details(&self) -> Vec<AssessmentDetail> {
        self.ratings
            .iter()
            .map(|(part, condition)| AssessmentDetail {
                part_of_building: part.clone(),
                assessment_status: *condition,
                score: None,
            })
            .collect()
    }

    /// Encode the draft as `multipart/form-data` and post it.
    ///
    /// The wire contract indexes each detail row as
    /// `details[i][part_of_building]` / `details[i][assessment_status]`
    /// and repeats `files[]` per attachment. Summary counts are not sent;
    /// the backend derives them from the details.
    pub async fn submit(&self, client: &AssessmentsClient) -> Result<Option<AssessmentRecord>> {
        let mut form = Form::new()
            .text("institution_id", self.institution_id.to_string())
            .text("facility_id", self.facility_id.to_string())
            .text("facility_type", self.facility_type.as_str())
            .text("assessment_date", self.assessment_date.to_string());
        if let Some(feedback) = &self.school_feedback {
            form = form.text("school_feedback", feedback.clone());
        }
        for (i, (part, condition)) in self.ratings.iter().enumerate() {
            form = form
                .text(format!("details[{}][part_of_building]", i), part.clone())
                .text(
                    format!("details[{}][assessment_status]", i),
                    condition.as_str(),
                );
        }
        for file in &self.files {
            let part = Part::bytes(file.content.clone()).file_name(file.file_name.clone());
            form = form.part("files[]", part);
        }
        client.submit_multipart(form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record_json(id: Uuid, facility_id: Uuid, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "institution_id": Uuid::new_v4(),
            "school_name": "Kibera Primary",
            "facility_id": facility_id,
            "facility_type": "classroom",
            "assessment_date": "2024-03-14",
            "urgent_items": 1,
            "attention_items": 2,
            "good_items": 5,
            "total_items": 8,
            "overall_condition": "needs-attention",
            "status": status,
            "school_feedback": "Roof leaks during rains",
            "agent_feedback": null,
            "score_percent": 72.5,
            "details": [
                { "part_of_building": "Roof", "assessment_status": "urgent" },
                { "part_of_building": "Walls", "assessment_status": "Good" }
            ],
            "created_at": "2024-03-14T10:00:00Z",
            "updated_at": "2024-03-14T10:00:00Z"
        })
    }

    #[test]
    fn condition_accepts_every_legacy_spelling() {
        for spelling in ["needs-attention", "attention required", "Attention Required", "attention"] {
            assert_eq!(spelling.parse::<Condition>().unwrap(), Condition::Attention);
        }
        for spelling in ["urgent", "critical", "Urgent Attention"] {
            assert_eq!(spelling.parse::<Condition>().unwrap(), Condition::Urgent);
        }
        assert_eq!("good".parse::<Condition>().unwrap(), Condition::Good);
        assert!("pristine".parse::<Condition>().is_err());

        // Canonical spelling on the way out.
        assert_eq!(
            serde_json::to_string(&Condition::Urgent).unwrap(),
            "\"Urgent Attention\""
        );
        assert_eq!(Condition::Attention.overall_label(), "Needs Attention");
    }

    #[test]
    fn review_status_parses_and_labels() {
        assert_eq!(
            "pending".parse::<ReviewStatus>().unwrap(),
            ReviewStatus::PendingCounty
        );
        assert_eq!(
            "requires_clarification".parse::<ReviewStatus>().unwrap(),
            ReviewStatus::RequiresClarification
        );
        assert_eq!(
            ReviewStatus::PendingNational.badge_label(),
            "Pending National Review"
        );
        assert!(ReviewStatus::Disbursed.is_terminal());
        assert!(!ReviewStatus::PendingCounty.is_terminal());
    }

    #[test]
    fn classroom_checklist_has_eight_parts_in_fixed_order() {
        let parts = FacilityType::Classroom.parts();
        assert_eq!(parts.len(), 8);
        assert_eq!(
            parts,
            &[
                "Walls",
                "Roof",
                "Doors",
                "Floor",
                "Windows",
                "Paintwork",
                "Lighting",
                "Furniture"
            ]
        );
    }

    #[test]
    fn untouched_form_submits_all_good_in_catalog_order() {
        let form = AssessmentForm::new(
            FacilityType::Classroom,
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        );
        assert_eq!(form.parts(), FacilityType::Classroom.parts());
        let details = form.details();
        assert_eq!(details.len(), 8);
        assert!(details
            .iter()
            .all(|d| d.assessment_status == Condition::Good));
        let parts: Vec<&str> = details.iter().map(|d| d.part_of_building.as_str()).collect();
        assert_eq!(parts, FacilityType::Classroom.parts());
    }

    #[test]
    fn rating_an_unknown_part_is_rejected() {
        let mut form = AssessmentForm::new(
            FacilityType::Classroom,
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        );
        assert!(form.rate("Fume Chamber", Condition::Urgent).is_err());
        form.rate("roof", Condition::Urgent).expect("case-insensitive part");
        let details = form.details();
        let roof = details
            .iter()
            .find(|d| d.part_of_building == "Roof")
            .unwrap();
        assert_eq!(roof.assessment_status, Condition::Urgent);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let mock_server = MockServer::start().await;
        let facility_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/assessments/maintenance"))
            .and(query_param("facility_type", "classroom"))
            .and(query_param("status", "pending-county"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([record_json(
                Uuid::new_v4(),
                facility_id,
                "pending-county"
            )])))
            .mount(&mock_server)
            .await;

        let client = AssessmentsClient::new(
            &mock_server.uri(),
            "fake-key",
            AssessmentKind::Maintenance,
            Client::new(),
        );
        let filters = ListFilters::new()
            .facility_type(FacilityType::Classroom)
            .status(ReviewStatus::PendingCounty);
        let records = client.list(&filters).await.expect("list failed");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReviewStatus::PendingCounty);
        assert_eq!(records[0].overall_condition, Condition::Attention);
        assert_eq!(records[0].details[0].assessment_status, Condition::Urgent);
    }

    #[tokio::test]
    async fn test_list_error_parses_details() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/assessments/safety"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "42501",
                "message": "permission denied"
            })))
            .mount(&mock_server)
            .await;

        let client = AssessmentsClient::new(
            &mock_server.uri(),
            "fake-key",
            AssessmentKind::Safety,
            Client::new(),
        );
        let result = client.list(&ListFilters::new()).await;
        match result {
            Err(AssessmentsError::ApiError { details, status }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(details.message.as_deref(), Some("permission denied"));
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_or_empty_swallows_failures() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/assessments/maintenance"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = AssessmentsClient::new(
            &mock_server.uri(),
            "fake-key",
            AssessmentKind::Maintenance,
            Client::new(),
        );
        assert!(client.list_or_empty(&ListFilters::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_posts_multipart() {
        let mock_server = MockServer::start().await;
        let facility_id = Uuid::new_v4();

        // Matching the multipart body byte-for-byte is brittle under
        // wiremock; the content-type header and path carry the contract.
        Mock::given(method("POST"))
            .and(path("/assessments/maintenance"))
            .and(header("apikey", "fake-key"))
            .respond_with(ResponseTemplate::new(201).set_body_json(record_json(
                Uuid::new_v4(),
                facility_id,
                "pending-county",
            )))
            .mount(&mock_server)
            .await;

        let client = AssessmentsClient::new(
            &mock_server.uri(),
            "fake-key",
            AssessmentKind::Maintenance,
            Client::new(),
        );
        let mut form = AssessmentForm::new(
            FacilityType::Classroom,
            facility_id,
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        );
        form.rate("Roof", Condition::Urgent).unwrap();
        form.feedback("Roof leaks during rains");
        form.attach("roof.jpg", vec![0xFF, 0xD8, 0xFF]);

        let created = form.submit(&client).await.expect("submit failed");
        let record = created.expect("expected the created record back");
        assert_eq!(record.status, ReviewStatus::PendingCounty);
    }

    #[tokio::test]
    async fn test_submit_tolerates_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assessments/safety"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&mock_server)
            .await;

        let client = AssessmentsClient::new(
            &mock_server.uri(),
            "fake-key",
            AssessmentKind::Safety,
            Client::new(),
        );
        let form = AssessmentForm::new(
            FacilityType::Sanitation,
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        );
        let created = form.submit(&client).await.expect("submit failed");
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn attach_path_reads_the_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("roof.jpg");
        tokio::fs::write(&file_path, b"not really a jpeg").await.unwrap();

        let mut form = AssessmentForm::new(
            FacilityType::Classroom,
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        );
        form.attach_path(&file_path).await.expect("attach failed");
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].file_name, "roof.jpg");
        assert_eq!(form.files[0].content, b"not really a jpeg");
    }

    #[test]
    fn facility_name_join_uses_placeholder_for_missing_ids() {
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let mut records: Vec<AssessmentRecord> = vec![
            serde_json::from_value(record_json(Uuid::new_v4(), known, "approved")).unwrap(),
            serde_json::from_value(record_json(Uuid::new_v4(), unknown, "approved")).unwrap(),
        ];
        let mut names = HashMap::new();
        names.insert(known, "Classroom Block A".to_string());

        with_facility_names(&mut records, &names);
        assert_eq!(records[0].facility_name.as_deref(), Some("Classroom Block A"));
        assert_eq!(records[1].facility_name.as_deref(), Some("—"));
    }
}
