//! Facility, entity and school-metric clients for the Elimu QA API
//!
//! Facilities are the physical structure categories a school registers
//! (classrooms, laboratories, dormitories). Entities are the named
//! sub-units inside a facility ("Grade 10 A", "Physics Lab"). School
//! metrics carry the per-term head counts used by the dashboards.
//!
//! The backend owns all of this data; these clients are a thin typed
//! layer over its REST collections.

use log::warn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

use chrono::{DateTime, Utc};

/// Result type
pub type Result<T> = std::result::Result<T, FacilitiesError>;

/// Error type
#[derive(thiserror::Error, Debug)]
pub enum FacilitiesError {
    #[error("API error: {message} (Status: {status})")]
    ApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl FacilitiesError {
    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            FacilitiesError::ApiError { message, .. } => message.clone(),
            FacilitiesError::NetworkError(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Shape of the backend's error body. Anything unparseable is surfaced raw.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

async fn api_error(response: reqwest::Response) -> FacilitiesError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(text);
    FacilitiesError::ApiError { message, status }
}

/// A physical school structure category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub institution_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a facility
#[derive(Debug, Clone, Serialize)]
pub struct NewFacility {
    pub institution_id: Option<Uuid>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Partial update for a facility
#[derive(Debug, Clone, Default, Serialize)]
pub struct FacilityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A named sub-unit within a facility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
    pub total: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating an entity
#[derive(Debug, Clone, Serialize)]
pub struct NewEntity {
    pub facility_id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
    pub total: u32,
}

/// Partial update for an entity
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Per-term head counts for an institution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolMetric {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub students_count: u32,
    pub teachers_count: u32,
    pub year: u16,
    pub term: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for recording school metrics
#[derive(Debug, Clone, Serialize)]
pub struct NewSchoolMetric {
    pub institution_id: Uuid,
    pub students_count: u32,
    pub teachers_count: u32,
    pub year: u16,
    pub term: u8,
}

/// Partial update for school metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchoolMetricUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachers_count: Option<u32>,
}

/// Client for the facilities collection
pub struct FacilitiesClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl FacilitiesClient {
    /// Create a new facilities client. `base_url` includes the API prefix.
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            http_client,
        }
    }

    /// Attach a bearer token to every request from this client.
    pub fn with_auth(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.api_key);
        match &self.access_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// List every facility visible to the caller.
    pub async fn list(&self) -> Result<Vec<Facility>> {
        let url = format!("{}/facilities", self.base_url);
        let response = self.request(self.http_client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let facilities = response
            .json::<Vec<Facility>>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(facilities)
    }

    /// List facilities, degrading to an empty collection on failure.
    ///
    /// The list screens render an empty table rather than blocking on a
    /// failed fetch; the warning keeps the outage visible in the logs.
    pub async fn list_or_empty(&self) -> Vec<Facility> {
        match self.list().await {
            Ok(facilities) => facilities,
            Err(e) => {
                warn!("facility fetch failed, rendering empty list: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch one facility by id.
    pub async fn get(&self, id: Uuid) -> Result<Facility> {
        let url = format!("{}/facilities/{}", self.base_url, id);
        let response = self.request(self.http_client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let facility = response
            .json::<Facility>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(facility)
    }

    /// Register a facility.
    pub async fn create(&self, facility: &NewFacility) -> Result<Facility> {
        let url = format!("{}/facilities", self.base_url);
        let response = self
            .request(self.http_client.post(&url))
            .json(facility)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let created = response
            .json::<Facility>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(created)
    }

    /// Update a facility.
    pub async fn update(&self, id: Uuid, update: &FacilityUpdate) -> Result<Facility> {
        let url = format!("{}/facilities/{}", self.base_url, id);
        let response = self
            .request(self.http_client.put(&url))
            .json(update)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let updated = response
            .json::<Facility>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(updated)
    }

    /// Delete a facility.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/facilities/{}", self.base_url, id);
        let response = self.request(self.http_client.delete(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Build the id-to-name lookup the assessment screens join against.
    pub async fn name_index(&self) -> Result<HashMap<Uuid, String>> {
        let facilities = self.list().await?;
        Ok(facilities.into_iter().map(|f| (f.id, f.name)).collect())
    }
}

/// Client for the entities collection
pub struct EntitiesClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl EntitiesClient {
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            http_client,
        }
    }

    pub fn with_auth(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.api_key);
        match &self.access_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn list_with_query(&self, params: &[(&str, String)]) -> Result<Vec<Entity>> {
        let mut url = Url::parse(&format!("{}/entities", self.base_url))?;
        if !params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }
        let response = self.request(self.http_client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let entities = response
            .json::<Vec<Entity>>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(entities)
    }

    /// List every entity visible to the caller.
    pub async fn list(&self) -> Result<Vec<Entity>> {
        self.list_with_query(&[]).await
    }

    /// List the entities registered under one facility.
    pub async fn list_for_facility(&self, facility_id: Uuid) -> Result<Vec<Entity>> {
        self.list_with_query(&[("facility_id", facility_id.to_string())])
            .await
    }

    /// List the entities belonging to one institution.
    pub async fn list_for_institution(&self, institution_id: Uuid) -> Result<Vec<Entity>> {
        self.list_with_query(&[("institution_id", institution_id.to_string())])
            .await
    }

    pub async fn create(&self, entity: &NewEntity) -> Result<Entity> {
        let url = format!("{}/entities", self.base_url);
        let response = self
            .request(self.http_client.post(&url))
            .json(entity)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let created = response
            .json::<Entity>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, update: &EntityUpdate) -> Result<Entity> {
        let url = format!("{}/entities/{}", self.base_url, id);
        let response = self
            .request(self.http_client.put(&url))
            .json(update)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let updated = response
            .json::<Entity>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/entities/{}", self.base_url, id);
        let response = self.request(self.http_client.delete(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

/// Client for the school-metrics collection
pub struct MetricsClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl MetricsClient {
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            http_client,
        }
    }

    pub fn with_auth(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.api_key);
        match &self.access_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// List the recorded metrics for one institution.
    pub async fn list_for_institution(&self, institution_id: Uuid) -> Result<Vec<SchoolMetric>> {
        let mut url = Url::parse(&format!("{}/school-metrics", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("institution_id", &institution_id.to_string());
        let response = self.request(self.http_client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let metrics = response
            .json::<Vec<SchoolMetric>>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(metrics)
    }

    pub async fn create(&self, metric: &NewSchoolMetric) -> Result<SchoolMetric> {
        let url = format!("{}/school-metrics", self.base_url);
        let response = self
            .request(self.http_client.post(&url))
            .json(metric)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let created = response
            .json::<SchoolMetric>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, update: &SchoolMetricUpdate) -> Result<SchoolMetric> {
        let url = format!("{}/school-metrics/{}", self.base_url, id);
        let response = self
            .request(self.http_client.put(&url))
            .json(update)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let updated = response
            .json::<SchoolMetric>()
            .await
            .map_err(|e| FacilitiesError::DeserializationError(e.to_string()))?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/school-metrics/{}", self.base_url, id);
        let response = self.request(self.http_client.delete(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}
