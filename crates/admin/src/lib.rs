//! User, role and onboarding administration for the Elimu QA API
//!
//! Covers the RBAC screens of the console: user CRUD, role CRUD,
//! permission-to-role assignment, moving a user between institutions,
//! and onboarding a new school. A user carries zero or more role
//! assignments, each scoped to a jurisdiction (county, sub-county or a
//! single institution).

use log::warn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use chrono::{DateTime, Utc};

/// Result type
pub type Result<T> = std::result::Result<T, AdminError>;

/// Error type
#[derive(thiserror::Error, Debug)]
pub enum AdminError {
    #[error("API error: {message} (Status: {status})")]
    ApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl AdminError {
    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            AdminError::ApiError { message, .. } => message.clone(),
            AdminError::Validation(message) => message.clone(),
            AdminError::NetworkError(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

async fn api_error(response: reqwest::Response) -> AdminError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(text);
    AdminError::ApiError { message, status }
}

/// A role grantable to users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// A named permission assignable to roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Whether a role assignment is currently in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Suspended,
}

/// The scope a role assignment applies within
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub county: Option<String>,
    pub sub_county: Option<String>,
    pub institution_id: Option<Uuid>,
}

/// One role granted to a user, with its scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    pub status: AssignmentStatus,
    pub jurisdiction: Jurisdiction,
}

/// A console user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub assignments: Vec<RoleAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a user
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub jurisdiction: Jurisdiction,
}

/// Partial update for a user
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Payload for creating a role
#[derive(Debug, Clone, Serialize)]
pub struct NewRole {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update for a role
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for moving a user to another institution
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub to_institution_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// A county as served by the onboarding lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct County {
    pub id: Uuid,
    pub name: String,
}

/// A sub-county within a county
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCounty {
    pub id: Uuid,
    pub county_id: Uuid,
    pub name: String,
}

/// A registered school
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub county: String,
    pub sub_county: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The school onboarding form.
///
/// The sub-county select depends on the chosen county, so changing the
/// county clears any sub-county picked under the previous one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OnboardingForm {
    pub school_name: String,
    pub county: String,
    pub sub_county: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

impl OnboardingForm {
    pub fn new(school_name: &str) -> Self {
        Self {
            school_name: school_name.to_string(),
            ..Self::default()
        }
    }

    /// Choose a county; any previously chosen sub-county is cleared.
    pub fn set_county(&mut self, county: &str) {
        self.county = county.to_string();
        self.sub_county = String::new();
    }

    pub fn set_sub_county(&mut self, sub_county: &str) {
        self.sub_county = sub_county.to_string();
    }

    pub fn contact_email(&mut self, email: &str) {
        self.contact_email = Some(email.to_string());
    }

    pub fn contact_phone(&mut self, phone: &str) {
        self.contact_phone = Some(phone.to_string());
    }

    /// Name, county and sub-county are all required before registration.
    pub fn validate(&self) -> Result<()> {
        if self.school_name.trim().is_empty() {
            return Err(AdminError::Validation(
                "the school name is required".to_string(),
            ));
        }
        if self.county.trim().is_empty() {
            return Err(AdminError::Validation("a county is required".to_string()));
        }
        if self.sub_county.trim().is_empty() {
            return Err(AdminError::Validation(
                "a sub-county is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client for the user/role/permission administration endpoints
pub struct AdminClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl AdminClient {
    /// Create an admin client. `base_url` includes the API prefix.
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

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let response = self.request(self.http_client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| AdminError::DeserializationError(e.to_string()))
    }

    async fn send_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<T> {
        let response = self.request(builder).json(body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| AdminError::DeserializationError(e.to_string()))
    }

    /// List every user visible to the caller.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.get_json(&format!("{}/users", self.base_url)).await
    }

    /// List users, degrading to an empty collection on failure.
    pub async fn list_users_or_empty(&self) -> Vec<User> {
        match self.list_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!("user fetch failed, rendering empty list: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.get_json(&format!("{}/users/{}", self.base_url, id))
            .await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        let url = format!("{}/users", self.base_url);
        self.send_json(self.http_client.post(&url), user).await
    }

    pub async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<User> {
        let url = format!("{}/users/{}", self.base_url, id);
        self.send_json(self.http_client.put(&url), update).await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/users/{}", self.base_url, id);
        let response = self.request(self.http_client.delete(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Move a user to another institution. The backend re-scopes the
    /// user's institution-level assignments as part of the move.
    pub async fn transfer_user(&self, user_id: Uuid, transfer: &TransferRequest) -> Result<User> {
        let url = format!("{}/users/{}/transfer", self.base_url, user_id);
        self.send_json(self.http_client.post(&url), transfer).await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.get_json(&format!("{}/roles", self.base_url)).await
    }

    pub async fn create_role(&self, role: &NewRole) -> Result<Role> {
        let url = format!("{}/roles", self.base_url);
        self.send_json(self.http_client.post(&url), role).await
    }

    pub async fn update_role(&self, id: Uuid, update: &RoleUpdate) -> Result<Role> {
        let url = format!("{}/roles/{}", self.base_url, id);
        self.send_json(self.http_client.put(&url), update).await
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/roles/{}", self.base_url, id);
        let response = self.request(self.http_client.delete(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.get_json(&format!("{}/permissions", self.base_url))
            .await
    }

    /// Replace the permission set attached to a role.
    pub async fn assign_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> Result<Role> {
        let url = format!("{}/roles/{}/permissions", self.base_url, role_id);
        let payload = serde_json::json!({ "permission_ids": permission_ids });
        self.send_json(self.http_client.post(&url), &payload).await
    }
}

/// Client for the onboarding endpoints
pub struct OnboardingClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl OnboardingClient {
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

    /// Counties feeding the first onboarding select.
    pub async fn counties(&self) -> Result<Vec<County>> {
        let url = format!("{}/counties", self.base_url);
        let response = self.request(self.http_client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<Vec<County>>()
            .await
            .map_err(|e| AdminError::DeserializationError(e.to_string()))
    }

    /// Sub-counties of one county, feeding the dependent select.
    pub async fn subcounties(&self, county_id: Uuid) -> Result<Vec<SubCounty>> {
        let url = Url::parse(&format!(
            "{}/counties/{}/subcounties",
            self.base_url, county_id
        ))?;
        let response = self.request(self.http_client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<Vec<SubCounty>>()
            .await
            .map_err(|e| AdminError::DeserializationError(e.to_string()))
    }

    /// Validate the form and register the school. Validation failures
    /// return before any request is built.
    pub async fn register(&self, form: &OnboardingForm) -> Result<Institution> {
        form.validate()?;
        let url = format!("{}/institutions", self.base_url);
        let response = self
            .request(self.http_client.post(&url))
            .json(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<Institution>()
            .await
            .map_err(|e| AdminError::DeserializationError(e.to_string()))
    }
}
