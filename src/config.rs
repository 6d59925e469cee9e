//! Configuration options for the Elimu QA client

use std::time::Duration;

/// Configuration options for the Elimu QA client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout applied to the shared HTTP client
    pub request_timeout: Option<Duration>,

    /// Path prefix every service collection lives under
    pub api_prefix: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            api_prefix: "/api/v1".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the API path prefix
    pub fn with_api_prefix(mut self, value: &str) -> Self {
        self.api_prefix = value.to_string();
        self
    }
}
