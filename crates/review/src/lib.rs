//! Assessment review workflow for the Elimu QA API
//!
//! Submitted assessments climb a two-tier approval chain: a county admin
//! reviews first, then a national admin. Either tier can reject or send
//! the record back for clarification; disbursement only ever happens
//! server-side after national approval. The backend enforces the chain;
//! this crate makes the transitions explicit so the screens stop
//! inferring them from raw status strings.
//!
//! A review submission is a single PATCH with no retry and no
//! idempotency key. Validation runs before the request is built, so an
//! incomplete decision form never reaches the network.

use log::info;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use elimu_qa_assessments::{ApiErrorDetails, AssessmentRecord, ReviewStatus};

/// Result type
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Error type
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: ApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{status} is final and accepts no further decisions")]
    TerminalState { status: ReviewStatus },

    #[error("a {tier} reviewer cannot act on a record in {status}")]
    WrongTier {
        tier: ReviewerTier,
        status: ReviewStatus,
    },

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl ReviewError {
    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            ReviewError::ApiError { details, .. } => details
                .message
                .clone()
                .unwrap_or_else(|| "The server rejected the review.".to_string()),
            ReviewError::UnparsedApiError { message, .. } => message.clone(),
            ReviewError::NetworkError(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            ReviewError::Validation(message) => message.clone(),
            ReviewError::TerminalState { .. } | ReviewError::WrongTier { .. } => {
                "This assessment can no longer be reviewed at your level.".to_string()
            }
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

async fn api_error(response: reqwest::Response) -> ReviewError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    match serde_json::from_str::<ApiErrorDetails>(&text) {
        Ok(details) => ReviewError::ApiError { details, status },
        Err(_) => ReviewError::UnparsedApiError {
            message: text,
            status,
        },
    }
}

/// Which rung of the admin hierarchy a reviewer sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewerTier {
    School,
    County,
    National,
}

impl ReviewerTier {
    /// Map a role name from the RBAC data onto a tier.
    pub fn from_role_name(role: &str) -> Option<Self> {
        match role.trim().to_lowercase().as_str() {
            "school_admin" => Some(ReviewerTier::School),
            "county_admin" => Some(ReviewerTier::County),
            "admin" | "national_admin" => Some(ReviewerTier::National),
            _ => None,
        }
    }
}

impl fmt::Display for ReviewerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReviewerTier::School => "school",
            ReviewerTier::County => "county",
            ReviewerTier::National => "national",
        };
        f.write_str(label)
    }
}

/// The decision a reviewer records against an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
    RequestClarification,
}

/// Recommended-action priority attached to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Compute the status an assessment moves to when `tier` records
/// `decision` against a record currently in `current`.
///
/// County approval advances to the national queue; national approval is
/// final. Rejection is final from either pending state. Clarification
/// parks the record until the school resubmits, at which point
/// [`resume_after_clarification`] puts it back in the requesting tier's
/// queue.
pub fn transition(
    current: ReviewStatus,
    tier: ReviewerTier,
    decision: ReviewDecision,
) -> Result<ReviewStatus> {
    if current.is_terminal() {
        return Err(ReviewError::TerminalState { status: current });
    }
    match (current, tier, decision) {
        (ReviewStatus::PendingCounty, ReviewerTier::County, ReviewDecision::Approve) => {
            Ok(ReviewStatus::PendingNational)
        }
        (ReviewStatus::PendingNational, ReviewerTier::National, ReviewDecision::Approve) => {
            Ok(ReviewStatus::Approved)
        }
        (ReviewStatus::PendingCounty, ReviewerTier::County, ReviewDecision::Reject)
        | (ReviewStatus::PendingNational, ReviewerTier::National, ReviewDecision::Reject) => {
            Ok(ReviewStatus::Rejected)
        }
        (
            ReviewStatus::PendingCounty,
            ReviewerTier::County,
            ReviewDecision::RequestClarification,
        )
        | (
            ReviewStatus::PendingNational,
            ReviewerTier::National,
            ReviewDecision::RequestClarification,
        ) => Ok(ReviewStatus::RequiresClarification),
        _ => Err(ReviewError::WrongTier {
            tier,
            status: current,
        }),
    }
}

/// Status a clarified record re-enters when the school resubmits: the
/// queue of the tier that asked for clarification.
pub fn resume_after_clarification(tier: ReviewerTier) -> Result<ReviewStatus> {
    match tier {
        ReviewerTier::County => Ok(ReviewStatus::PendingCounty),
        ReviewerTier::National => Ok(ReviewStatus::PendingNational),
        ReviewerTier::School => Err(ReviewError::Validation(
            "school admins submit assessments, they do not review them".to_string(),
        )),
    }
}

/// Which screen a role lands on when routed to the combined review page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSurface {
    AssessmentList,
    AssessmentReview,
}

/// School admins see their own submissions; county and national admins
/// see the review queue. Unknown roles get the read-only list.
pub fn surface_for_role(role: &str) -> ReviewSurface {
    match ReviewerTier::from_role_name(role) {
        Some(ReviewerTier::County) | Some(ReviewerTier::National) => {
            ReviewSurface::AssessmentReview
        }
        _ => ReviewSurface::AssessmentList,
    }
}

/// The decision form as filled in on the review panel.
#[derive(Debug, Clone, Default)]
pub struct ReviewForm {
    pub decision: Option<ReviewDecision>,
    pub remarks: String,
    pub recommended_action: String,
    pub priority: Option<Priority>,
}

impl ReviewForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decision(mut self, decision: ReviewDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn remarks(mut self, remarks: &str) -> Self {
        self.remarks = remarks.to_string();
        self
    }

    pub fn recommended_action(mut self, action: &str) -> Self {
        self.recommended_action = action.to_string();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// A review needs a decision, remarks and a recommended action before
    /// it may be submitted. Priority stays optional.
    pub fn validate(&self) -> Result<ReviewDecision> {
        let decision = self
            .decision
            .ok_or_else(|| ReviewError::Validation("a review decision is required".to_string()))?;
        if self.remarks.trim().is_empty() {
            return Err(ReviewError::Validation(
                "review remarks are required".to_string(),
            ));
        }
        if self.recommended_action.trim().is_empty() {
            return Err(ReviewError::Validation(
                "a recommended action is required".to_string(),
            ));
        }
        Ok(decision)
    }
}

/// Wire payload of a review PATCH
#[derive(Debug, Clone, Serialize)]
struct ReviewPayload<'a> {
    review_decision: ReviewDecision,
    review_remarks: &'a str,
    recommended_action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
}

/// Client for the review endpoint
pub struct ReviewClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl ReviewClient {
    /// Create a review client. `base_url` includes the API prefix.
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

    /// Validate and submit a review decision for one assessment.
    ///
    /// Validation failures return before any request is built. On success
    /// the server's updated record comes back for an optimistic local
    /// patch; callers still refetch for the authoritative state.
    pub async fn submit(
        &self,
        assessment_id: Uuid,
        form: &ReviewForm,
    ) -> Result<Option<AssessmentRecord>> {
        let decision = form.validate()?;
        let payload = ReviewPayload {
            review_decision: decision,
            review_remarks: form.remarks.trim(),
            recommended_action: form.recommended_action.trim(),
            priority: form.priority,
        };

        let url = format!("{}/assessments/{}/review", self.base_url, assessment_id);
        let mut request = self
            .http_client
            .patch(&url)
            .header("apikey", &self.api_key)
            .json(&payload);
        if let Some(token) = &self.access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        info!("review decision recorded for assessment {}", assessment_id);

        let body = response
            .text()
            .await
            .map_err(|e| ReviewError::DeserializationError(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<AssessmentRecord>(&body)
            .map(Some)
            .map_err(|e| ReviewError::DeserializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn approval_chain_advances_one_tier_at_a_time() {
        let after_county = transition(
            ReviewStatus::PendingCounty,
            ReviewerTier::County,
            ReviewDecision::Approve,
        )
        .unwrap();
        assert_eq!(after_county, ReviewStatus::PendingNational);

        let after_national = transition(
            after_county,
            ReviewerTier::National,
            ReviewDecision::Approve,
        )
        .unwrap();
        assert_eq!(after_national, ReviewStatus::Approved);
    }

    #[test]
    fn either_pending_tier_can_reject() {
        assert_eq!(
            transition(
                ReviewStatus::PendingCounty,
                ReviewerTier::County,
                ReviewDecision::Reject
            )
            .unwrap(),
            ReviewStatus::Rejected
        );
        assert_eq!(
            transition(
                ReviewStatus::PendingNational,
                ReviewerTier::National,
                ReviewDecision::Reject
            )
            .unwrap(),
            ReviewStatus::Rejected
        );
    }

    #[test]
    fn clarification_parks_and_resumes_in_the_requesting_queue() {
        let parked = transition(
            ReviewStatus::PendingNational,
            ReviewerTier::National,
            ReviewDecision::RequestClarification,
        )
        .unwrap();
        assert_eq!(parked, ReviewStatus::RequiresClarification);
        assert_eq!(
            resume_after_clarification(ReviewerTier::National).unwrap(),
            ReviewStatus::PendingNational
        );
        assert!(resume_after_clarification(ReviewerTier::School).is_err());
    }

    #[test]
    fn terminal_states_and_wrong_tiers_are_rejected() {
        assert!(matches!(
            transition(
                ReviewStatus::Approved,
                ReviewerTier::National,
                ReviewDecision::Approve
            ),
            Err(ReviewError::TerminalState { .. })
        ));
        assert!(matches!(
            transition(
                ReviewStatus::Disbursed,
                ReviewerTier::County,
                ReviewDecision::Reject
            ),
            Err(ReviewError::TerminalState { .. })
        ));
        // A national admin cannot jump the county queue.
        assert!(matches!(
            transition(
                ReviewStatus::PendingCounty,
                ReviewerTier::National,
                ReviewDecision::Approve
            ),
            Err(ReviewError::WrongTier { .. })
        ));
        // School admins never review.
        assert!(matches!(
            transition(
                ReviewStatus::PendingCounty,
                ReviewerTier::School,
                ReviewDecision::Approve
            ),
            Err(ReviewError::WrongTier { .. })
        ));
    }

    #[test]
    fn roles_route_to_their_review_surface() {
        assert_eq!(surface_for_role("school_admin"), ReviewSurface::AssessmentList);
        assert_eq!(
            surface_for_role("county_admin"),
            ReviewSurface::AssessmentReview
        );
        assert_eq!(surface_for_role("admin"), ReviewSurface::AssessmentReview);
        assert_eq!(surface_for_role("auditor"), ReviewSurface::AssessmentList);
    }

    #[tokio::test]
    async fn incomplete_form_makes_no_network_call() {
        let mock_server = MockServer::start().await;

        // Any request reaching the server fails the test on drop.
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = ReviewClient::new(&mock_server.uri(), "fake-key", Client::new());

        let missing_decision = ReviewForm::new()
            .remarks("Looks fine")
            .recommended_action("None");
        assert!(matches!(
            client.submit(Uuid::new_v4(), &missing_decision).await,
            Err(ReviewError::Validation(_))
        ));

        let missing_remarks = ReviewForm::new()
            .decision(ReviewDecision::Approve)
            .recommended_action("None");
        assert!(matches!(
            client.submit(Uuid::new_v4(), &missing_remarks).await,
            Err(ReviewError::Validation(_))
        ));

        let missing_action = ReviewForm::new()
            .decision(ReviewDecision::Approve)
            .remarks("Looks fine");
        assert!(matches!(
            client.submit(Uuid::new_v4(), &missing_action).await,
            Err(ReviewError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_patches_the_review_endpoint() {
        let mock_server = MockServer::start().await;
        let assessment_id = Uuid::new_v4();

        let expected_body = json!({
            "review_decision": "approve",
            "review_remarks": "All items verified on site",
            "recommended_action": "Release maintenance funds",
            "priority": "high"
        });
        let updated = json!({
            "id": assessment_id,
            "institution_id": Uuid::new_v4(),
            "school_name": "Kibera Primary",
            "facility_id": Uuid::new_v4(),
            "facility_type": "classroom",
            "assessment_date": "2024-03-14",
            "urgent_items": 1,
            "attention_items": 2,
            "good_items": 5,
            "total_items": 8,
            "overall_condition": "needs-attention",
            "status": "pending-national",
            "school_feedback": null,
            "agent_feedback": "All items verified on site",
            "score_percent": 72.5,
            "details": [],
            "created_at": "2024-03-14T10:00:00Z",
            "updated_at": "2024-03-15T09:00:00Z"
        });

        Mock::given(method("PATCH"))
            .and(path(format!("/assessments/{}/review", assessment_id)))
            .and(body_json(expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(updated))
            .mount(&mock_server)
            .await;

        let client = ReviewClient::new(&mock_server.uri(), "fake-key", Client::new());
        let form = ReviewForm::new()
            .decision(ReviewDecision::Approve)
            .remarks("All items verified on site")
            .recommended_action("Release maintenance funds")
            .priority(Priority::High);

        let result = client.submit(assessment_id, &form).await.expect("submit failed");
        let record = result.expect("expected updated record");
        assert_eq!(record.status, ReviewStatus::PendingNational);
    }

    #[tokio::test]
    async fn test_submit_surfaces_server_rejection() {
        let mock_server = MockServer::start().await;
        let assessment_id = Uuid::new_v4();

        Mock::given(method("PATCH"))
            .and(path(format!("/assessments/{}/review", assessment_id)))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "Assessment already reviewed"
            })))
            .mount(&mock_server)
            .await;

        let client = ReviewClient::new(&mock_server.uri(), "fake-key", Client::new());
        let form = ReviewForm::new()
            .decision(ReviewDecision::Reject)
            .remarks("Photos do not match the report")
            .recommended_action("Re-inspect");

        match client.submit(assessment_id, &form).await {
            Err(ReviewError::ApiError { details, status }) => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(
                    details.message.as_deref(),
                    Some("Assessment already reviewed")
                );
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }
}
