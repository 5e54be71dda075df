use axum::{extract::State, response::Response, routing::post, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, Payload},
    services::leads::LeadSubmission,
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadCreatedResponse {
    pub success: bool,
    #[schema(example = "Request received.")]
    pub message: String,
    pub lead_id: i32,
}

/// Form fields read from the body; anything else is kept verbatim in the lead's metadata.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct CreateLeadRequest {
    /// `callback`, `consultation` or `feedback`; other values are filed as feedback
    #[serde(rename = "type")]
    pub lead_type: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/leads",
    summary = "Submit a contact form",
    description = "Accepts JSON or form-encoded bodies. Requires a name and a phone or email.",
    request_body(content = CreateLeadRequest, content_type = "application/json"),
    responses(
        (status = 201, description = "Lead recorded", body = LeadCreatedResponse),
        (status = 400, description = "Missing name or contact, or malformed body", body = crate::errors::ErrorResponse),
    ),
    tag = "Leads"
)]
pub async fn create_lead(
    State(state): State<AppState>,
    Payload(payload): Payload,
) -> Result<Response, ServiceError> {
    let lead = state
        .services
        .leads
        .create_lead(LeadSubmission::from_payload(&payload))
        .await?;

    Ok(created_response(LeadCreatedResponse {
        success: true,
        message: "Request received.".to_string(),
        lead_id: lead.id,
    }))
}

/// Lead routes
pub fn lead_routes() -> Router<AppState> {
    Router::new().route("/", post(create_lead))
}
