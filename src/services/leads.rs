use crate::{
    entities::lead::{self, Entity as LeadEntity, LeadType},
    errors::ServiceError,
    services::cart::text_field,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

/// Contact-form submission after trimming, ready for validation.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "require_contact"))]
pub struct LeadSubmission {
    pub lead_type: LeadType,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    /// The payload exactly as received, kept in the lead's `meta`
    pub raw_payload: Value,
}

impl LeadSubmission {
    /// Reads a decoded JSON or form payload.
    ///
    /// The lead type comes from `type`, falling back to `lead_type`.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let requested_type = match text_field(payload.get("type")) {
            t if !t.is_empty() => t,
            _ => text_field(payload.get("lead_type")),
        };

        Self {
            lead_type: LeadType::from_form_value(&requested_type),
            name: text_field(payload.get("name")),
            email: text_field(payload.get("email")),
            phone: text_field(payload.get("phone")),
            message: text_field(payload.get("message")),
            raw_payload: Value::Object(payload.clone()),
        }
    }
}

fn require_contact(submission: &LeadSubmission) -> Result<(), ValidationError> {
    if submission.phone.is_empty() && submission.email.is_empty() {
        let mut err = ValidationError::new("contact_required");
        err.message = Some("Phone or email is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Clone)]
pub struct LeadService {
    db: Arc<DatabaseConnection>,
}

impl LeadService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Stores a new, unprocessed lead.
    ///
    /// # Errors
    ///
    /// * `ServiceError::ValidationError` - name missing, or neither phone nor email given
    /// * `ServiceError::DatabaseError` - insert failed
    #[instrument(skip(self, submission), fields(lead_type = %submission.lead_type))]
    pub async fn create_lead(
        &self,
        submission: LeadSubmission,
    ) -> Result<lead::Model, ServiceError> {
        submission.validate()?;

        let lead = lead::ActiveModel {
            lead_type: Set(submission.lead_type),
            name: Set(submission.name),
            email: Set(submission.email),
            phone: Set(submission.phone),
            message: Set(submission.message),
            meta: Set(Some(json!({
                "source": "frontend",
                "raw_payload": submission.raw_payload,
            }))),
            processed: Set(false),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(lead_id = lead.id, "Lead recorded");
        Ok(lead)
    }

    /// Lists leads, unprocessed first and newest first within each group.
    #[instrument(skip(self))]
    pub async fn list_leads(&self, processed: Option<bool>) -> Result<Vec<lead::Model>, ServiceError> {
        let mut query = LeadEntity::find();
        if let Some(processed) = processed {
            query = query.filter(lead::Column::Processed.eq(processed));
        }
        Ok(query
            .order_by_asc(lead::Column::Processed)
            .order_by_desc(lead::Column::CreatedAt)
            .order_by_desc(lead::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Marks a lead handled (or not). Leads are otherwise immutable.
    ///
    /// # Errors
    ///
    /// * `ServiceError::NotFound` - no lead with this id
    #[instrument(skip(self))]
    pub async fn set_processed(&self, id: i32, processed: bool) -> Result<lead::Model, ServiceError> {
        let lead = LeadEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Lead {id} not found")))?;

        let mut active: lead::ActiveModel = lead.into();
        active.processed = Set(processed);
        let lead = active.update(&*self.db).await?;
        info!(lead_id = id, processed, "Lead status changed");
        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn type_falls_back_to_lead_type_then_feedback() {
        let s = LeadSubmission::from_payload(&payload(json!({"lead_type": "callback"})));
        assert_eq!(s.lead_type, LeadType::Callback);

        let s = LeadSubmission::from_payload(&payload(
            json!({"type": "consultation", "lead_type": "callback"}),
        ));
        assert_eq!(s.lead_type, LeadType::Consultation);

        let s = LeadSubmission::from_payload(&payload(json!({})));
        assert_eq!(s.lead_type, LeadType::Feedback);
    }

    #[test]
    fn fields_are_trimmed_and_payload_kept() {
        let raw = json!({"name": "  Ann ", "phone": " +7 900 ", "extra": 1});
        let s = LeadSubmission::from_payload(&payload(raw.clone()));
        assert_eq!(s.name, "Ann");
        assert_eq!(s.phone, "+7 900");
        assert_eq!(s.raw_payload, raw);
    }

    #[test]
    fn validation_requires_name_and_a_contact() {
        let no_name = LeadSubmission::from_payload(&payload(json!({"name": " ", "phone": "1"})));
        assert_matches!(
            ServiceError::from(no_name.validate().unwrap_err()),
            ServiceError::ValidationError(msg) if msg == "Name is required"
        );

        let no_contact = LeadSubmission::from_payload(&payload(json!({"name": "Ann"})));
        assert_matches!(
            ServiceError::from(no_contact.validate().unwrap_err()),
            ServiceError::ValidationError(msg) if msg == "Phone or email is required"
        );

        let ok = LeadSubmission::from_payload(&payload(json!({"name": "Ann", "email": "a@b.c"})));
        assert!(ok.validate().is_ok());
    }
}
