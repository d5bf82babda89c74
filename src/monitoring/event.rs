//! Monitoring events pushed to subscribed dashboards.
//!
//! Wire shape is `{ "type": "...", "data": { ... } }` with kebab-case type
//! tags and camelCase data fields. Every payload carries an RFC 3339
//! `timestamp` so dashboards can treat each event as a self-contained
//! update — no cross-event ordering is guaranteed.

use serde::{Deserialize, Serialize};

/// Closed set of events a dashboard can receive. Immutable after
/// construction; values carry no reference back to any connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum MonitoringEvent {
    /// A dashboard subscribed to the scope.
    ScopeConnected(ScopeConnectedData),
    ParticipantLogin(ParticipantLoginData),
    ParticipantStep(ParticipantStepData),
    ParticipantDisqualified(ParticipantDisqualifiedData),
    ParticipantQuotaExceeded(ParticipantQuotaExceededData),
    ParticipantResponseSaved(ParticipantResponseSavedData),
    ParticipantCompleted(ParticipantCompletedData),
    ParticipantError(ParticipantErrorData),
}

impl MonitoringEvent {
    /// The scope (study/research ID) this event belongs to.
    pub fn scope_id(&self) -> &str {
        match self {
            Self::ScopeConnected(d) => &d.scope_id,
            Self::ParticipantLogin(d) => &d.scope_id,
            Self::ParticipantStep(d) => &d.scope_id,
            Self::ParticipantDisqualified(d) => &d.scope_id,
            Self::ParticipantQuotaExceeded(d) => &d.scope_id,
            Self::ParticipantResponseSaved(d) => &d.scope_id,
            Self::ParticipantCompleted(d) => &d.scope_id,
            Self::ParticipantError(d) => &d.scope_id,
        }
    }

    /// Wire tag, for log context.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScopeConnected(_) => "scope-connected",
            Self::ParticipantLogin(_) => "participant-login",
            Self::ParticipantStep(_) => "participant-step",
            Self::ParticipantDisqualified(_) => "participant-disqualified",
            Self::ParticipantQuotaExceeded(_) => "participant-quota-exceeded",
            Self::ParticipantResponseSaved(_) => "participant-response-saved",
            Self::ParticipantCompleted(_) => "participant-completed",
            Self::ParticipantError(_) => "participant-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeConnectedData {
    pub scope_id: String,
    pub connection_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLoginData {
    pub scope_id: String,
    pub participant_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStepData {
    pub scope_id: String,
    pub participant_id: String,
    pub step_name: String,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDisqualifiedData {
    pub scope_id: String,
    pub participant_id: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualification_type: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantQuotaExceededData {
    pub scope_id: String,
    pub participant_id: String,
    pub quota_type: String,
    pub quota_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_quota: Option<u32>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponseSavedData {
    pub scope_id: String,
    pub participant_id: String,
    pub question_key: String,
    pub step_number: u32,
    pub total_steps: u32,
    pub progress: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCompletedData {
    pub scope_id: String,
    pub participant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses_count: Option<u32>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantErrorData {
    pub scope_id: String,
    pub participant_id: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_event_wire_shape() {
        let event = MonitoringEvent::ParticipantStep(ParticipantStepData {
            scope_id: "study-1".to_string(),
            participant_id: "p1".to_string(),
            step_name: "welcome_screen".to_string(),
            progress: 40.0,
            step_number: None,
            total_steps: None,
            duration: None,
            timestamp: "2026-08-30T12:00:00+00:00".to_string(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "participant-step");
        assert_eq!(value["data"]["scopeId"], "study-1");
        assert_eq!(value["data"]["participantId"], "p1");
        assert_eq!(value["data"]["stepName"], "welcome_screen");
        assert_eq!(value["data"]["progress"], json!(40.0));
        assert_eq!(value["data"]["timestamp"], "2026-08-30T12:00:00+00:00");
        // Unset optional fields stay off the wire entirely.
        assert!(value["data"].get("stepNumber").is_none());
    }

    #[test]
    fn scope_id_accessor_matches_payload() {
        let event = MonitoringEvent::ScopeConnected(ScopeConnectedData {
            scope_id: "study-9".to_string(),
            connection_id: "conn-1".to_string(),
            timestamp: "2026-08-30T12:00:00+00:00".to_string(),
        });
        assert_eq!(event.scope_id(), "study-9");
        assert_eq!(event.kind(), "scope-connected");
    }
}
