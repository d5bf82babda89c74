//! Inbound message decoding and dispatch.
//!
//! Clients send JSON text frames shaped `{ "type": "...", "data": { ... } }`.
//! Two kinds of traffic arrive on the same endpoint: dashboards subscribing
//! to a scope, and participant sessions reporting their own progress. A
//! participant session is never registered as a subscriber — it names the
//! scope in each payload and the broadcaster fans the event out to whoever
//! is watching that scope.

use chrono::Utc;

use crate::monitoring::event::{
    MonitoringEvent, ParticipantCompletedData, ParticipantDisqualifiedData, ParticipantErrorData,
    ParticipantLoginData, ParticipantQuotaExceededData, ParticipantResponseSavedData,
    ParticipantStepData, ScopeConnectedData,
};
use crate::state::AppState;

use serde::Deserialize;

/// Closed set of recognized inbound messages.
/// Anything else is logged and acknowledged without action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    SubscribeToMonitoring(SubscribePayload),
    ParticipantLogin(LoginPayload),
    ParticipantStep(StepPayload),
    ParticipantDisqualified(DisqualifiedPayload),
    ParticipantQuotaExceeded(QuotaExceededPayload),
    ParticipantResponseSaved(ResponseSavedPayload),
    ParticipantCompleted(CompletedPayload),
    ParticipantError(ErrorPayload),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub scope_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub scope_id: String,
    pub participant_id: String,
    pub email: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPayload {
    pub scope_id: String,
    pub participant_id: String,
    pub step_name: String,
    pub progress: f64,
    #[serde(default)]
    pub step_number: Option<u32>,
    #[serde(default)]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisqualifiedPayload {
    pub scope_id: String,
    pub participant_id: String,
    pub reason: String,
    #[serde(default)]
    pub disqualification_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaExceededPayload {
    pub scope_id: String,
    pub participant_id: String,
    pub quota_type: String,
    pub quota_value: String,
    #[serde(default)]
    pub current_count: Option<u32>,
    #[serde(default)]
    pub max_quota: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSavedPayload {
    pub scope_id: String,
    pub participant_id: String,
    pub question_key: String,
    pub step_number: u32,
    pub total_steps: u32,
    pub progress: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPayload {
    pub scope_id: String,
    pub participant_id: String,
    #[serde(default)]
    pub total_duration: Option<f64>,
    #[serde(default)]
    pub responses_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub scope_id: String,
    pub participant_id: String,
    pub error: String,
    #[serde(default)]
    pub step_name: Option<String>,
}

/// Build the monitoring event corresponding to a participant message,
/// stamping it with the given timestamp. Returns None for the subscribe
/// message, which carries no event of its own.
pub fn event_from_message(message: ClientMessage, timestamp: String) -> Option<MonitoringEvent> {
    match message {
        ClientMessage::SubscribeToMonitoring(_) => None,
        ClientMessage::ParticipantLogin(p) => {
            Some(MonitoringEvent::ParticipantLogin(ParticipantLoginData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                email: p.email,
                user_agent: p.user_agent,
                timestamp,
            }))
        }
        ClientMessage::ParticipantStep(p) => {
            Some(MonitoringEvent::ParticipantStep(ParticipantStepData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                step_name: p.step_name,
                progress: p.progress,
                step_number: p.step_number,
                total_steps: p.total_steps,
                duration: p.duration,
                timestamp,
            }))
        }
        ClientMessage::ParticipantDisqualified(p) => Some(
            MonitoringEvent::ParticipantDisqualified(ParticipantDisqualifiedData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                reason: p.reason,
                disqualification_type: p.disqualification_type,
                timestamp,
            }),
        ),
        ClientMessage::ParticipantQuotaExceeded(p) => Some(
            MonitoringEvent::ParticipantQuotaExceeded(ParticipantQuotaExceededData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                quota_type: p.quota_type,
                quota_value: p.quota_value,
                current_count: p.current_count,
                max_quota: p.max_quota,
                timestamp,
            }),
        ),
        ClientMessage::ParticipantResponseSaved(p) => Some(
            MonitoringEvent::ParticipantResponseSaved(ParticipantResponseSavedData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                question_key: p.question_key,
                step_number: p.step_number,
                total_steps: p.total_steps,
                progress: p.progress,
                timestamp,
            }),
        ),
        ClientMessage::ParticipantCompleted(p) => Some(MonitoringEvent::ParticipantCompleted(
            ParticipantCompletedData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                total_duration: p.total_duration,
                responses_count: p.responses_count,
                timestamp,
            },
        )),
        ClientMessage::ParticipantError(p) => {
            Some(MonitoringEvent::ParticipantError(ParticipantErrorData {
                scope_id: p.scope_id,
                participant_id: p.participant_id,
                error: p.error,
                step_name: p.step_name,
                timestamp,
            }))
        }
    }
}

/// Handle an incoming text (JSON) frame from one connection.
///
/// All failure paths are absorbed here: malformed JSON, unrecognized types,
/// and broadcast errors are logged and acknowledged without ever closing
/// the session or surfacing an error to the peer.
pub async fn handle_text_message(
    raw: &str,
    state: &AppState,
    connection_id: &str,
    scope: &mut Option<String>,
) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "Malformed JSON message, ignoring"
            );
            return;
        }
    };

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("<missing>")
        .to_string();

    // Any inbound application message counts as activity for TTL purposes.
    state.registry.touch(connection_id).await;

    let message = match serde_json::from_value::<ClientMessage>(value) {
        Ok(message) => message,
        Err(e) => {
            // Forward-compatible no-op: unknown types are never an error
            // to the peer.
            tracing::warn!(
                connection_id = %connection_id,
                message_type = %kind,
                scope_id = scope.as_deref().unwrap_or("<none>"),
                error = %e,
                "Unrecognized message, ignoring"
            );
            return;
        }
    };

    match message {
        ClientMessage::SubscribeToMonitoring(subscribe) => {
            state
                .registry
                .register(connection_id, &subscribe.scope_id)
                .await;
            *scope = Some(subscribe.scope_id.clone());
            tracing::info!(
                connection_id = %connection_id,
                scope_id = %subscribe.scope_id,
                "Dashboard subscribed to monitoring"
            );

            // Let already-connected dashboards see the new watcher.
            let event = MonitoringEvent::ScopeConnected(ScopeConnectedData {
                scope_id: subscribe.scope_id.clone(),
                connection_id: connection_id.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            });
            state.broadcaster.broadcast(&subscribe.scope_id, &event).await;
        }
        participant_message => {
            // Participant traffic: broadcast to the scope named in the
            // payload. The sender itself is typically not a registered
            // subscriber.
            if let Some(event) =
                event_from_message(participant_message, Utc::now().to_rfc3339())
            {
                let delivered = state.broadcaster.broadcast(event.scope_id(), &event).await;
                tracing::debug!(
                    connection_id = %connection_id,
                    message_type = %kind,
                    delivered = delivered,
                    "Participant event broadcast"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_subscribe_message() {
        let raw = json!({
            "type": "subscribe-to-monitoring",
            "data": { "scopeId": "study-1" }
        });
        match serde_json::from_value::<ClientMessage>(raw).unwrap() {
            ClientMessage::SubscribeToMonitoring(p) => assert_eq!(p.scope_id, "study-1"),
            other => panic!("Expected subscribe, got {:?}", other),
        }
    }

    #[test]
    fn decodes_step_message_with_optional_fields_absent() {
        let raw = json!({
            "type": "participant-step",
            "data": {
                "scopeId": "study-1",
                "participantId": "p1",
                "stepName": "welcome_screen",
                "progress": 40
            }
        });
        match serde_json::from_value::<ClientMessage>(raw).unwrap() {
            ClientMessage::ParticipantStep(p) => {
                assert_eq!(p.participant_id, "p1");
                assert_eq!(p.progress, 40.0);
                assert!(p.step_number.is_none());
            }
            other => panic!("Expected step, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let raw = json!({ "type": "not-a-real-type", "data": {} });
        assert!(serde_json::from_value::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        // participant-login without participantId
        let raw = json!({
            "type": "participant-login",
            "data": { "scopeId": "study-1", "email": "p@example.com" }
        });
        assert!(serde_json::from_value::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn step_message_maps_to_step_event() {
        let message = ClientMessage::ParticipantStep(StepPayload {
            scope_id: "study-1".to_string(),
            participant_id: "p1".to_string(),
            step_name: "welcome_screen".to_string(),
            progress: 40.0,
            step_number: Some(2),
            total_steps: Some(5),
            duration: None,
        });
        let event =
            event_from_message(message, "2026-08-30T12:00:00+00:00".to_string()).unwrap();
        assert_eq!(event.kind(), "participant-step");
        assert_eq!(event.scope_id(), "study-1");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["timestamp"], "2026-08-30T12:00:00+00:00");
        assert_eq!(value["data"]["stepNumber"], 2);
    }

    #[test]
    fn subscribe_carries_no_event() {
        let message = ClientMessage::SubscribeToMonitoring(SubscribePayload {
            scope_id: "study-1".to_string(),
        });
        assert!(event_from_message(message, String::new()).is_none());
    }
}
