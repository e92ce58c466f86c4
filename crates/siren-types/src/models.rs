use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is logged in on the connection. There is at most one active identity
/// per connection; responder roles receive targeted alerts, citizens receive
/// updates about alerts they originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Police,
    Firefighter,
}

impl Role {
    /// True for the responder roles (police, firefighter).
    pub fn is_responder(&self) -> bool {
        matches!(self, Role::Police | Role::Firefighter)
    }
}

/// The identity authenticated on the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: Role,
}

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Alert lifecycle status. Transitions run `new -> accepted -> resolved` or
/// `new -> canceled`/`new -> timed_out`; the server is authoritative and the
/// client applies whatever status it asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Accepted,
    Resolved,
    Canceled,
    TimedOut,
}

impl AlertStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AlertStatus::Resolved | AlertStatus::Canceled | AlertStatus::TimedOut
        )
    }
}

/// Alert category as shown to dispatchers. Wire values are the display
/// strings used by the dispatch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCategory {
    #[serde(rename = "Law & Order")]
    LawAndOrder,
    #[serde(rename = "Fire & Rescue")]
    FireAndRescue,
    #[serde(rename = "Medical Emergency")]
    MedicalEmergency,
    #[serde(rename = "Traffic Incident")]
    TrafficIncident,
}

/// One emergency alert as pushed by the dispatch service.
///
/// `id` is server-assigned, unique, and never reused. Optional fields are
/// omitted from JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: i64,
    pub originator_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Recorded audio, base64-encoded by the capture layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<AlertCategory>,
    pub status: AlertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_radius: Option<f64>,
    /// Responder ids this alert was routed to, if the server targeted it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeted_responders: Option<Vec<String>>,
}

impl AlertRecord {
    /// True if `responder_id` is among the targeted responders.
    pub fn targets(&self, responder_id: &str) -> bool {
        self.targeted_responders
            .as_deref()
            .is_some_and(|ids| ids.iter().any(|id| id == responder_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> AlertRecord {
        AlertRecord {
            id: 42,
            originator_id: "C7".into(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            location: Some(GeoPoint { lat: 57.6, lng: 10.4 }),
            message: Some("house fire".into()),
            audio_payload: None,
            category: Some(AlertCategory::FireAndRescue),
            status: AlertStatus::New,
            accepted_by: None,
            search_radius: Some(2.5),
            targeted_responders: Some(vec!["F1".into(), "F2".into()]),
        }
    }

    #[test]
    fn record_uses_camel_case_and_omits_absent_fields() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["originatorId"], "C7");
        assert_eq!(json["category"], "Fire & Rescue");
        assert_eq!(json["status"], "new");
        assert!(json.get("audioPayload").is_none());
        assert!(json.get("acceptedBy").is_none());
    }

    #[test]
    fn status_terminality() {
        assert!(!AlertStatus::New.is_terminal());
        assert!(!AlertStatus::Accepted.is_terminal());
        assert!(AlertStatus::Resolved.is_terminal());
        assert!(AlertStatus::Canceled.is_terminal());
        assert!(AlertStatus::TimedOut.is_terminal());
    }

    #[test]
    fn targeting_checks_membership() {
        let record = sample_record();
        assert!(record.targets("F1"));
        assert!(!record.targets("F9"));

        let untargeted = AlertRecord {
            targeted_responders: None,
            ..sample_record()
        };
        assert!(!untargeted.targets("F1"));
    }

    #[test]
    fn roles_split_into_citizen_and_responders() {
        assert!(!Role::Citizen.is_responder());
        assert!(Role::Police.is_responder());
        assert!(Role::Firefighter.is_responder());
        assert_eq!(serde_json::to_value(Role::Firefighter).unwrap(), "firefighter");
    }
}
