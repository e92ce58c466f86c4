//! Derives human-facing notifications from alert transitions.
//!
//! Advisory only: disabling this layer has no effect on collection
//! correctness. Derivation is stateless and re-fires on every event, so a
//! re-delivered wire event produces a duplicate notification by design.

use siren_types::{AlertStatus, Identity, Role};

use crate::bus::SyncEvent;

/// Body used when a targeted alert carries no message text.
const DEFAULT_ALERT_BODY: &str = "An emergency alert was raised near you.";

/// A notification for the consuming UI, distinct from wire events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Inspect one event against the active identity.
///
/// Responders are notified of new alerts targeted at them; citizens are
/// notified when an alert they originated is accepted. Everything else
/// derives nothing.
pub fn derive(event: &SyncEvent, identity: Option<&Identity>) -> Option<Notification> {
    let identity = identity?;
    match event {
        SyncEvent::RecordCreated(record) => {
            if identity.role.is_responder()
                && record.status == AlertStatus::New
                && record.targets(&identity.id)
            {
                Some(Notification {
                    title: "New Incoming Alert".into(),
                    body: record
                        .message
                        .clone()
                        .unwrap_or_else(|| DEFAULT_ALERT_BODY.into()),
                })
            } else {
                None
            }
        }
        SyncEvent::RecordUpdated(record) => {
            if identity.role == Role::Citizen
                && record.originator_id == identity.id
                && record.status == AlertStatus::Accepted
            {
                let responder = record.accepted_by.as_deref().unwrap_or("a responder");
                Some(Notification {
                    title: "Responder En Route".into(),
                    body: format!("Help is on the way. Responder {responder} is en route."),
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use siren_types::AlertRecord;

    fn record(originator: &str, status: AlertStatus) -> AlertRecord {
        AlertRecord {
            id: 42,
            originator_id: originator.into(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            location: None,
            message: None,
            audio_payload: None,
            category: None,
            status,
            accepted_by: None,
            search_radius: None,
            targeted_responders: None,
        }
    }

    fn responder() -> Identity {
        Identity {
            id: "R1".into(),
            role: Role::Police,
        }
    }

    fn citizen() -> Identity {
        Identity {
            id: "C1".into(),
            role: Role::Citizen,
        }
    }

    #[test]
    fn targeted_responder_gets_new_alert_notification() {
        let mut r = record("C1", AlertStatus::New);
        r.targeted_responders = Some(vec!["R1".into()]);
        r.message = Some("armed robbery".into());

        let n = derive(&SyncEvent::RecordCreated(r.clone()), Some(&responder())).unwrap();
        assert_eq!(n.title, "New Incoming Alert");
        assert_eq!(n.body, "armed robbery");

        // Re-derivation is not deduplicated.
        assert!(derive(&SyncEvent::RecordCreated(r), Some(&responder())).is_some());
    }

    #[test]
    fn missing_message_falls_back_to_default_body() {
        let mut r = record("C1", AlertStatus::New);
        r.targeted_responders = Some(vec!["R1".into()]);
        let n = derive(&SyncEvent::RecordCreated(r), Some(&responder())).unwrap();
        assert_eq!(n.body, DEFAULT_ALERT_BODY);
    }

    #[test]
    fn untargeted_or_non_new_creations_derive_nothing() {
        let r = record("C1", AlertStatus::New);
        assert!(derive(&SyncEvent::RecordCreated(r), Some(&responder())).is_none());

        let mut accepted = record("C1", AlertStatus::Accepted);
        accepted.targeted_responders = Some(vec!["R1".into()]);
        assert!(derive(&SyncEvent::RecordCreated(accepted), Some(&responder())).is_none());
    }

    #[test]
    fn citizen_is_told_when_their_alert_is_accepted() {
        let mut r = record("C1", AlertStatus::Accepted);
        r.accepted_by = Some("R7".into());

        let n = derive(&SyncEvent::RecordUpdated(r), Some(&citizen())).unwrap();
        assert_eq!(n.title, "Responder En Route");
        assert!(n.body.contains("R7"));
    }

    #[test]
    fn other_citizens_alerts_derive_nothing() {
        let mut r = record("C2", AlertStatus::Accepted);
        r.accepted_by = Some("R7".into());
        assert!(derive(&SyncEvent::RecordUpdated(r), Some(&citizen())).is_none());
    }

    #[test]
    fn responders_ignore_update_events() {
        let mut r = record("C1", AlertStatus::Accepted);
        r.accepted_by = Some("R1".into());
        assert!(derive(&SyncEvent::RecordUpdated(r), Some(&responder())).is_none());
    }

    #[test]
    fn no_identity_means_no_notifications() {
        let mut r = record("C1", AlertStatus::New);
        r.targeted_responders = Some(vec!["R1".into()]);
        assert!(derive(&SyncEvent::RecordCreated(r), None).is_none());
    }
}
