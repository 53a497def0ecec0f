// Session domain types
//
// These types represent the CME session entity and its lifecycle status.
// The backend owns and mutates sessions; the dashboard only holds read-only
// snapshots obtained by fetch.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Session lifecycle status.
/// - `created`: Session created, waiting for a recording
/// - `recording_uploaded`: Recording stored, processing not yet started
/// - `processing`: Transcription and analysis are running
/// - `completed`: Analysis finished, report available
/// - `error`: Backend processing failed
///
/// Any other wire value is kept verbatim as `Unknown` so a response is never
/// rejected because of a status the dashboard doesn't know yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Session created, no recording yet.
    Created,
    /// Recording upload finished.
    RecordingUploaded,
    /// Server-side analysis is running.
    Processing,
    /// Analysis finished successfully.
    Completed,
    /// Processing failed.
    Error,
    /// Unrecognized status string from the backend.
    Unknown(String),
}

impl SessionStatus {
    /// The five statuses the backend is known to produce.
    pub const KNOWN: [SessionStatus; 5] = [
        SessionStatus::Created,
        SessionStatus::RecordingUploaded,
        SessionStatus::Processing,
        SessionStatus::Completed,
        SessionStatus::Error,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::RecordingUploaded => "recording_uploaded",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
            SessionStatus::Unknown(raw) => raw,
        }
    }

    /// `completed` and `error` end the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    /// Whether the backend may move a session from `self` to `next`.
    ///
    /// The client never applies transitions itself; this is used to sanity
    /// check what a re-fetch observed.
    pub fn can_transition_to(&self, next: &SessionStatus) -> bool {
        match (self, next) {
            (SessionStatus::Created, SessionStatus::RecordingUploaded) => true,
            (SessionStatus::RecordingUploaded, SessionStatus::Processing) => true,
            (SessionStatus::Processing, SessionStatus::Completed) => true,
            (from, SessionStatus::Error) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Whether `target` can follow `self` through one or more transitions.
    /// Polling may skip intermediate statuses, so watchers check this rather
    /// than a single step.
    pub fn can_reach(&self, target: &SessionStatus) -> bool {
        let mut frontier = vec![self.clone()];
        let mut seen: Vec<SessionStatus> = Vec::new();
        while let Some(current) = frontier.pop() {
            for next in SessionStatus::KNOWN {
                if !current.can_transition_to(&next) || seen.contains(&next) {
                    continue;
                }
                if next == *target {
                    return true;
                }
                seen.push(next.clone());
                frontier.push(next);
            }
        }
        false
    }

    /// Upload is only offered before any recording exists.
    pub fn allows_upload(&self) -> bool {
        matches!(self, SessionStatus::Created)
    }

    /// Reports exist only for finished sessions.
    pub fn allows_report(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }

    /// Counted as "pending" in the list statistics.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            SessionStatus::Created | SessionStatus::RecordingUploaded
        )
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Created
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SessionStatus {
    fn from(s: &str) -> Self {
        match s {
            "created" => SessionStatus::Created,
            "recording_uploaded" => SessionStatus::RecordingUploaded,
            "processing" => SessionStatus::Processing,
            "completed" => SessionStatus::Completed,
            "error" => SessionStatus::Error,
            other => SessionStatus::Unknown(other.to_string()),
        }
    }
}

impl Serialize for SessionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SessionStatus::from(raw.as_str()))
    }
}

/// Jurisdiction-specific recording consent, computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingAllowed {
    /// Legal basis for recording (statute or rule reference).
    #[serde(default)]
    pub rule: Option<String>,
    /// Whether video (not just audio) may be recorded.
    #[serde(default)]
    pub video: bool,
}

/// CME session - one compulsory medical examination encounter.
///
/// Only `session_id` is required; the backend returns partial records for
/// sessions that are still early in their lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for the session.
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    /// Examining doctor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    /// US jurisdiction code (e.g. "FL").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Exam date as entered on the form (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attorney_name: Option<String>,
    /// Recording mode, defaulted server-side at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: SessionStatus,
    /// Free-text description of the current pipeline stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_stage: Option<String>,
    /// Storage location of the uploaded recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_allowed: Option<RecordingAllowed>,
}

impl Session {
    /// Minimal session snapshot, mostly useful for tests and fixtures.
    pub fn new(session_id: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            ..Default::default()
        }
    }

    /// Whether the jurisdiction permits video recording for this session.
    pub fn video_permitted(&self) -> bool {
        self.recording_allowed
            .as_ref()
            .map(|r| r.video)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_known_values() {
        for status in SessionStatus::KNOWN {
            let json = serde_json::to_string(&status).unwrap();
            let back: SessionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
        assert_eq!(
            serde_json::to_string(&SessionStatus::RecordingUploaded).unwrap(),
            "\"recording_uploaded\""
        );
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: SessionStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(status, SessionStatus::Unknown("archived".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"archived\"");
        assert!(!status.is_terminal());
        assert!(!status.allows_upload());
        assert!(!status.allows_report());
    }

    #[test]
    fn test_lifecycle_transitions() {
        use SessionStatus::*;
        assert!(Created.can_transition_to(&RecordingUploaded));
        assert!(RecordingUploaded.can_transition_to(&Processing));
        assert!(Processing.can_transition_to(&Completed));

        assert!(!Created.can_transition_to(&Completed));
        assert!(!Processing.can_transition_to(&Created));
        assert!(!Completed.can_transition_to(&Processing));
    }

    #[test]
    fn test_error_reachable_only_from_non_terminal() {
        use SessionStatus::*;
        assert!(Created.can_transition_to(&Error));
        assert!(RecordingUploaded.can_transition_to(&Error));
        assert!(Processing.can_transition_to(&Error));
        assert!(!Completed.can_transition_to(&Error));
        assert!(!Error.can_transition_to(&Error));
    }

    #[test]
    fn test_can_reach_skips_intermediate_states() {
        use SessionStatus::*;
        assert!(Created.can_reach(&Processing));
        assert!(Created.can_reach(&Completed));
        assert!(RecordingUploaded.can_reach(&Error));
        assert!(!Processing.can_reach(&Created));
        assert!(!Completed.can_reach(&Error));
        assert!(!Unknown("paused".into()).can_reach(&Completed));
    }

    #[test]
    fn test_action_gating() {
        for status in SessionStatus::KNOWN {
            assert_eq!(status.allows_upload(), status == SessionStatus::Created);
            assert_eq!(status.allows_report(), status == SessionStatus::Completed);
        }
    }

    #[test]
    fn test_partial_session_deserializes() {
        let session: Session =
            serde_json::from_str(r#"{"session_id":"s1","status":"processing","state":"FL"}"#)
                .unwrap();
        assert_eq!(session.session_id, "s1");
        assert_eq!(session.status, SessionStatus::Processing);
        assert_eq!(session.state.as_deref(), Some("FL"));
        assert!(session.patient_name.is_none());
        assert!(!session.video_permitted());
    }

    #[test]
    fn test_missing_status_defaults_to_created() {
        let session: Session = serde_json::from_str(r#"{"session_id":"s1"}"#).unwrap();
        assert_eq!(session.status, SessionStatus::Created);
    }

    #[test]
    fn test_recording_allowed() {
        let session: Session = serde_json::from_str(
            r#"{"session_id":"s1","recording_allowed":{"rule":"Fla. Stat. 934.03","video":true}}"#,
        )
        .unwrap();
        assert!(session.video_permitted());
        assert_eq!(
            session.recording_allowed.unwrap().rule.as_deref(),
            Some("Fla. Stat. 934.03")
        );
    }
}
