//! Workflow step state machine vocabulary
//!
//! The four-phase workflow:
//! UPLOAD_TEXT → CONFIGURE → WAIT → COMPLETE
//!
//! Exactly one step is active at a time; the step drives which controller
//! actions are valid.

use serde::{Deserialize, Serialize};

/// Workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStep {
    /// Paste or upload the notes to generate flashcards from
    UploadText,
    /// Choose language, generation mode, and export format
    Configure,
    /// Generation task submitted, waiting for the backend
    Wait,
    /// Result ready for download
    Complete,
}

impl WorkflowStep {
    /// Wire/storage string for this step (the `savedStep` value)
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::UploadText => "UPLOAD_TEXT",
            WorkflowStep::Configure => "CONFIGURE",
            WorkflowStep::Wait => "WAIT",
            WorkflowStep::Complete => "COMPLETE",
        }
    }

    /// Parse a stored step string; `None` for unrecognized values so the
    /// caller can fall back to the initial step instead of failing restore
    pub fn from_saved(value: &str) -> Option<Self> {
        match value {
            "UPLOAD_TEXT" => Some(WorkflowStep::UploadText),
            "CONFIGURE" => Some(WorkflowStep::Configure),
            "WAIT" => Some(WorkflowStep::Wait),
            "COMPLETE" => Some(WorkflowStep::Complete),
            _ => None,
        }
    }

    /// True while the generation request may still be mutated
    pub fn allows_request_edits(&self) -> bool {
        matches!(self, WorkflowStep::UploadText | WorkflowStep::Configure)
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_strings_round_trip() {
        for step in [
            WorkflowStep::UploadText,
            WorkflowStep::Configure,
            WorkflowStep::Wait,
            WorkflowStep::Complete,
        ] {
            assert_eq!(WorkflowStep::from_saved(step.as_str()), Some(step));
        }
    }

    #[test]
    fn unknown_saved_string_is_rejected() {
        assert_eq!(WorkflowStep::from_saved("DOWNLOAD"), None);
        assert_eq!(WorkflowStep::from_saved(""), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&WorkflowStep::UploadText).unwrap();
        assert_eq!(json, "\"UPLOAD_TEXT\"");
    }
}
