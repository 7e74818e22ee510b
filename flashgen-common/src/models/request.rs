//! Generation request and its option enums
//!
//! The enum wire values (`en`, `PRACTICE`, `csv`, ...) are consumed by the
//! backend job API; the display labels are free to change.

use crate::config::GeneratorConfig;
use serde::{Deserialize, Serialize};

/// Flashcard language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "de")]
    German,
}

impl Language {
    /// Display label for the view layer
    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::German => "German",
        }
    }
}

/// Flashcard generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Practice,
    Definitions,
    MultipleChoice,
    OpenEnded,
}

impl Mode {
    /// Display label for the view layer
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Practice => "Practice",
            Mode::Definitions => "Definitions",
            Mode::MultipleChoice => "Multiple Choice",
            Mode::OpenEnded => "Open Ended",
        }
    }
}

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "apkg")]
    Apkg,
}

impl ExportFormat {
    /// Display label for the view layer
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Apkg => "Anki",
        }
    }

    /// Wire value, also used as the download-cache key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Apkg => "apkg",
        }
    }

    /// Fallback download filename when the backend sends no
    /// Content-Disposition header
    pub fn fallback_filename(&self) -> String {
        format!("flashcards.{}", self.as_str())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation request submitted to the backend
///
/// Created empty at session start (or restored from storage), mutated through
/// the UploadText/Configure steps, frozen at submission, reset to empty on
/// "start over". Persisted write-through on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    pub lang: Option<Language>,
    pub mode: Option<Mode>,
    pub export_format: Option<ExportFormat>,
    pub input_text: String,
}

impl GenerationRequest {
    /// True when the input text length is within the accepted range
    pub fn text_in_range(&self, config: &GeneratorConfig) -> bool {
        config.text_length_in_range(self.input_text.chars().count())
    }

    /// The one completeness predicate: all three options chosen and the
    /// input text within range. Checked before submission.
    pub fn is_complete(&self, config: &GeneratorConfig) -> bool {
        self.lang.is_some()
            && self.mode.is_some()
            && self.export_format.is_some()
            && self.text_in_range(config)
    }
}
