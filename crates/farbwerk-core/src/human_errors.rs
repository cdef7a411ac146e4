// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every error that reaches the user is mapped to plain English with a clear
// suggestion. Severity drives how the CLI presents it and its exit code.

use crate::error::FarbwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something the user can fix by changing the request (wrong scheme,
    /// no file chosen).
    ActionRequired,
    /// Retrying the same request will not help, e.g. an unreadable file.
    Permanent,
    /// The user stopped it.
    Cancelled,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `FarbwerkError` into a `HumanError`.
pub fn humanize_error(err: &FarbwerkError) -> HumanError {
    match err {
        FarbwerkError::InvalidDocument(detail) => HumanError {
            message: "This file could not be opened as a PDF.".into(),
            suggestion: format!("Check that the file is a valid, unencrypted PDF. ({detail})"),
            severity: Severity::Permanent,
        },

        FarbwerkError::NoDocumentLoaded => HumanError {
            message: "No PDF has been opened yet.".into(),
            suggestion: "Open a PDF file first, then convert it.".into(),
            severity: Severity::ActionRequired,
        },

        FarbwerkError::UnknownScheme(id) => HumanError {
            message: format!("There is no colour scheme called '{id}'."),
            suggestion: format!(
                "Choose one of: {}.",
                crate::schemes::scheme_ids().join(", ")
            ),
            severity: Severity::ActionRequired,
        },

        FarbwerkError::Extraction(detail) => HumanError {
            message: "The text on a page could not be read.".into(),
            suggestion: format!("The PDF may be damaged or use an unusual structure. ({detail})"),
            severity: Severity::Permanent,
        },

        FarbwerkError::Conversion(detail) => HumanError {
            message: "Conversion failed.".into(),
            suggestion: format!("No output file was written. ({detail})"),
            severity: Severity::Permanent,
        },

        FarbwerkError::Cancelled => HumanError {
            message: "Conversion was cancelled.".into(),
            suggestion: "No output file was written.".into(),
            severity: Severity::Cancelled,
        },

        FarbwerkError::Preview(detail) => HumanError {
            message: "Could not generate a preview.".into(),
            suggestion: format!("Conversion may still work. ({detail})"),
            severity: Severity::Permanent,
        },

        FarbwerkError::Config(detail) => HumanError {
            message: "The settings file could not be read.".into(),
            suggestion: format!("Fix or delete the settings file to use defaults. ({detail})"),
            severity: Severity::ActionRequired,
        },

        FarbwerkError::Io(io) => humanize_io_error(io),

        FarbwerkError::Serialization(_) => HumanError {
            message: "Some data could not be written out.".into(),
            suggestion: "This is a bug; please report it.".into(),
            severity: Severity::Permanent,
        },
    }
}

fn humanize_io_error(io: &std::io::Error) -> HumanError {
    match io.kind() {
        std::io::ErrorKind::NotFound => HumanError {
            message: "The file could not be found.".into(),
            suggestion: "Check the path and try again.".into(),
            severity: Severity::ActionRequired,
        },
        std::io::ErrorKind::PermissionDenied => HumanError {
            message: "Permission denied.".into(),
            suggestion: "Choose a location you are allowed to read from and write to.".into(),
            severity: Severity::ActionRequired,
        },
        _ => HumanError {
            message: "A file operation failed.".into(),
            suggestion: format!("{io}"),
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scheme_lists_choices() {
        let human = humanize_error(&FarbwerkError::UnknownScheme("Neon".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("Neon"));
        assert!(human.suggestion.contains("High Contrast"));
    }

    #[test]
    fn no_document_is_action_required() {
        let human = humanize_error(&FarbwerkError::NoDocumentLoaded);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn invalid_document_is_permanent() {
        let human = humanize_error(&FarbwerkError::InvalidDocument("bad xref".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("bad xref"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = FarbwerkError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn cancelled_has_own_severity() {
        assert_eq!(
            humanize_error(&FarbwerkError::Cancelled).severity,
            Severity::Cancelled
        );
    }
}
