//! Host tool profiles
//!
//! The redaction, form-creation and text-editing tools share one engine and
//! differ only in which annotation kinds they allow and how they name their
//! output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationKind;
use crate::error::{AnnotateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolProfile {
    Redactor,
    FormCreator,
    TextEditor,
}

impl ToolProfile {
    pub fn permitted_kinds(self) -> &'static [AnnotationKind] {
        match self {
            ToolProfile::Redactor => &[AnnotationKind::Rectangle],
            ToolProfile::FormCreator => &[AnnotationKind::FormField],
            ToolProfile::TextEditor => &[AnnotationKind::TextBlock, AnnotationKind::Rectangle],
        }
    }

    pub fn permits(self, kind: AnnotationKind) -> bool {
        self.permitted_kinds().contains(&kind)
    }

    pub fn check(self, kind: AnnotationKind) -> Result<()> {
        if self.permits(kind) {
            Ok(())
        } else {
            Err(AnnotateError::KindNotPermitted {
                kind,
                tool: self.to_string(),
            })
        }
    }

    pub fn output_prefix(self) -> &'static str {
        match self {
            ToolProfile::Redactor => "redacted",
            ToolProfile::FormCreator => "fillable",
            ToolProfile::TextEditor => "edited",
        }
    }

    /// `<prefix>_<name>`, keeping only the final path component of `original`
    pub fn output_filename(self, original: &str) -> String {
        let name = original
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("document.pdf");
        format!("{}_{}", self.output_prefix(), name)
    }
}

impl fmt::Display for ToolProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolProfile::Redactor => "redact",
            ToolProfile::FormCreator => "forms",
            ToolProfile::TextEditor => "text",
        })
    }
}

impl FromStr for ToolProfile {
    type Err = AnnotateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redact" | "redactor" => Ok(ToolProfile::Redactor),
            "forms" | "form" | "formcreator" => Ok(ToolProfile::FormCreator),
            "text" | "texteditor" | "edit" => Ok(ToolProfile::TextEditor),
            other => Err(AnnotateError::Config(format!("unknown tool {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permitted_kinds() {
        assert!(ToolProfile::Redactor.permits(AnnotationKind::Rectangle));
        assert!(!ToolProfile::Redactor.permits(AnnotationKind::TextBlock));
        assert!(ToolProfile::FormCreator.permits(AnnotationKind::FormField));
        assert!(ToolProfile::TextEditor.permits(AnnotationKind::Rectangle));
        assert!(matches!(
            ToolProfile::FormCreator.check(AnnotationKind::Rectangle),
            Err(AnnotateError::KindNotPermitted { kind: AnnotationKind::Rectangle, .. })
        ));
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            ToolProfile::Redactor.output_filename("contract.pdf"),
            "redacted_contract.pdf"
        );
        assert_eq!(
            ToolProfile::FormCreator.output_filename("/tmp/in/w9.pdf"),
            "fillable_w9.pdf"
        );
        assert_eq!(
            ToolProfile::TextEditor.output_filename("C:\\docs\\a.pdf"),
            "edited_a.pdf"
        );
        assert_eq!(ToolProfile::TextEditor.output_filename(""), "edited_document.pdf");
    }

    #[test]
    fn test_parse_round_trips_display() {
        for tool in [
            ToolProfile::Redactor,
            ToolProfile::FormCreator,
            ToolProfile::TextEditor,
        ] {
            assert_eq!(tool.to_string().parse::<ToolProfile>().unwrap(), tool);
        }
        assert!("crop".parse::<ToolProfile>().is_err());
    }
}
