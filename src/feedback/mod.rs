//! Structured Feedback Module
//!
//! Provides machine-readable output for tools driving the compiler:
//! - JSON error reports with stable codes
//! - Compilation statistics

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Span, Stage};

// ==================== Structured Error Report ====================

/// A structured error report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    /// Stage that rejected the program
    pub stage: Stage,

    /// Human-readable message
    pub message: String,

    /// Location information
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    fn new(file: &str, span: Span) -> Self {
        Self {
            file: file.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

// ==================== Compilation Feedback ====================

/// Complete compilation feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationFeedback {
    /// Compilation status
    pub success: bool,

    /// Source file
    pub source_file: String,

    /// All errors
    pub diagnostics: Vec<ErrorReport>,

    /// Compilation statistics
    pub stats: CompilationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationStats {
    /// Tokens produced by the lexer, including end of input
    pub token_count: usize,

    /// Number of methods
    pub method_count: usize,

    /// Lines of generated assembly
    pub output_lines: usize,

    /// Lines of source
    pub source_lines: usize,
}

// ==================== Error Conversion ====================

/// Stable code per error class
pub fn error_code(stage: Stage) -> &'static str {
    match stage {
        Stage::Lexing => "E0001",
        Stage::Parsing => "E0002",
        Stage::Semantic => "E0003",
        Stage::CodeGen => "E0004",
    }
}

impl ErrorReport {
    fn new(stage: Stage, message: String, location: Option<Location>) -> Self {
        Self {
            code: error_code(stage).to_string(),
            stage,
            message,
            location,
        }
    }

    /// Create error reports from a compiler error; semantic failures
    /// yield one report per collected error
    pub fn from_error(error: &Error, file_name: &str) -> Vec<Self> {
        match error {
            Error::Semantic(errors) => errors
                .iter()
                .map(|e| {
                    Self::new(
                        Stage::Semantic,
                        e.to_string(),
                        e.span().map(|s| Location::new(file_name, s)),
                    )
                })
                .collect(),
            other => vec![Self::new(
                other.stage(),
                other.to_string(),
                other.span().map(|s| Location::new(file_name, s)),
            )],
        }
    }
}

impl CompilationFeedback {
    /// Create a successful feedback
    pub fn success(source_file: String, stats: CompilationStats) -> Self {
        Self {
            success: true,
            source_file,
            diagnostics: vec![],
            stats,
        }
    }

    /// Create a failed feedback
    pub fn failure(source_file: String, error: &Error, stats: CompilationStats) -> Self {
        let diagnostics = ErrorReport::from_error(error, &source_file);
        Self {
            success: false,
            source_file,
            diagnostics,
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline;
    use crate::utils::SemanticError;

    #[test]
    fn test_codes_per_stage() {
        assert_eq!(error_code(Stage::Lexing), "E0001");
        assert_eq!(error_code(Stage::Parsing), "E0002");
        assert_eq!(error_code(Stage::Semantic), "E0003");
        assert_eq!(error_code(Stage::CodeGen), "E0004");
    }

    #[test]
    fn test_syntax_error_report_has_location() {
        let err = pipeline::compile("int main() {\n  return 1\n}").unwrap_err();
        let reports = ErrorReport::from_error(&err, "prog.src");
        assert_eq!(
            reports,
            vec![ErrorReport {
                code: "E0002".to_string(),
                stage: Stage::Parsing,
                message: "syntax error at line 3, column 1: expected ';', got '}'".to_string(),
                location: Some(Location {
                    file: "prog.src".to_string(),
                    line: 3,
                    column: 1,
                }),
            }]
        );
    }

    #[test]
    fn test_semantic_failure_yields_one_report_per_error() {
        let err = Error::Semantic(vec![
            SemanticError::MissingMain,
            SemanticError::BreakOutsideLoop {
                span: Span::new(2, 3),
            },
        ]);
        let reports = ErrorReport::from_error(&err, "a.src");
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].location, None);
        assert_eq!(reports[1].location.as_ref().map(|l| l.line), Some(2));
        assert!(reports.iter().all(|r| r.code == "E0003"));
    }

    #[test]
    fn test_feedback_json() {
        let stats = CompilationStats {
            token_count: 10,
            method_count: 1,
            output_lines: 5,
            source_lines: 1,
        };
        let feedback = CompilationFeedback::success("main.src".to_string(), stats.clone());
        let value: serde_json::Value = serde_json::from_str(&feedback.to_json()).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["stats"]["output_lines"], 5);

        let failure =
            CompilationFeedback::failure("main.src".to_string(), &Error::MissingMain, stats);
        let value: serde_json::Value = serde_json::from_str(&failure.to_json()).unwrap();
        assert_eq!(value["diagnostics"][0]["code"], "E0004");
        assert_eq!(value["diagnostics"][0]["stage"], "code_gen");
    }
}
