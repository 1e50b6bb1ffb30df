//! Parser feedback (warnings, errors, suggestions).
//!
//! The parser never gives up on a tune: it records what it had to assume
//! and carries on. Callers decide which feedback levels are fatal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One message from the parser, anchored to a line of the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
    pub line: usize,
    pub suggestion: Option<String>,
}

impl Feedback {
    pub fn new(level: FeedbackLevel, message: impl Into<String>, line: usize) -> Self {
        Feedback {
            level,
            message: message.into(),
            line,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.message, self.level)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "; {}", suggestion)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackLevel {
    /// The construct could not be understood at all
    Error,
    /// Parsed with an assumption the author may not have intended
    Warning,
    /// Inferred a default the standard allows
    Info,
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackLevel::Error => write!(f, "error"),
            FeedbackLevel::Warning => write!(f, "warning"),
            FeedbackLevel::Info => write!(f, "info"),
        }
    }
}

/// Collector threaded through the parser stages.
#[derive(Debug)]
pub struct FeedbackCollector {
    feedback: Vec<Feedback>,
    line: usize,
}

impl Default for FeedbackCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackCollector {
    pub fn new() -> Self {
        FeedbackCollector {
            feedback: Vec::new(),
            line: 1,
        }
    }

    /// Start collecting at a line offset (used for tunes inside a collection)
    pub fn starting_at(line: usize) -> Self {
        FeedbackCollector {
            feedback: Vec::new(),
            line,
        }
    }

    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(FeedbackLevel::Error, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(FeedbackLevel::Warning, message);
    }

    pub fn warning_with_suggestion(
        &mut self,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.feedback.push(
            Feedback::new(FeedbackLevel::Warning, message, self.line).with_suggestion(suggestion),
        );
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(FeedbackLevel::Info, message);
    }

    fn push(&mut self, level: FeedbackLevel, message: impl Into<String>) {
        self.feedback.push(Feedback::new(level, message, self.line));
    }

    pub fn has_errors(&self) -> bool {
        self.feedback.iter().any(|f| f.level == FeedbackLevel::Error)
    }

    pub fn into_feedback(self) -> Vec<Feedback> {
        self.feedback
    }
}

/// Result of parsing with feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult<T> {
    pub value: T,
    pub feedback: Vec<Feedback>,
}

impl<T> ParseResult<T> {
    pub fn new(value: T, feedback: Vec<Feedback>) -> Self {
        ParseResult { value, feedback }
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| f.level == FeedbackLevel::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| f.level == FeedbackLevel::Error)
    }

    /// Value if no error-level feedback was recorded, otherwise the errors
    pub fn into_result(self) -> Result<T, Vec<Feedback>> {
        if self.has_errors() {
            Err(self
                .feedback
                .into_iter()
                .filter(|f| f.level == FeedbackLevel::Error)
                .collect())
        } else {
            Ok(self.value)
        }
    }
}
