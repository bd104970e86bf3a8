//! Validation error lists and their 422 translation
//!
//! A [`ValidationErrors`] value is the error list produced by a validation step: one
//! [`ValidationIssue`] per failure, each exposing a failure kind (`type`), a message
//! (`msg`) and a field location (`loc`). The serde shape matches that record layout so
//! lists produced elsewhere can be decoded directly.
//!
//! Translation into a problem document:
//! - `detail` of each entry is `"[<kind>] <message>"`, with `Unknown` for a missing part
//! - `pointer` joins the string segments of `loc` with `/` behind a leading `/`;
//!   numeric (array index) segments are dropped, and an empty result means no pointer

use std::fmt;

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::problem::ErrorDetail;

/// Problem type of validation failures
pub const VALIDATION_ERROR_TYPE: &str = "https://problems-registry.smartbear.com/validation-error";

/// Problem title of validation failures
pub const VALIDATION_ERROR_TITLE: &str = "Validation Error";

const UNKNOWN: &str = "Unknown";

/// One segment of a field location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    /// Named field
    Field(String),
    /// Array index
    Index(usize),
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for LocSegment {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for LocSegment {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for LocSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A single validation failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Failure kind, e.g. `missing` or `string_too_short`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Human-readable message
    #[serde(rename = "msg", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Location of the offending field
    #[serde(default)]
    pub loc: Vec<LocSegment>,
}

impl ValidationIssue {
    /// Create an issue with a kind, message and location
    pub fn new<I, L>(kind: impl Into<String>, message: impl Into<String>, loc: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<LocSegment>,
    {
        Self {
            kind: Some(kind.into()),
            message: Some(message.into()),
            loc: loc.into_iter().map(Into::into).collect(),
        }
    }

    /// `"[<kind>] <message>"`
    pub fn detail(&self) -> String {
        format!(
            "[{}] {}",
            self.kind.as_deref().unwrap_or(UNKNOWN),
            self.message.as_deref().unwrap_or(UNKNOWN)
        )
    }

    /// `/`-joined named segments of `loc`, `None` if there are none
    pub fn pointer(&self) -> Option<String> {
        let fields: Vec<&str> = self
            .loc
            .iter()
            .filter_map(|segment| match segment {
                LocSegment::Field(name) => Some(name.as_str()),
                LocSegment::Index(_) => None,
            })
            .collect();

        if fields.is_empty() {
            None
        } else {
            Some(format!("/{}", fields.join("/")))
        }
    }

    pub fn to_error_detail(&self) -> ErrorDetail {
        ErrorDetail::new(self.detail(), self.pointer())
    }
}

/// List of validation failures for one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ValidationErrors {
    subject: Option<String>,
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the validated input in the summary ("... for CreateUser")
    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            issues: Vec::new(),
        }
    }

    /// Add an issue
    pub fn with_issue(mut self, issue: ValidationIssue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// One [`ErrorDetail`] per issue, in order
    pub fn error_details(&self) -> Vec<ErrorDetail> {
        self.issues.iter().map(ValidationIssue::to_error_detail).collect()
    }
}

impl FromIterator<ValidationIssue> for ValidationErrors {
    fn from_iter<T: IntoIterator<Item = ValidationIssue>>(iter: T) -> Self {
        Self {
            subject: None,
            issues: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<ValidationIssue>> for ValidationErrors {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self {
            subject: None,
            issues,
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationIssue;
    type IntoIter = std::vec::IntoIter<ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationIssue;
    type IntoIter = std::slice::Iter<'a, ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

/// Summary of the whole list:
///
/// ```text
/// 2 validation errors for CreateUser
/// body.email
///   Field required [type=missing]
/// body.age
///   Input should be a valid integer [type=int_parsing]
/// ```
impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.issues.len();
        write!(
            f,
            "{} validation error{}",
            count,
            if count == 1 { "" } else { "s" }
        )?;
        if let Some(ref subject) = self.subject {
            write!(f, " for {}", subject)?;
        }

        for issue in &self.issues {
            if !issue.loc.is_empty() {
                let loc: Vec<String> = issue.loc.iter().map(ToString::to_string).collect();
                write!(f, "\n{}", loc.join("."))?;
            }
            write!(
                f,
                "\n  {} [type={}]",
                issue.message.as_deref().unwrap_or(UNKNOWN),
                issue.kind.as_deref().unwrap_or(UNKNOWN)
            )?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        crate::handlers::validation_error_response(&self).into_response()
    }
}
