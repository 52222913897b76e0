//! Parsing of validator stage output into a structured report.
//!
//! Validators are asked to answer with a single JSON object of the form
//! `{"validation_passed": bool, "issues": [...], "message": "..."}`. Agents
//! do not always comply, so parsing degrades in steps and never fails: a
//! report that cannot be understood is simply a failed validation.

use serde::Serialize;
use serde_json::{Map, Value, json};

const SUBJECT_KEYS: [&str; 5] = ["subject", "name", "table", "column", "description"];
const UNSPECIFIED_KIND: &str = "unspecified";

/// How the report was recovered from the validator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    /// The whole output was a JSON object.
    Structured,
    /// A JSON object was found embedded in surrounding prose.
    BraceScan,
    /// No JSON object was found; the text was kept verbatim.
    RawText,
    /// The run produced no validator output.
    Missing,
}

/// One problem reported by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Issue category taken from the `type` key, e.g. `missing_table`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Object the issue is about, if the validator named one.
    pub subject: Option<String>,
    /// Free-form details.
    pub details: Option<String>,
}

impl Issue {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(fields) => Self {
                kind: fields
                    .get("type")
                    .map_or_else(|| UNSPECIFIED_KIND.to_owned(), render_scalar),
                subject: SUBJECT_KEYS
                    .iter()
                    .find_map(|key| fields.get(*key))
                    .map(render_scalar),
                details: fields.get("details").map(render_scalar),
            },
            other => Self {
                kind: UNSPECIFIED_KIND.to_owned(),
                subject: None,
                details: Some(render_scalar(other)),
            },
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parsed result of one validator stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorReport {
    validation_passed: bool,
    issues: Vec<Issue>,
    message: Option<String>,
    raw: Value,
    source: ReportSource,
}

impl ValidatorReport {
    /// Parse validator output. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_pipeline::domain::ValidatorReport;
    ///
    /// let report = ValidatorReport::parse(
    ///     "Checked. {\"validation_passed\": true, \"issues\": []} Done.",
    /// );
    /// assert!(report.validation_passed());
    ///
    /// let degraded = ValidatorReport::parse("looks fine to me");
    /// assert!(!degraded.validation_passed());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(object) = parse_object(trimmed) {
            return Self::from_raw(object, ReportSource::Structured);
        }
        extract_first_json_object(trimmed).map_or_else(
            || Self::from_raw(json!({ "raw_output": text }), ReportSource::RawText),
            |object| Self::from_raw(object, ReportSource::BraceScan),
        )
    }

    /// Report used when a run produced no validator output.
    #[must_use]
    pub fn missing() -> Self {
        Self::from_raw(Value::Object(Map::new()), ReportSource::Missing)
    }

    fn from_raw(raw: Value, source: ReportSource) -> Self {
        let validation_passed = raw.get("validation_passed") == Some(&Value::Bool(true));
        let issues = raw
            .get("issues")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Issue::from_value).collect())
            .unwrap_or_default();
        let message = raw.get("message").map(render_scalar);
        Self {
            validation_passed,
            issues,
            message,
            raw,
            source,
        }
    }

    /// Whether the validator explicitly reported success with JSON `true`.
    #[must_use]
    pub const fn validation_passed(&self) -> bool {
        self.validation_passed
    }

    /// Issues listed by the validator.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Summary message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The JSON value the report was built from.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// How the report was recovered.
    #[must_use]
    pub const fn source(&self) -> ReportSource {
        self.source
    }

    /// Compact JSON rendering used as corrective feedback.
    #[must_use]
    pub fn to_feedback_string(&self) -> String {
        self.raw.to_string()
    }

    /// Pretty JSON rendering for human-facing summaries.
    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Find the first balanced `{...}` block in `text` that parses as a JSON
/// object.
///
/// The scan honours JSON string literals and escapes, so braces inside
/// strings do not affect nesting. When a balanced block fails to parse the
/// scan resumes at the next `{`.
///
/// # Examples
///
/// ```
/// use schema_pipeline::domain::extract_first_json_object;
///
/// let found = extract_first_json_object("see {not json} then {\"a\": {\"b\": \"}\"}} and {\"c\": 1}");
/// assert_eq!(found, Some(serde_json::json!({"a": {"b": "}"}})));
/// ```
#[must_use]
pub fn extract_first_json_object(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .find_map(|(start, _)| {
            let end = balanced_end(text, start)?;
            text.get(start..=end).and_then(parse_object)
        })
}

fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.get(start..)?.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "validator_report_tests.rs"]
mod tests;
