//! Uniform success/failure envelope produced by every command.

use std::backtrace::Backtrace;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Namespace used for failures raised by the framework itself.
pub const NAMESPACE: &str = "awi";

/// Builds a namespaced error key (`namespace:reason`).
pub fn error_key(namespace: &str, reason: &str) -> String {
    format!("{namespace}:{reason}")
}

/// Result of a command invocation. Exactly one variant is active and the
/// value is never mutated after it is returned; builders consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Answer {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Hint for generic callers on how to read `value` (e.g. "data").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    Failure {
        /// Namespaced error key, `namespace:reason`.
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl Outcome {
    pub fn answer(value: impl Into<Value>) -> Self {
        Outcome::Answer {
            value: value.into(),
            code: None,
            kind: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure {
            message: message.into(),
            data: None,
            stack: None,
        }
    }

    /// Sets the machine-readable code of an Answer. No effect on a Failure.
    pub fn with_code(self, code: impl Into<String>) -> Self {
        match self {
            Outcome::Answer { value, kind, .. } => Outcome::Answer {
                value,
                code: Some(code.into()),
                kind,
            },
            failure => failure,
        }
    }

    /// Sets the interpretation hint of an Answer. No effect on a Failure.
    pub fn with_kind(self, kind: impl Into<String>) -> Self {
        match self {
            Outcome::Answer { value, code, .. } => Outcome::Answer {
                value,
                code,
                kind: Some(kind.into()),
            },
            failure => failure,
        }
    }

    /// Attaches a diagnostic payload to a Failure. No effect on an Answer.
    pub fn with_data(self, data: impl Into<Value>) -> Self {
        match self {
            Outcome::Failure { message, stack, .. } => Outcome::Failure {
                message,
                data: Some(data.into()),
                stack,
            },
            answer => answer,
        }
    }

    pub fn with_stack(self, stack: impl Into<String>) -> Self {
        match self {
            Outcome::Failure { message, data, .. } => Outcome::Failure {
                message,
                data,
                stack: Some(stack.into()),
            },
            answer => answer,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Answer { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// Payload of an Answer; `None` for a Failure.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Answer { value, .. } => Some(value),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Answer { value, .. } => Some(value),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Outcome::Answer { code, .. } => code.as_deref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Outcome::Answer { kind, .. } => kind.as_deref(),
            Outcome::Failure { .. } => None,
        }
    }

    /// Error key of a Failure.
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Answer { .. } => None,
            Outcome::Failure { message, .. } => Some(message),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Answer { .. } => None,
            Outcome::Failure { data, .. } => data.as_ref(),
        }
    }

    /// Human-readable rendering used for operator and log output.
    ///
    /// Scalar failure data (a parameter name, an identifier) is appended to
    /// the message; structured data and stacks are left to [`Outcome::details`].
    pub fn print(&self) -> String {
        match self {
            Outcome::Answer { value, .. } => render_value(value),
            Outcome::Failure { message, data, .. } => match data {
                Some(data @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                    format!("{message}: {}", render_value(data))
                }
                _ => message.clone(),
            },
        }
    }

    /// Diagnostic lines shown only at elevated verbosity.
    pub fn details(&self) -> Vec<String> {
        match self {
            Outcome::Answer { code, kind, .. } => {
                let mut lines = Vec::new();
                if let Some(code) = code {
                    lines.push(format!("code: {code}"));
                }
                if let Some(kind) = kind {
                    lines.push(format!("kind: {kind}"));
                }
                lines
            }
            Outcome::Failure { data, stack, .. } => {
                let mut lines = Vec::new();
                if let Some(data) = data {
                    lines.push(format!("data: {data}"));
                }
                if let Some(stack) = stack {
                    lines.extend(stack.lines().map(str::to_string));
                }
                lines
            }
        }
    }
}

impl From<CoreError> for Outcome {
    fn from(error: CoreError) -> Self {
        let reason = match &error {
            CoreError::InvalidInput(_) => "invalid-input",
            CoreError::NotFound(_) => "not-found",
            CoreError::Internal(_) => "internal-error",
        };
        Outcome::failure(error_key(NAMESPACE, reason)).with_data(error.to_string())
    }
}

/// Renders a JSON value for display: strings bare, null empty, arrays one
/// item per line, everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

pub fn missing_parameter(namespace: &str, name: &str) -> Outcome {
    Outcome::failure(error_key(namespace, "missing-parameter")).with_data(name)
}

pub fn not_found(namespace: &str, noun: &str, id: &str) -> Outcome {
    Outcome::failure(error_key(namespace, &format!("{noun}-not-found"))).with_data(id)
}

pub fn cancelled(namespace: &str) -> Outcome {
    Outcome::failure(error_key(namespace, "cancelled"))
}

/// Failure returned by a command that has no real action.
pub fn nothing_to_play(namespace: &str) -> Outcome {
    Outcome::failure(error_key(namespace, "nothing-to-play"))
        .with_stack(Backtrace::force_capture().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variants_are_exclusive() {
        let samples = [
            Outcome::answer("hi"),
            Outcome::answer(json!({"a": 1})).with_code("ok").with_kind("data"),
            Outcome::failure("awi:oops"),
            missing_parameter(NAMESPACE, "name"),
            nothing_to_play(NAMESPACE),
        ];
        for outcome in samples {
            assert_ne!(outcome.is_success(), outcome.is_error());
        }
    }

    #[test]
    fn failure_value_is_none() {
        let failure = Outcome::failure("awi:oops").with_data(json!({"x": 1}));
        assert!(failure.value().is_none());
        assert!(failure.into_value().is_none());
    }

    #[test]
    fn builders_only_touch_their_variant() {
        let answer = Outcome::answer(1).with_data("ignored").with_stack("ignored");
        assert_eq!(answer, Outcome::answer(1));

        let failure = Outcome::failure("awi:x").with_code("ignored").with_kind("ignored");
        assert_eq!(failure, Outcome::failure("awi:x"));
    }

    #[test]
    fn print_renders_answers() {
        assert_eq!(Outcome::answer("plain text").print(), "plain text");
        assert_eq!(Outcome::answer(Value::Null).print(), "");
        assert_eq!(Outcome::answer(json!(["a", "b"])).print(), "a\nb");
        assert_eq!(Outcome::answer(json!({"k": 2})).print(), r#"{"k":2}"#);
    }

    #[test]
    fn print_renders_failures() {
        assert_eq!(
            missing_parameter(NAMESPACE, "subject").print(),
            "awi:missing-parameter: subject"
        );
        assert_eq!(
            not_found(NAMESPACE, "procedure", "jokes").print(),
            "awi:procedure-not-found: jokes"
        );
        let structured = Outcome::failure("awi:bad").with_data(json!({"deep": true}));
        assert_eq!(structured.print(), "awi:bad");
        assert_eq!(structured.details(), vec![r#"data: {"deep":true}"#.to_string()]);
    }

    #[test]
    fn nothing_to_play_carries_stack() {
        let outcome = nothing_to_play(NAMESPACE);
        assert_eq!(outcome.message(), Some("awi:nothing-to-play"));
        match outcome {
            Outcome::Failure { stack, .. } => assert!(stack.is_some()),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn core_error_becomes_failure() {
        let outcome: Outcome = CoreError::NotFound("persona x".to_string()).into();
        assert_eq!(outcome.message(), Some("awi:not-found"));
        assert_eq!(outcome.data(), Some(&json!("not found: persona x")));
    }

    #[test]
    fn serializes_with_type_tag() {
        let value = serde_json::to_value(Outcome::answer("x").with_kind("data")).unwrap();
        assert_eq!(value, json!({"type": "answer", "value": "x", "kind": "data"}));
        let back: Outcome = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), Some("data"));
    }
}
