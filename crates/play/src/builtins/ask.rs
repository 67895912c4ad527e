use std::collections::BTreeMap;

use serde_json::Value;

use crate::basket::{Args, Basket};
use crate::command::{require_inputs, text_input, Command, CommandDescriptor};
use crate::control::Control;
use crate::input::{ask, InputKind, InputSpec, Interval};
use crate::outcome::{error_key, Outcome, NAMESPACE};
use crate::resolve::Resolved;

pub const TOKEN: &str = "ask";

/// Asks the operator one question. The answer is also stored in the basket
/// under `store` when given, so later procedure steps can use it.
pub struct AskCommand {
    descriptor: CommandDescriptor,
}

impl AskCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new(TOKEN, "Ask", "asks the operator a question")
                .input(InputSpec::text("question", "Question shown to the operator"))
                .input(
                    InputSpec::choices(
                        "type",
                        "Kind of answer",
                        &["text", "number", "yesno", "choices", "array"],
                    )
                    .default_value("text"),
                )
                .input(InputSpec::text("choices", "Comma separated choices").optional())
                .input(InputSpec::text("default", "Answer used on an empty line").optional())
                .input(InputSpec::number("min", "Smallest accepted number").optional())
                .input(InputSpec::number("max", "Largest accepted number").optional())
                .input(InputSpec::text("store", "Basket key for the answer").optional())
                .output("answer", "any", "The collected value"),
        }
    }
}

impl Default for AskCommand {
    fn default() -> Self {
        Self::new()
    }
}

fn split_choices(value: &Resolved) -> Vec<String> {
    match value.value() {
        Value::Array(items) => items
            .iter()
            .map(|item| Resolved::from_value(item).as_text())
            .collect(),
        _ => value
            .as_text()
            .split(',')
            .map(|choice| choice.trim().to_string())
            .filter(|choice| !choice.is_empty())
            .collect(),
    }
}

/// Builds the question from resolved inputs; unknown kinds are rejected.
fn question_spec(
    name: &str,
    kind: &str,
    inputs: &BTreeMap<String, Resolved>,
) -> Result<InputSpec, Outcome> {
    let question = text_input(inputs, "question").unwrap_or_default();
    let kind = match kind.trim().to_lowercase().as_str() {
        "text" | "string" => InputKind::Text,
        "number" => {
            let min = inputs.get("min").and_then(Resolved::as_i64);
            let max = inputs.get("max").and_then(Resolved::as_i64);
            let interval = match (min, max) {
                (None, None) => None,
                (start, end) => Some(Interval { start, end }),
            };
            InputKind::Number { interval }
        }
        "yesno" => InputKind::YesNo,
        "choices" => {
            let choices = inputs.get("choices").map(split_choices).unwrap_or_default();
            if choices.is_empty() {
                return Err(
                    Outcome::failure(error_key(NAMESPACE, "missing-parameter")).with_data("choices")
                );
            }
            InputKind::Choices { choices }
        }
        "array" => InputKind::Array,
        other => {
            return Err(Outcome::failure(error_key(NAMESPACE, "invalid-input-type")).with_data(other));
        }
    };
    let mut spec = InputSpec::new(name, kind, question);
    if let Some(default) = inputs.get("default") {
        spec = spec.default_value(default.value().clone());
    }
    Ok(spec)
}

#[async_trait::async_trait]
impl Command for AskCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn play(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        let inputs = match require_inputs(&self.descriptor, args, basket) {
            Ok(inputs) => inputs,
            Err(failure) => return failure,
        };
        let store = text_input(&inputs, "store").filter(|key| !key.trim().is_empty());
        let name = store.clone().unwrap_or_else(|| "answer".to_string());
        let kind = text_input(&inputs, "type").unwrap_or_default();
        let spec = match question_spec(&name, &kind, &inputs) {
            Ok(spec) => spec,
            Err(failure) => return failure,
        };

        let outcome = ask(control.editor(), &spec).await;
        if let (Some(key), Some(value)) = (store, outcome.value()) {
            basket.insert(key, value.clone());
        }
        outcome
    }
}
