//! Command contract: descriptor, lifecycle, registry and dispatch.

pub mod dispatch;
pub mod invocation;
pub mod parser;
pub mod registry;
pub mod types;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::basket::{Args, Basket};
use crate::control::Control;
use crate::input::{ask, InputSpec};
use crate::outcome::{missing_parameter, nothing_to_play, Outcome, NAMESPACE};
use crate::resolve::{lookup, Resolved};

pub use parser::parse;
pub use registry::CommandRegistry;
pub use types::ParsedCommand;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// Static metadata of a command type, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    /// Unique dispatch key.
    pub token: String,
    /// Human description of what the command does.
    pub action: String,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    /// Pattern an upstream natural-language router may use to recognize
    /// the command in free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
}

impl CommandDescriptor {
    pub fn new(
        token: impl Into<String>,
        name: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            action: action.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parser: None,
        }
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.outputs.push(OutputSpec {
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
        });
        self
    }

    pub fn parser(mut self, pattern: impl Into<String>) -> Self {
        self.parser = Some(pattern.into());
        self
    }

    pub fn find_input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// A uniquely tokened unit of behavior.
///
/// The dispatcher runs the shared base behavior (depth guard, argument
/// binding, logging) before calling either entry point. A command that
/// overrides neither reports `awi:nothing-to-play`.
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    fn descriptor(&self) -> &CommandDescriptor;

    fn token(&self) -> &str {
        &self.descriptor().token
    }

    async fn play(&self, _args: &Args, _basket: &mut Basket, _control: &Control) -> Outcome {
        nothing_to_play(NAMESPACE)
    }

    /// Replays a previously recorded invocation.
    async fn playback(&self, _args: &Args, _basket: &mut Basket, _control: &Control) -> Outcome {
        nothing_to_play(NAMESPACE)
    }
}

/// Resolves every declared input, failing with `missing-parameter` for the
/// first mandatory one that has no value in args, basket or defaults.
pub fn require_inputs(
    descriptor: &CommandDescriptor,
    args: &Args,
    basket: &Basket,
) -> Result<BTreeMap<String, Resolved>, Outcome> {
    let mut resolved = BTreeMap::new();
    for input in &descriptor.inputs {
        match lookup_input(input, args, basket) {
            Some(value) => {
                resolved.insert(input.name.clone(), value);
            }
            None if input.optional => {}
            None => return Err(missing_parameter(NAMESPACE, &input.name)),
        }
    }
    Ok(resolved)
}

/// Like [`require_inputs`], but asks the operator for each missing
/// mandatory input instead of failing. Answers are stored in the basket so
/// later steps of the same turn can reuse them.
pub async fn resolve_or_ask(
    descriptor: &CommandDescriptor,
    args: &Args,
    basket: &mut Basket,
    control: &Control,
) -> Result<BTreeMap<String, Resolved>, Outcome> {
    let mut resolved = BTreeMap::new();
    for input in &descriptor.inputs {
        if let Some(value) = lookup_input(input, args, basket) {
            resolved.insert(input.name.clone(), value);
            continue;
        }
        if input.optional {
            continue;
        }
        let answer = ask(control.editor(), input).await;
        match answer.value() {
            Some(value) => {
                basket.insert(input.name.clone(), value.clone());
                resolved.insert(input.name.clone(), Resolved::from_value(value));
            }
            None => return Err(answer),
        }
    }
    Ok(resolved)
}

fn lookup_input(input: &InputSpec, args: &Args, basket: &Basket) -> Option<Resolved> {
    lookup(&input.name, args, basket, input.default.as_ref())
}

/// Convenience for command bodies reading an optional resolved input.
pub fn text_input(inputs: &BTreeMap<String, Resolved>, name: &str) -> Option<String> {
    inputs.get(name).map(Resolved::as_text)
}

/// Convenience for answers that carry a structured payload.
pub fn data_answer(value: Value) -> Outcome {
    Outcome::answer(value).with_kind("data")
}
