//! Interactive input: suspend a command until the operator has answered.
//!
//! [`Collector`] is the per-question state machine and knows nothing about
//! I/O. [`ask`] wires a collector to an [`Editor`]: it takes the editor's
//! input route, feeds every delivered line to the collector and resolves a
//! oneshot exactly once when the collector reaches a terminal state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::editor::{Editor, HandlerFlow, PrintStyle, Speaker};
use crate::outcome::{cancelled, Outcome, NAMESPACE};

/// Inclusive numeric range. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn at_least(start: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn at_most(end: i64) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, number: i64) -> bool {
        self.start.map_or(true, |start| number >= start)
            && self.end.map_or(true, |end| number <= end)
    }

    /// Short form for prompts: `1-4`, `>= 1`, `<= 9`.
    fn bounds(&self) -> Option<String> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(format!("{start}-{end}")),
            (Some(start), None) => Some(format!(">= {start}")),
            (None, Some(end)) => Some(format!("<= {end}")),
            (None, None) => None,
        }
    }

    /// Phrase for hints: `between 1 and 4`, `of at least 1`, `of at most 9`.
    fn describe(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("between {start} and {end}"),
            (Some(start), None) => format!("of at least {start}"),
            (None, Some(end)) => format!("of at most {end}"),
            (None, None) => "of any size".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval: Option<Interval>,
    },
    #[serde(rename = "yesno")]
    YesNo,
    Choices {
        choices: Vec<String>,
    },
    Array,
}

impl InputKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            InputKind::Text => "string",
            InputKind::Number { .. } => "number",
            InputKind::YesNo => "yesno",
            InputKind::Choices { .. } => "choices",
            InputKind::Array => "array",
        }
    }
}

/// Declared input of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: InputKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl InputSpec {
    pub fn new(name: impl Into<String>, kind: InputKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            optional: false,
            default: None,
        }
    }

    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::Text, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::Number { interval: None }, description)
    }

    pub fn yes_no(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::YesNo, description)
    }

    pub fn choices(
        name: impl Into<String>,
        description: impl Into<String>,
        choices: &[&str],
    ) -> Self {
        let choices = choices.iter().map(|choice| choice.to_string()).collect();
        Self::new(name, InputKind::Choices { choices }, description)
    }

    pub fn array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::Array, description)
    }

    /// Restricts a number input to `start..=end`. No effect on other kinds.
    pub fn interval(self, start: i64, end: i64) -> Self {
        self.bounded(Interval::new(start, end))
    }

    /// Restricts a number input. No effect on other kinds.
    pub fn bounded(mut self, bounds: Interval) -> Self {
        if let InputKind::Number { interval } = &mut self.kind {
            *interval = Some(bounds);
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Idle,
    Prompting,
    Validating,
    Resolved,
    Cancelled,
}

/// Result of feeding one line to a [`Collector`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Line rejected; ask again, optionally explaining why.
    Reprompt { hint: Option<String> },
    /// Array element accepted; ask for the next one.
    Next,
    Resolved(Value),
    Cancelled,
}

/// State machine for a single question.
#[derive(Debug, Clone)]
pub struct Collector {
    spec: InputSpec,
    state: InputState,
    items: Vec<Value>,
}

impl Collector {
    pub fn new(spec: InputSpec) -> Self {
        Self {
            spec,
            state: InputState::Idle,
            items: Vec::new(),
        }
    }

    pub fn spec(&self) -> &InputSpec {
        &self.spec
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, InputState::Resolved | InputState::Cancelled)
    }

    /// Lines printed once when the question is first asked.
    pub fn intro(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.spec.description.is_empty() {
            lines.push(self.spec.description.clone());
        }
        match &self.spec.kind {
            InputKind::Choices { choices } => {
                lines.extend(
                    choices
                        .iter()
                        .enumerate()
                        .map(|(index, choice)| format!("{}. {choice}", index + 1)),
                );
            }
            InputKind::Array => {
                lines.push("One item per line, empty line to finish.".to_string());
            }
            _ => {}
        }
        lines
    }

    /// Prompt for the next line.
    pub fn prompt(&self) -> String {
        match &self.spec.kind {
            InputKind::Array => format!("{}. ", self.items.len() + 1),
            InputKind::Choices { choices } => format!("Choice (1-{}): ", choices.len()),
            InputKind::YesNo => match self.spec.default.as_ref().and_then(Value::as_str) {
                Some(default) => format!("{} (y/n, Enter for {default}): ", self.label()),
                None => format!("{} (y/n): ", self.label()),
            },
            InputKind::Number { interval } => {
                match interval.as_ref().and_then(Interval::bounds) {
                    Some(bounds) => format!("{} ({bounds}): ", self.label()),
                    None => format!("{}: ", self.label()),
                }
            }
            _ => format!("{}: ", self.label()),
        }
    }

    fn label(&self) -> &str {
        &self.spec.name
    }

    /// Idle -> Prompting.
    pub fn begin(&mut self) {
        if self.state == InputState::Idle {
            self.state = InputState::Prompting;
        }
    }

    /// Validates one operator line.
    pub fn feed(&mut self, line: &str) -> Step {
        if self.is_finished() {
            return Step::Reprompt { hint: None };
        }
        self.state = InputState::Validating;
        let line = line.trim_end_matches(['\r', '\n']);
        let step = match self.spec.kind.clone() {
            InputKind::Array => self.feed_array(line),
            InputKind::Choices { choices } => self.feed_choice(line, &choices),
            InputKind::YesNo => self.feed_yes_no(line),
            InputKind::Number { interval } => self.feed_number(line, interval),
            InputKind::Text => self.feed_text(line),
        };
        self.state = match &step {
            Step::Resolved(_) => InputState::Resolved,
            Step::Cancelled => InputState::Cancelled,
            Step::Reprompt { .. } | Step::Next => InputState::Prompting,
        };
        step
    }

    fn feed_array(&mut self, line: &str) -> Step {
        let item = strip_ordinal(line);
        if is_cancel_sentinel(item) {
            return Step::Resolved(Value::Array(std::mem::take(&mut self.items)));
        }
        self.items.push(Value::String(item.to_string()));
        Step::Next
    }

    fn feed_choice(&mut self, line: &str, choices: &[String]) -> Step {
        if is_cancel_sentinel(line) {
            return self.fallback();
        }
        match line.trim().parse::<usize>() {
            Ok(index) if index >= 1 && index <= choices.len() => {
                Step::Resolved(Value::String(choices[index - 1].clone()))
            }
            _ => Step::Reprompt {
                hint: Some(format!(
                    "Please enter a number between 1 and {}.",
                    choices.len()
                )),
            },
        }
    }

    fn feed_yes_no(&mut self, line: &str) -> Step {
        if is_cancel_sentinel(line) {
            return self.fallback();
        }
        if line.trim_start().starts_with(['y', 'Y']) {
            Step::Resolved(Value::String("yes".to_string()))
        } else {
            Step::Reprompt {
                hint: Some("Type y to confirm, or an empty line to skip.".to_string()),
            }
        }
    }

    fn feed_number(&mut self, line: &str, interval: Option<Interval>) -> Step {
        if is_cancel_sentinel(line) {
            return self.fallback();
        }
        let Ok(number) = line.trim().parse::<i64>() else {
            return Step::Reprompt { hint: None };
        };
        match interval {
            Some(interval) if !interval.contains(number) => Step::Reprompt {
                hint: Some(format!("Please enter a number {}.", interval.describe())),
            },
            _ => Step::Resolved(Value::from(number)),
        }
    }

    fn feed_text(&mut self, line: &str) -> Step {
        if !is_cancel_sentinel(line) {
            return Step::Resolved(Value::String(line.to_string()));
        }
        if let Some(default) = &self.spec.default {
            Step::Resolved(default.clone())
        } else if self.spec.optional {
            Step::Resolved(Value::String(String::new()))
        } else {
            Step::Reprompt { hint: None }
        }
    }

    /// Sentinel handling shared by typed inputs: default, then optional, then cancel.
    fn fallback(&self) -> Step {
        if let Some(default) = &self.spec.default {
            Step::Resolved(default.clone())
        } else if self.spec.optional {
            Step::Resolved(Value::Null)
        } else {
            Step::Cancelled
        }
    }
}

/// True when `line` is empty once leading non-alphanumeric characters and
/// surrounding whitespace are removed.
pub fn is_cancel_sentinel(line: &str) -> bool {
    line.trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end()
        .is_empty()
}

/// Removes a leading `N. ` ordinal the operator may have typed.
pub fn strip_ordinal(line: &str) -> &str {
    let trimmed = line.trim_start();
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return line;
    }
    match trimmed[digits..].strip_prefix('.') {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    }
}

/// Asks the operator one question and waits for the answer.
///
/// Resolves to an Answer holding the collected value, or to `awi:cancelled`
/// when the operator cancels or another interactive command takes over the
/// editor's input route.
pub async fn ask(editor: &Arc<Editor>, spec: &InputSpec) -> Outcome {
    let mut collector = Collector::new(spec.clone());
    let intro = collector.intro();
    if !intro.is_empty() {
        editor.print(intro, PrintStyle::new(Speaker::Awi));
    }
    collector.begin();
    editor.set_prompt(&collector.prompt());

    let (reply_tx, reply_rx) = oneshot::channel::<Outcome>();
    let mut reply_tx = Some(reply_tx);
    let session = editor.reroute_input(Box::new(move |editor, line| {
        match collector.feed(line) {
            Step::Reprompt { hint } => {
                if let Some(hint) = hint {
                    editor.print(hint, PrintStyle::new(Speaker::Awi));
                }
                editor.set_prompt(&collector.prompt());
                editor.wait_for_input(true);
                HandlerFlow::Keep
            }
            Step::Next => {
                editor.set_prompt(&collector.prompt());
                editor.wait_for_input(false);
                HandlerFlow::Keep
            }
            Step::Resolved(value) => {
                editor.reset_prompt();
                if let Some(reply) = reply_tx.take() {
                    let _ = reply.send(Outcome::answer(value));
                }
                HandlerFlow::Release
            }
            Step::Cancelled => {
                editor.reset_prompt();
                if let Some(reply) = reply_tx.take() {
                    let _ = reply.send(cancelled(NAMESPACE));
                }
                HandlerFlow::Release
            }
        }
    }));
    tracing::debug!(input = %spec.name, session = session.id(), "waiting for operator input");
    editor.wait_for_input(false);

    let outcome = match reply_rx.await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::debug!(input = %spec.name, "input route taken over by another session");
            cancelled(NAMESPACE)
        }
    };
    drop(session);

    if outcome.is_error() {
        tracing::debug!(input = %spec.name, "input cancelled");
    }
    outcome
}

/// Asks each question in order; stops at the first cancellation.
/// The Answer value is an object keyed by input name.
pub async fn ask_all(editor: &Arc<Editor>, specs: &[InputSpec]) -> Outcome {
    let mut answers = serde_json::Map::new();
    for spec in specs {
        let outcome = ask(editor, spec).await;
        match outcome.into_value() {
            Some(value) => {
                answers.insert(spec.name.clone(), value);
            }
            None => return cancelled(NAMESPACE),
        }
    }
    Outcome::answer(Value::Object(answers))
}
