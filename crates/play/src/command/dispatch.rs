//! Command invocation pipeline: parse, guard, bind, play, record.

use chrono::Utc;
use serde_json::Value;

use crate::basket::{Args, Basket};
use crate::control::{abort_on_runaway, Control};
use crate::editor::{PrintStyle, Speaker};
use crate::host::Host;
use crate::outcome::{error_key, not_found, Outcome, NAMESPACE};

use super::invocation::{InvocationRecord, InvocationStatus};
use super::parser::parse;
use super::types::ParsedCommand;
use super::CommandDescriptor;

/// Runs one command line through the full pipeline.
///
/// `args` supplied by the caller take precedence over values parsed from
/// the line.
pub async fn dispatch(
    host: &Host,
    line: &str,
    args: Args,
    basket: &mut Basket,
    control: &Control,
) -> Outcome {
    let prefix = host.config().command_prefix();
    let Some(parsed) = parse(&prefix, line) else {
        return Outcome::failure(error_key(NAMESPACE, "not-a-command")).with_data(line);
    };

    let control = control.enter();
    abort_on_runaway(control.depth(), &parsed.token);

    let Some(command) = host.command(&parsed.token) else {
        tracing::warn!(token = %parsed.token, "unknown command");
        return not_found(NAMESPACE, "command", &parsed.token);
    };

    let mut args = args;
    args.merge_missing(bind_args(command.descriptor(), &parsed));

    tracing::debug!(
        token = %parsed.token,
        depth = control.depth(),
        recursive = control.is_recursive(),
        "dispatching command"
    );
    let started_at = Utc::now();
    let outcome = command.play(&args, basket, &control).await;
    let ended_at = Utc::now();

    let record = InvocationRecord::new(
        parsed.token.clone(),
        line.to_string(),
        args,
        control.depth(),
        control.is_recursive(),
        started_at,
        ended_at,
        outcome.clone(),
    );
    match record.status {
        InvocationStatus::Success => {
            tracing::debug!(token = %record.token, duration_ms = record.duration_ms, "command answered");
        }
        InvocationStatus::Cancelled => {
            tracing::debug!(token = %record.token, "command cancelled by operator");
        }
        InvocationStatus::Failed => {
            tracing::warn!(token = %record.token, failure = %outcome.print(), "command failed");
        }
    }
    host.invocations().append(record);
    outcome
}

/// Turns parsed words into named args: `key=value` pairs as given, then
/// positional words bound to the declared inputs not named explicitly, in
/// declaration order. Words left over are exposed as "1".."N".
pub fn bind_args(descriptor: &CommandDescriptor, parsed: &ParsedCommand) -> Args {
    let mut args = Args::new();
    for (key, value) in &parsed.named {
        args.insert(key.clone(), value.clone());
    }

    let mut free_inputs = descriptor
        .inputs
        .iter()
        .filter(|input| !args.contains(&input.name))
        .map(|input| input.name.clone())
        .collect::<Vec<_>>()
        .into_iter();

    let mut extra = 0;
    for word in &parsed.positional {
        match free_inputs.next() {
            Some(name) => args.insert(name, word.clone()),
            None => {
                extra += 1;
                args.insert(extra.to_string(), word.clone());
            }
        }
    }
    args
}

/// Replays recorded top-level invocations in order, stopping at the first
/// failure. Commands without a playback of their own have their recorded
/// outcome re-printed instead.
pub async fn replay(
    host: &Host,
    records: &[InvocationRecord],
    basket: &mut Basket,
    control: &Control,
) -> Outcome {
    let editor = control.editor();
    let unsupported = error_key(NAMESPACE, "nothing-to-play");
    let mut last = Outcome::answer(Value::Null);

    for record in records.iter().filter(|record| record.is_top_level()) {
        let Some(command) = host.command(&record.token) else {
            return not_found(NAMESPACE, "command", &record.token);
        };
        let control = control.enter();
        abort_on_runaway(control.depth(), &record.token);

        editor.print(record.line.as_str(), PrintStyle::new(Speaker::User));
        let outcome = command.playback(&record.args, basket, &control).await;
        if outcome.message() == Some(unsupported.as_str()) {
            editor.print(record.outcome.print(), PrintStyle::new(Speaker::Result));
            last = record.outcome.clone();
            continue;
        }
        if outcome.is_error() {
            return outcome;
        }
        last = outcome;
    }
    last
}
