use serde_json::json;

use crate::basket::{Args, Basket};
use crate::command::{data_answer, require_inputs, text_input, Command, CommandDescriptor};
use crate::control::Control;
use crate::editor::{PrintStyle, Speaker};
use crate::input::InputSpec;
use crate::outcome::{not_found, Outcome, NAMESPACE};

pub const TOKEN: &str = "help";

/// Lists registered commands, or the inputs of one of them.
pub struct HelpCommand {
    descriptor: CommandDescriptor,
}

impl HelpCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new(TOKEN, "Help", "lists the available commands")
                .input(InputSpec::text("command", "Command to describe").optional())
                .output("commands", "array", "Tokens of the listed commands")
                .parser("help|what can you do"),
        }
    }
}

impl Default for HelpCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Command for HelpCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn play(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        let inputs = match require_inputs(&self.descriptor, args, basket) {
            Ok(inputs) => inputs,
            Err(failure) => return failure,
        };
        let host = control.host();
        let prefix = host.config().command_prefix();
        let editor = control.editor();

        if let Some(token) = text_input(&inputs, "command") {
            let token = token.trim().trim_start_matches(prefix.as_str()).to_lowercase();
            let Some(command) = host.command(&token) else {
                return not_found(NAMESPACE, "command", &token);
            };
            let descriptor = command.descriptor();
            let mut lines = vec![format!("{prefix}{} - {}", descriptor.token, descriptor.action)];
            for input in &descriptor.inputs {
                let marker = if input.optional { " (optional)" } else { "" };
                lines.push(format!(
                    "  {} <{}>{marker} {}",
                    input.name,
                    input.kind.type_name(),
                    input.description
                ));
            }
            editor.print(lines, PrintStyle::new(Speaker::Result));
            return data_answer(json!({ "commands": [descriptor.token] }));
        }

        let descriptors = host.registry().descriptors();
        let lines: Vec<String> = descriptors
            .iter()
            .map(|descriptor| format!("{prefix}{} - {}", descriptor.token, descriptor.action))
            .collect();
        editor.print(lines, PrintStyle::new(Speaker::Result));
        let tokens: Vec<&str> = descriptors.iter().map(|d| d.token.as_str()).collect();
        data_answer(json!({ "commands": tokens }))
    }

    async fn playback(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        self.play(args, basket, control).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;

    #[tokio::test]
    async fn lists_all_commands() {
        let fixture = fixture();
        let outcome = fixture
            .host
            .dispatch("awi.help", Args::new(), &mut Basket::new(), &fixture.control())
            .await;
        assert_eq!(outcome.kind(), Some("data"));
        let commands = outcome.value().unwrap()["commands"].as_array().unwrap().clone();
        assert!(commands.contains(&json!("verbose")));
        assert!(commands.contains(&json!("echo")));

        let printed = fixture.terminal.texts(Speaker::Result);
        assert!(printed.contains(&"awi.help - lists the available commands".to_string()));
    }

    #[tokio::test]
    async fn describes_one_command() {
        let fixture = fixture();
        let outcome = fixture
            .host
            .dispatch("awi.help awi.verbose", Args::new(), &mut Basket::new(), &fixture.control())
            .await;
        assert_eq!(outcome.value().unwrap()["commands"], json!(["verbose"]));
        let printed = fixture.terminal.texts(Speaker::Result);
        assert!(printed.iter().any(|line| line.starts_with("  level <number>")));
    }

    #[tokio::test]
    async fn unknown_command_is_not_found() {
        let fixture = fixture();
        let outcome = fixture
            .host
            .dispatch("awi.help bogus", Args::new(), &mut Basket::new(), &fixture.control())
            .await;
        assert_eq!(outcome.message(), Some("awi:command-not-found"));
    }
}
