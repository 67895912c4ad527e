use serde_json::json;

use crate::basket::{Args, Basket};
use crate::command::{data_answer, require_inputs, resolve_or_ask, text_input, Command, CommandDescriptor};
use crate::control::Control;
use crate::editor::{PrintStyle, Speaker};
use crate::error::CoreError;
use crate::input::InputSpec;
use crate::outcome::{not_found, Outcome, NAMESPACE};

pub const TOKEN: &str = "persona";

/// Prompt a persona may define to greet the operator once loaded.
pub const WELCOME_PROMPT: &str = "welcome";

/// Switches the active persona.
pub struct PersonaCommand {
    descriptor: CommandDescriptor,
}

impl PersonaCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new(TOKEN, "Persona", "switches the active persona")
                .input(InputSpec::text("token", "Persona to load"))
                .output("persona", "object", "Token and name of the loaded persona")
                .parser("persona|become|switch to"),
        }
    }

    async fn switch(&self, token: &str, control: &Control) -> Outcome {
        let host = control.host();
        let persona = match host.personas().load_persona(token).await {
            Ok(persona) => persona,
            Err(CoreError::NotFound(_)) => return not_found(NAMESPACE, "persona", token),
            Err(error) => return Outcome::from(error),
        };
        let answer = data_answer(json!({ "token": persona.token, "name": persona.name }));
        let welcome = persona.prompts.get(WELCOME_PROMPT).cloned();
        if let Err(error) = host.config().set_persona(persona) {
            return Outcome::from(error);
        }
        tracing::info!(persona = token, "persona switched");
        if let Some(welcome) = welcome {
            control
                .editor()
                .print(welcome, PrintStyle::new(Speaker::Awi).spaced());
        }
        answer
    }
}

impl Default for PersonaCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Command for PersonaCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn play(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        let inputs = match resolve_or_ask(&self.descriptor, args, basket, control).await {
            Ok(inputs) => inputs,
            Err(failure) => return failure,
        };
        let token = text_input(&inputs, "token").unwrap_or_default();
        self.switch(token.trim(), control).await
    }

    async fn playback(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        let inputs = match require_inputs(&self.descriptor, args, basket) {
            Ok(inputs) => inputs,
            Err(failure) => return failure,
        };
        let token = text_input(&inputs, "token").unwrap_or_default();
        self.switch(token.trim(), control).await
    }
}
