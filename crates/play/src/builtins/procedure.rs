use crate::basket::{Args, Basket};
use crate::command::{require_inputs, text_input, Command, CommandDescriptor};
use crate::control::Control;
use crate::input::InputSpec;
use crate::outcome::Outcome;
use crate::procedure::{run, MAX_POSITIONAL};

pub const TOKEN: &str = "procedure";

/// Runs a procedure of the active persona by name.
pub struct ProcedureCommand {
    descriptor: CommandDescriptor,
}

impl ProcedureCommand {
    pub fn new() -> Self {
        let mut descriptor =
            CommandDescriptor::new(TOKEN, "Procedure", "runs a procedure of the active persona")
                .input(InputSpec::text("name", "Procedure to run"))
                .output("text", "string", "Result of the last step")
                .parser("run|do");
        for index in 1..=MAX_POSITIONAL {
            descriptor = descriptor.input(
                InputSpec::text(index.to_string(), format!("Parameter {index}")).optional(),
            );
        }
        Self { descriptor }
    }
}

impl Default for ProcedureCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Command for ProcedureCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn play(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        let inputs = match require_inputs(&self.descriptor, args, basket) {
            Ok(inputs) => inputs,
            Err(failure) => return failure,
        };
        let name = text_input(&inputs, "name").unwrap_or_default();
        let positional: Vec<Option<String>> = (1..=MAX_POSITIONAL)
            .map(|index| text_input(&inputs, &index.to_string()))
            .collect();
        run(name.trim(), &positional, args, basket, control).await
    }
}
