use crate::basket::{Args, Basket};
use crate::command::{require_inputs, resolve_or_ask, Command, CommandDescriptor};
use crate::config::{MAX_VERBOSITY, MIN_VERBOSITY};
use crate::control::Control;
use crate::input::InputSpec;
use crate::outcome::{error_key, Outcome, NAMESPACE};
use crate::resolve::Resolved;

pub const TOKEN: &str = "verbose";

/// Sets how much the editor prints.
pub struct VerboseCommand {
    descriptor: CommandDescriptor,
}

impl VerboseCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new(TOKEN, "Verbosity", "sets the verbosity level")
                .input(
                    InputSpec::number("level", "1 is quiet, 4 shows everything")
                        .interval(MIN_VERBOSITY as i64, MAX_VERBOSITY as i64),
                )
                .output("level", "number", "The new level")
                .parser("verbose|verbosity"),
        }
    }

    fn apply(&self, level: Option<&Resolved>, control: &Control) -> Outcome {
        let Some(level) = level.and_then(Resolved::as_i64) else {
            return Outcome::failure(error_key(NAMESPACE, "invalid-verbosity"))
                .with_data(level.map(|l| l.value().clone()).unwrap_or_default());
        };
        let level = match u8::try_from(level) {
            Ok(level) => level,
            Err(_) => {
                return Outcome::failure(error_key(NAMESPACE, "invalid-verbosity")).with_data(level)
            }
        };
        if let Err(error) = control.host().config().set_verbosity(level) {
            tracing::debug!(%error, "verbosity rejected");
            return Outcome::failure(error_key(NAMESPACE, "invalid-verbosity")).with_data(level);
        }
        control.editor().set_verbosity(level);
        tracing::info!(level, "verbosity changed");
        Outcome::answer(level).with_code("verbosity")
    }
}

impl Default for VerboseCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Command for VerboseCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn play(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        match resolve_or_ask(&self.descriptor, args, basket, control).await {
            Ok(inputs) => self.apply(inputs.get("level"), control),
            Err(failure) => failure,
        }
    }

    /// Re-applies the recorded level without asking.
    async fn playback(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        match require_inputs(&self.descriptor, args, basket) {
            Ok(inputs) => self.apply(inputs.get("level"), control),
            Err(failure) => failure,
        }
    }
}
