//! Commands available in every session.
//!
//! Each module exposes a command type; [`register`] installs them all at
//! startup.

pub mod ask;
pub mod help;
pub mod persona;
pub mod procedure;
pub mod verbose;

use std::sync::Arc;

use crate::command::CommandRegistry;

/// Register all built-in commands.
pub fn register(registry: &mut CommandRegistry) {
    registry.register(Arc::new(ask::AskCommand::new()));
    registry.register(Arc::new(help::HelpCommand::new()));
    registry.register(Arc::new(persona::PersonaCommand::new()));
    registry.register(Arc::new(procedure::ProcedureCommand::new()));
    registry.register(Arc::new(verbose::VerboseCommand::new()));
}
