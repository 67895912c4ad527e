pub mod basket;
pub mod builtins;
pub mod command;
pub mod config;
pub mod control;
pub mod editor;
pub mod error;
pub mod host;
pub mod input;
pub mod outcome;
pub mod procedure;
pub mod resolve;
pub mod session;

#[cfg(test)]
mod testing;

pub use crate::basket::{ArgValue, Args, Basket};
pub use crate::command::{Command, CommandDescriptor, CommandRegistry};
pub use crate::config::{ConfigStore, FilePersonaStore, PlayConfig};
pub use crate::control::Control;
pub use crate::editor::{Editor, StdTerminal, Terminal};
pub use crate::error::{CoreError, CoreResult};
pub use crate::host::{ConfigProvider, Conversation, Host, Persona, PersonaStore};
pub use crate::input::{ask, InputKind, InputSpec};
pub use crate::outcome::Outcome;
pub use crate::session::Session;
