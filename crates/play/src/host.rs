//! Collaborators the command core consumes from the surrounding assistant.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::basket::{Args, Basket};
use crate::command::invocation::{InvocationLog, InvocationRecord};
use crate::command::registry::CommandRegistry;
use crate::command::{dispatch, Command};
use crate::control::Control;
use crate::error::CoreResult;
use crate::outcome::{error_key, Outcome, NAMESPACE};

/// Assistant personality: prompts and authored procedures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
    /// Raw procedure definitions keyed by name; validated when run.
    #[serde(default)]
    pub procedures: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "user".to_string(),
            language: default_language(),
        }
    }
}

/// Configuration collaborator.
pub trait ConfigProvider: Send + Sync {
    /// Active persona as currently held in memory.
    fn persona(&self) -> Persona;
    fn set_persona(&self, persona: Persona) -> CoreResult<()>;
    fn prompt(&self, kind: &str) -> Option<String>;
    fn user_config(&self) -> UserConfig;
    fn verbosity(&self) -> u8;
    fn set_verbosity(&self, level: u8) -> CoreResult<()>;
    /// Prefix marking a line as a command invocation (e.g. `awi.`).
    fn command_prefix(&self) -> String;
}

/// Durable source of persona definitions.
#[async_trait::async_trait]
pub trait PersonaStore: Send + Sync {
    async fn load_persona(&self, token: &str) -> CoreResult<Persona>;
}

/// Free-text conversational turn.
#[async_trait::async_trait]
pub trait Conversation: Send + Sync {
    async fn send(
        &self,
        prompt: &str,
        args: &Args,
        basket: &mut Basket,
        control: &Control,
    ) -> Outcome;
}

/// Conversation collaborator for hosts with no generation backend.
#[derive(Debug, Default)]
pub struct UnavailableConversation;

#[async_trait::async_trait]
impl Conversation for UnavailableConversation {
    async fn send(
        &self,
        prompt: &str,
        _args: &Args,
        _basket: &mut Basket,
        _control: &Control,
    ) -> Outcome {
        Outcome::failure(error_key(NAMESPACE, "conversation-unavailable")).with_data(prompt)
    }
}

/// Everything a command can reach besides its own arguments.
pub struct Host {
    registry: CommandRegistry,
    config: Arc<dyn ConfigProvider>,
    personas: Arc<dyn PersonaStore>,
    conversation: Arc<dyn Conversation>,
    invocations: InvocationLog,
}

impl Host {
    pub fn new(
        registry: CommandRegistry,
        config: Arc<dyn ConfigProvider>,
        personas: Arc<dyn PersonaStore>,
        conversation: Arc<dyn Conversation>,
    ) -> Self {
        Self {
            registry,
            config,
            personas,
            conversation,
            invocations: InvocationLog::new(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn command(&self, token: &str) -> Option<Arc<dyn Command>> {
        self.registry.get(token)
    }

    pub fn config(&self) -> &Arc<dyn ConfigProvider> {
        &self.config
    }

    pub fn personas(&self) -> &Arc<dyn PersonaStore> {
        &self.personas
    }

    pub fn conversation(&self) -> &Arc<dyn Conversation> {
        &self.conversation
    }

    pub fn invocations(&self) -> &InvocationLog {
        &self.invocations
    }

    /// Runs one textual command line (`<prefix><token> args...`).
    pub async fn dispatch(
        &self,
        line: &str,
        args: Args,
        basket: &mut Basket,
        control: &Control,
    ) -> Outcome {
        dispatch::dispatch(self, line, args, basket, control).await
    }

    /// Runs a free-text conversational turn.
    pub async fn converse(
        &self,
        prompt: &str,
        args: &Args,
        basket: &mut Basket,
        control: &Control,
    ) -> Outcome {
        self.conversation.send(prompt, args, basket, control).await
    }

    /// Replays recorded invocations through each command's `playback`.
    pub async fn replay(
        &self,
        records: &[InvocationRecord],
        basket: &mut Basket,
        control: &Control,
    ) -> Outcome {
        dispatch::replay(self, records, basket, control).await
    }
}
