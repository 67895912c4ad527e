//! Lookup from dispatch token to command instance.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Command, CommandDescriptor};

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its token. Returns the command it replaced, if any.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        let token = command.token().to_lowercase();
        let previous = self.commands.insert(token.clone(), command);
        if previous.is_some() {
            tracing::warn!(token, "command replaced in registry");
        }
        previous
    }

    pub fn get(&self, token: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&token.to_lowercase()).cloned()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.commands.contains_key(&token.to_lowercase())
    }

    /// Registered commands sorted by token.
    pub fn list(&self) -> Vec<Arc<dyn Command>> {
        let mut commands: Vec<_> = self.commands.values().cloned().collect();
        commands.sort_by(|a, b| a.token().cmp(b.token()));
        commands
    }

    pub fn descriptors(&self) -> Vec<CommandDescriptor> {
        self.list()
            .iter()
            .map(|command| command.descriptor().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
