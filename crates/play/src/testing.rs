//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::time::{timeout, Duration};

use crate::basket::{Args, Basket};
use crate::builtins;
use crate::command::{require_inputs, text_input, Command, CommandDescriptor, CommandRegistry};
use crate::config::{ConfigStore, PlayConfig};
use crate::control::Control;
use crate::editor::{BufferTerminal, Editor};
use crate::error::{CoreError, CoreResult};
use crate::host::{ConfigProvider, Conversation, Host, Persona, PersonaStore};
use crate::input::InputSpec;
use crate::outcome::Outcome;

/// Answers every prompt with `reply to: <prompt>` and remembers prompts.
#[derive(Default)]
pub struct ScriptedConversation {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConversation {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Conversation for ScriptedConversation {
    async fn send(&self, prompt: &str, _args: &Args, _basket: &mut Basket, _control: &Control) -> Outcome {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Outcome::answer(format!("reply to: {prompt}"))
    }
}

#[derive(Default)]
pub struct MemoryPersonas {
    personas: Mutex<HashMap<String, Persona>>,
    loads: Mutex<usize>,
}

impl MemoryPersonas {
    pub fn loads(&self) -> usize {
        *self.loads.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl PersonaStore for MemoryPersonas {
    async fn load_persona(&self, token: &str) -> CoreResult<Persona> {
        *self.loads.lock().unwrap() += 1;
        self.personas
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("persona '{token}'")))
    }
}

/// Collects texts seen by `record`'s playback.
#[derive(Default)]
pub struct Recorder {
    played_back: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn played_back(&self) -> Vec<String> {
        self.played_back.lock().unwrap().clone()
    }
}

/// `echo`: answers its `text` input. `record`: same, with a playback that
/// notes the text. `fail`: fails with `test:<text>`.
struct TestCommand {
    descriptor: CommandDescriptor,
    recorder: Option<Arc<Recorder>>,
    fails: bool,
}

impl TestCommand {
    fn new(token: &str, recorder: Option<Arc<Recorder>>, fails: bool) -> Self {
        Self {
            descriptor: CommandDescriptor::new(token, token, "test command")
                .input(InputSpec::text("text", "")),
            recorder,
            fails,
        }
    }
}

#[async_trait::async_trait]
impl Command for TestCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn play(&self, args: &Args, basket: &mut Basket, _control: &Control) -> Outcome {
        let inputs = match require_inputs(&self.descriptor, args, basket) {
            Ok(inputs) => inputs,
            Err(failure) => return failure,
        };
        let text = text_input(&inputs, "text").unwrap_or_default();
        if self.fails {
            return Outcome::failure(format!("test:{text}")).with_data(text);
        }
        Outcome::answer(text)
    }

    async fn playback(&self, args: &Args, basket: &mut Basket, control: &Control) -> Outcome {
        let Some(recorder) = &self.recorder else {
            return crate::outcome::nothing_to_play(crate::outcome::NAMESPACE);
        };
        let outcome = self.play(args, basket, control).await;
        recorder
            .played_back
            .lock()
            .unwrap()
            .push(outcome.print());
        outcome
    }
}

pub struct Fixture {
    pub host: Arc<Host>,
    pub editor: Arc<Editor>,
    pub terminal: Arc<BufferTerminal>,
    pub conversation: Arc<ScriptedConversation>,
    pub personas: Arc<MemoryPersonas>,
    pub config: Arc<ConfigStore>,
    pub recorder: Arc<Recorder>,
}

impl Fixture {
    pub fn control(&self) -> Control {
        Control::new(self.editor.clone(), self.host.clone())
    }

    /// Adds a procedure to the active persona.
    pub fn set_procedure(&self, name: &str, definition: Value) {
        let mut persona = self.config.persona();
        persona.procedures.insert(name.to_string(), definition);
        self.config.set_persona(persona).unwrap();
    }

    pub async fn until_rerouted(&self) {
        timeout(Duration::from_secs(1), async {
            while !self.editor.is_rerouted() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("input route installed");
    }
}

pub fn fixture() -> Fixture {
    fixture_with_personas(Vec::new())
}

pub fn fixture_with_personas(stored: Vec<Persona>) -> Fixture {
    let terminal = Arc::new(BufferTerminal::new());
    let editor = Arc::new(Editor::new(terminal.clone(), 1));
    let conversation = Arc::new(ScriptedConversation::default());
    let personas = Arc::new(MemoryPersonas::default());
    {
        let mut map = personas.personas.lock().unwrap();
        for persona in stored {
            map.insert(persona.token.clone(), persona);
        }
    }
    let config = Arc::new(ConfigStore::in_memory(PlayConfig::default_new()));
    let recorder = Arc::new(Recorder::default());

    let mut registry = CommandRegistry::new();
    builtins::register(&mut registry);
    registry.register(Arc::new(TestCommand::new("echo", None, false)));
    registry.register(Arc::new(TestCommand::new("record", Some(recorder.clone()), false)));
    registry.register(Arc::new(TestCommand::new("fail", None, true)));

    let host = Arc::new(Host::new(
        registry,
        config.clone(),
        personas.clone(),
        conversation.clone(),
    ));

    Fixture {
        host,
        editor,
        terminal,
        conversation,
        personas,
        config,
        recorder,
    }
}
