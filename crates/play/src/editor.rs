//! Line-oriented operator interface.
//!
//! Output is rendered through a [`Terminal`]. Input arrives one line at a
//! time through [`Editor::deliver_line`]; when an interactive command holds
//! the input route the line goes to its handler, otherwise it is handed back
//! to the caller for normal dispatch.

use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

pub const DEFAULT_PROMPT: &str = ".(o) ";

/// Who a printed line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// Echo of operator input.
    User,
    /// Assistant speech.
    Awi,
    /// Command results.
    Result,
    Information,
    Warning,
}

impl Speaker {
    fn prefix(self) -> &'static str {
        match self {
            Speaker::User => ".(o) ",
            Speaker::Awi => "(°°) ",
            Speaker::Result => ".... ",
            Speaker::Information => "[?] ",
            Speaker::Warning => "[!] ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintStyle {
    pub user: Speaker,
    pub new_line: bool,
    /// Emit a blank line first.
    pub space: bool,
    /// Minimum verbosity at which the text is shown.
    pub verbose: u8,
}

impl PrintStyle {
    pub fn new(user: Speaker) -> Self {
        Self {
            user,
            new_line: true,
            space: false,
            verbose: 1,
        }
    }

    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    pub fn spaced(mut self) -> Self {
        self.space = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.new_line = false;
        self
    }
}

/// Text to print: one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lines(Vec<String>);

impl Lines {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Lines {
    fn from(text: &str) -> Self {
        Lines(text.split('\n').map(str::to_string).collect())
    }
}

impl From<String> for Lines {
    fn from(text: String) -> Self {
        Lines::from(text.as_str())
    }
}

impl From<Vec<String>> for Lines {
    fn from(lines: Vec<String>) -> Self {
        Lines(lines)
    }
}

impl From<&[&str]> for Lines {
    fn from(lines: &[&str]) -> Self {
        Lines(lines.iter().map(|line| line.to_string()).collect())
    }
}

/// Output device behind an editor.
pub trait Terminal: Send + Sync {
    fn write(&self, speaker: Speaker, text: &str, new_line: bool);

    /// Shows the prompt and signals readiness for the next line.
    fn show_prompt(&self, prompt: &str, force: bool);
}

/// Writes to the process stdout.
#[derive(Debug, Default)]
pub struct StdTerminal;

impl Terminal for StdTerminal {
    fn write(&self, speaker: Speaker, text: &str, new_line: bool) {
        let mut out = std::io::stdout().lock();
        let _ = if new_line {
            writeln!(out, "{}{}", speaker.prefix(), text)
        } else {
            write!(out, "{}{}", speaker.prefix(), text)
        };
        let _ = out.flush();
    }

    fn show_prompt(&self, prompt: &str, _force: bool) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "{prompt}");
        let _ = out.flush();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLine {
    pub speaker: Speaker,
    pub text: String,
}

/// Records everything written, for hosts that render elsewhere and for tests.
#[derive(Debug, Default)]
pub struct BufferTerminal {
    lines: Mutex<Vec<TerminalLine>>,
    prompts: Mutex<Vec<String>>,
}

impl BufferTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<TerminalLine> {
        lock(&self.lines).clone()
    }

    /// Texts written by `speaker`, in order.
    pub fn texts(&self, speaker: Speaker) -> Vec<String> {
        lock(&self.lines)
            .iter()
            .filter(|line| line.speaker == speaker)
            .map(|line| line.text.clone())
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

impl Terminal for BufferTerminal {
    fn write(&self, speaker: Speaker, text: &str, _new_line: bool) {
        lock(&self.lines).push(TerminalLine {
            speaker,
            text: text.to_string(),
        });
    }

    fn show_prompt(&self, prompt: &str, _force: bool) {
        lock(&self.prompts).push(prompt.to_string());
    }
}

/// What an input handler wants after consuming a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerFlow {
    /// Keep receiving lines.
    Keep,
    /// Done; restore default routing.
    Release,
}

pub type InputHandler = Box<dyn FnMut(&Editor, &str) -> HandlerFlow + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// An input handler consumed the line.
    Handled,
    /// No handler installed; the line is returned for normal dispatch.
    Unrouted(String),
}

#[derive(Default)]
struct RouteSlot {
    owner: Option<u64>,
    /// `None` while the owner's handler is running.
    handler: Option<InputHandler>,
}

pub struct Editor {
    terminal: Arc<dyn Terminal>,
    prompt: Mutex<String>,
    verbosity: AtomicU8,
    route: Mutex<RouteSlot>,
    next_route: AtomicU64,
    route_installed: Notify,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Editor")
            .field("prompt", &*lock(&self.prompt))
            .field("verbosity", &self.verbosity())
            .field("routed", &self.is_rerouted())
            .finish()
    }
}

impl Editor {
    pub fn new(terminal: Arc<dyn Terminal>, verbosity: u8) -> Self {
        Self {
            terminal,
            prompt: Mutex::new(DEFAULT_PROMPT.to_string()),
            verbosity: AtomicU8::new(verbosity),
            route: Mutex::new(RouteSlot::default()),
            next_route: AtomicU64::new(1),
            route_installed: Notify::new(),
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity.load(Ordering::SeqCst)
    }

    pub fn set_verbosity(&self, level: u8) {
        self.verbosity.store(level, Ordering::SeqCst);
    }

    /// Renders `lines` unless `style.verbose` is above the verbosity threshold.
    pub fn print(&self, lines: impl Into<Lines>, style: PrintStyle) {
        if style.verbose > self.verbosity() {
            return;
        }
        if style.space {
            self.terminal.write(style.user, "", true);
        }
        for line in lines.into().0 {
            self.terminal.write(style.user, &line, style.new_line);
        }
    }

    pub fn prompt(&self) -> String {
        lock(&self.prompt).clone()
    }

    pub fn set_prompt(&self, text: &str) {
        *lock(&self.prompt) = text.to_string();
    }

    pub fn reset_prompt(&self) {
        self.set_prompt(DEFAULT_PROMPT);
    }

    /// Signals that the next line may be typed.
    pub fn wait_for_input(&self, force: bool) {
        let prompt = self.prompt();
        self.terminal.show_prompt(&prompt, force);
    }

    /// Installs `handler` as the exclusive receiver of raw lines, replacing
    /// any handler already installed. The route is held until the handler
    /// returns [`HandlerFlow::Release`] or the returned token is dropped.
    pub fn reroute_input(self: &Arc<Self>, handler: InputHandler) -> InputSession {
        let id = self.next_route.fetch_add(1, Ordering::SeqCst);
        let mut slot = lock(&self.route);
        if let Some(previous) = slot.owner {
            tracing::debug!(previous, id, "input route replaced");
        }
        slot.owner = Some(id);
        slot.handler = Some(handler);
        self.route_installed.notify_one();
        InputSession {
            editor: Arc::clone(self),
            id,
        }
    }

    /// Restores default routing regardless of who holds the route.
    pub fn clear_input_route(&self) {
        let mut slot = lock(&self.route);
        slot.owner = None;
        slot.handler = None;
    }

    /// Completes once a handler has been installed since the last call.
    /// May complete spuriously; check [`Editor::is_rerouted`] afterwards.
    pub async fn route_installed(&self) {
        self.route_installed.notified().await;
    }

    pub fn is_rerouted(&self) -> bool {
        lock(&self.route).owner.is_some()
    }

    /// Delivers one operator line.
    pub fn deliver_line(&self, line: &str) -> Delivery {
        let (id, mut handler) = {
            let mut slot = lock(&self.route);
            match (slot.owner, slot.handler.take()) {
                (Some(id), Some(handler)) => (id, handler),
                _ => return Delivery::Unrouted(line.to_string()),
            }
        };

        let flow = handler(self, line);

        let mut slot = lock(&self.route);
        if slot.owner == Some(id) {
            match flow {
                HandlerFlow::Keep => slot.handler = Some(handler),
                HandlerFlow::Release => slot.owner = None,
            }
        }
        Delivery::Handled
    }

    fn release(&self, id: u64) {
        let mut slot = lock(&self.route);
        if slot.owner == Some(id) {
            slot.owner = None;
            slot.handler = None;
        }
    }
}

/// Exclusive hold on an editor's input route. Dropping it restores default
/// routing if this session still owns the route.
#[must_use = "dropping the session releases the input route"]
pub struct InputSession {
    editor: Arc<Editor>,
    id: u64,
}

impl InputSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        lock(&self.editor.route).owner == Some(self.id)
    }
}

impl Drop for InputSession {
    fn drop(&mut self) {
        self.editor.release(self.id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> (Arc<Editor>, Arc<BufferTerminal>) {
        let terminal = Arc::new(BufferTerminal::new());
        (Arc::new(Editor::new(terminal.clone(), 1)), terminal)
    }

    #[test]
    fn print_splits_lines_and_respects_verbosity() {
        let (editor, terminal) = editor();
        editor.print("one\ntwo", PrintStyle::new(Speaker::Awi));
        editor.print("hidden", PrintStyle::new(Speaker::Awi).verbose(3));
        editor.print(vec!["three".to_string()], PrintStyle::new(Speaker::Result).spaced());

        assert_eq!(terminal.texts(Speaker::Awi), vec!["one", "two"]);
        assert_eq!(terminal.texts(Speaker::Result), vec!["", "three"]);

        editor.set_verbosity(3);
        editor.print("shown", PrintStyle::new(Speaker::Awi).verbose(3));
        assert_eq!(terminal.texts(Speaker::Awi).last().map(String::as_str), Some("shown"));
    }

    #[test]
    fn unrouted_lines_are_returned() {
        let (editor, _) = editor();
        assert_eq!(
            editor.deliver_line("hello"),
            Delivery::Unrouted("hello".to_string())
        );
    }

    #[test]
    fn handler_receives_lines_until_release() {
        let (editor, _) = editor();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let session = editor.reroute_input(Box::new(move |_, line| {
            sink.lock().unwrap().push(line.to_string());
            if line == "stop" {
                HandlerFlow::Release
            } else {
                HandlerFlow::Keep
            }
        }));

        assert_eq!(editor.deliver_line("a"), Delivery::Handled);
        assert!(session.is_active());
        assert_eq!(editor.deliver_line("stop"), Delivery::Handled);
        assert!(!session.is_active());
        assert!(!editor.is_rerouted());
        assert_eq!(editor.deliver_line("after"), Delivery::Unrouted("after".to_string()));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "stop"]);
    }

    #[test]
    fn dropping_session_restores_routing() {
        let (editor, _) = editor();
        let session = editor.reroute_input(Box::new(|_, _| HandlerFlow::Keep));
        assert!(editor.is_rerouted());
        drop(session);
        assert!(!editor.is_rerouted());
    }

    #[test]
    fn new_route_replaces_old_and_old_drop_is_harmless() {
        let (editor, _) = editor();
        let first = editor.reroute_input(Box::new(|_, _| HandlerFlow::Keep));
        let second = editor.reroute_input(Box::new(|_, _| HandlerFlow::Keep));
        assert!(!first.is_active());
        assert!(second.is_active());

        drop(first);
        assert!(editor.is_rerouted());
        drop(second);
        assert!(!editor.is_rerouted());
    }

    #[test]
    fn prompt_is_shown_on_wait() {
        let (editor, terminal) = editor();
        editor.set_prompt("Your name? ");
        editor.wait_for_input(false);
        editor.reset_prompt();
        editor.wait_for_input(true);
        assert_eq!(terminal.prompts(), vec!["Your name? ".to_string(), DEFAULT_PROMPT.to_string()]);
    }

    #[tokio::test]
    async fn route_installed_wakes_after_reroute() {
        let (editor, _) = editor();
        let waiter = {
            let editor = editor.clone();
            tokio::spawn(async move { editor.route_installed().await })
        };
        tokio::task::yield_now().await;
        let _session = editor.reroute_input(Box::new(|_, _| HandlerFlow::Keep));
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("woken")
            .expect("join");
    }
}
