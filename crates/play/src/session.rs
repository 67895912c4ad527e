//! Session driver: feeds operator lines to the editor and runs turns.
//!
//! A turn (one command line or one conversational prompt) runs as a spawned
//! task holding the session basket, so lines keep flowing to the editor while
//! the turn is suspended on an interactive question. The basket comes back
//! when the turn ends.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::basket::{Args, Basket};
use crate::command::parser::is_command_line;
use crate::control::Control;
use crate::editor::{Delivery, Editor, PrintStyle, Speaker};
use crate::error::{CoreError, CoreResult};
use crate::host::Host;
use crate::outcome::{error_key, Outcome, NAMESPACE};

/// Verbosity at which failure data and stacks are shown.
pub const DETAILS_VERBOSITY: u8 = 3;

type Turn = (Outcome, Basket);

enum Event {
    Line(std::io::Result<Option<String>>),
    Finished(Result<Turn, JoinError>),
    RouteInstalled,
}

pub struct Session {
    id: Uuid,
    host: Arc<Host>,
    editor: Arc<Editor>,
    /// `None` while a turn holds it.
    basket: Option<Basket>,
    running: Option<JoinHandle<Turn>>,
    /// Lines that arrived while a turn was busy and nobody was asking.
    queued: VecDeque<String>,
}

impl Session {
    pub fn new(host: Arc<Host>, editor: Arc<Editor>) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "session opened");
        Self {
            id,
            host,
            editor,
            basket: Some(Basket::new()),
            running: None,
            queued: VecDeque::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn editor(&self) -> &Arc<Editor> {
        &self.editor
    }

    /// The basket, unless a turn currently holds it.
    pub fn basket(&self) -> Option<&Basket> {
        self.basket.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Routes one operator line: to the input handler when one is
    /// installed, otherwise to a new turn, or to the queue when a turn is
    /// already running.
    pub fn handle_line(&mut self, line: String) {
        let line = match self.editor.deliver_line(&line) {
            Delivery::Handled => return,
            Delivery::Unrouted(line) => line,
        };
        if self.is_busy() {
            tracing::debug!(session = %self.id, "turn busy, line queued");
            self.queued.push_back(line);
            return;
        }
        if line.trim().is_empty() {
            self.editor.wait_for_input(false);
            return;
        }
        self.start_turn(line);
    }

    fn start_turn(&mut self, line: String) {
        let host = self.host.clone();
        let control = Control::new(self.editor.clone(), host.clone());
        let mut basket = self.basket.take().unwrap_or_default();
        let prefix = host.config().command_prefix();

        tracing::debug!(session = %self.id, "turn started");
        self.running = Some(tokio::spawn(async move {
            let outcome = if is_command_line(&prefix, &line) {
                host.dispatch(&line, Args::new(), &mut basket, &control).await
            } else {
                host.converse(&line, &Args::new(), &mut basket, &control).await
            };
            (outcome, basket)
        }));
    }

    /// Waits for the running turn, if any, and reports its outcome.
    pub async fn finish_turn(&mut self) {
        if let Some(handle) = self.running.as_mut() {
            let joined = handle.await;
            self.complete(joined);
        }
    }

    fn complete(&mut self, joined: Result<Turn, JoinError>) {
        self.running = None;
        let outcome = match joined {
            Ok((outcome, basket)) => {
                self.basket = Some(basket);
                outcome
            }
            Err(error) => {
                tracing::error!(session = %self.id, %error, "turn task failed");
                self.basket = Some(Basket::new());
                Outcome::failure(error_key(NAMESPACE, "turn-failed")).with_data(error.to_string())
            }
        };
        self.report(&outcome);

        while !self.is_busy() {
            let Some(line) = self.queued.pop_front() else {
                break;
            };
            self.handle_line(line);
        }
        if !self.is_busy() {
            self.editor.wait_for_input(false);
        }
    }

    /// Prints a finished turn's outcome. Structured answers are left to the
    /// command that produced them unless the operator asked for more output.
    pub fn report(&self, outcome: &Outcome) {
        let editor = &self.editor;
        match outcome {
            Outcome::Answer { value, kind, .. } => {
                if value.is_null() {
                    return;
                }
                let level = if kind.as_deref() == Some("data") { 2 } else { 1 };
                editor.print(outcome.print(), PrintStyle::new(Speaker::Result).verbose(level));
            }
            Outcome::Failure { message, .. } => {
                let level = if message.ends_with(":cancelled") { 2 } else { 1 };
                editor.print(outcome.print(), PrintStyle::new(Speaker::Warning).verbose(level));
            }
        }
        let details = outcome.details();
        if !details.is_empty() {
            editor.print(
                details,
                PrintStyle::new(Speaker::Information).verbose(DETAILS_VERBOSITY),
            );
        }
    }

    /// Hands queued lines to the installed input handler, in order.
    fn flush_queued(&mut self) {
        while let Some(line) = self.queued.pop_front() {
            if let Delivery::Unrouted(line) = self.editor.deliver_line(&line) {
                self.queued.push_front(line);
                break;
            }
        }
    }

    /// Drives the session from a line source until it is exhausted and the
    /// last turn has ended. Questions still open once input is exhausted
    /// are cancelled.
    pub async fn run<R>(&mut self, reader: R) -> CoreResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut open = true;
        self.editor.wait_for_input(false);

        loop {
            if !open {
                if self.running.is_none() {
                    break;
                }
                if self.queued.is_empty() && self.editor.is_rerouted() {
                    tracing::debug!(session = %self.id, "input closed, cancelling open question");
                    self.editor.clear_input_route();
                }
            }

            let busy = self.running.is_some();
            let event = tokio::select! {
                line = lines.next_line(), if open => Event::Line(line),
                joined = wait_turn(&mut self.running) => Event::Finished(joined),
                _ = self.editor.route_installed(), if busy => Event::RouteInstalled,
            };

            match event {
                Event::Line(Ok(Some(line))) => self.handle_line(line),
                Event::Line(Ok(None)) => open = false,
                Event::Line(Err(error)) => {
                    return Err(CoreError::Internal(format!("failed to read input: {error}")));
                }
                Event::Finished(joined) => self.complete(joined),
                Event::RouteInstalled => self.flush_queued(),
            }
        }

        tracing::info!(session = %self.id, "session closed");
        Ok(())
    }
}

async fn wait_turn(running: &mut Option<JoinHandle<Turn>>) -> Result<Turn, JoinError> {
    match running.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
