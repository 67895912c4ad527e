//! Capability handle passed into every command invocation.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use crate::editor::Editor;
use crate::host::Host;

/// Deepest allowed chain of nested invocations.
pub const MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthExceeded {
    pub depth: usize,
}

impl fmt::Display for DepthExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation depth {} exceeds limit {MAX_DEPTH}", self.depth)
    }
}

impl std::error::Error for DepthExceeded {}

pub fn check_depth(depth: usize) -> Result<(), DepthExceeded> {
    if depth > MAX_DEPTH {
        Err(DepthExceeded { depth })
    } else {
        Ok(())
    }
}

/// Last-resort guard against runaway self-dispatch: logs a trace and aborts
/// the process. Never returns when the limit is exceeded.
pub fn abort_on_runaway(depth: usize, token: &str) {
    if let Err(exceeded) = check_depth(depth) {
        let trace = Backtrace::force_capture();
        tracing::error!(token, depth, "{exceeded}\n{trace}");
        eprintln!("fatal: {exceeded} while dispatching '{token}'\n{trace}");
        std::process::abort();
    }
}

/// Editor, host collaborators and the position of this invocation in the
/// call chain. Cheap to clone; nested invocations get a copy with a higher
/// depth.
#[derive(Clone)]
pub struct Control {
    editor: Arc<Editor>,
    host: Arc<Host>,
    depth: usize,
    recursive: bool,
}

impl fmt::Debug for Control {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Control")
            .field("editor", &self.editor)
            .field("depth", &self.depth)
            .field("recursive", &self.recursive)
            .finish()
    }
}

impl Control {
    pub fn new(editor: Arc<Editor>, host: Arc<Host>) -> Self {
        Self {
            editor,
            host,
            depth: 0,
            recursive: false,
        }
    }

    pub fn editor(&self) -> &Arc<Editor> {
        &self.editor
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    /// Number of invocations currently on the chain, this one included.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True when the command was triggered programmatically (e.g. by a
    /// procedure step) rather than typed by the operator.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Control for the invocation one level down.
    pub fn enter(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    pub fn as_recursive(&self) -> Self {
        Self {
            recursive: true,
            ..self.clone()
        }
    }
}
