//! Line-oriented front end: reads operator lines from stdin.
//!
//! The config directory is `$COCOMMAND_PLAY_HOME`, or `./.cocommand-play`.
//! Set `RUST_LOG` for diagnostics on stderr.

use std::path::PathBuf;
use std::sync::Arc;

use cocommand_play::editor::{PrintStyle, Speaker};
use cocommand_play::host::UnavailableConversation;
use cocommand_play::{
    builtins, CommandRegistry, ConfigProvider, ConfigStore, CoreResult, Editor, FilePersonaStore,
    Host, PersonaStore, Session, StdTerminal,
};

const HOME_ENV: &str = "COCOMMAND_PLAY_HOME";
const DEFAULT_HOME: &str = ".cocommand-play";

#[tokio::main]
async fn main() -> CoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let home = std::env::var_os(HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME));
    let config = Arc::new(ConfigStore::open(&home)?);
    let personas = Arc::new(FilePersonaStore::new(config.persona_dir()));

    let token = config.persona().token;
    match personas.load_persona(&token).await {
        Ok(persona) => config.set_persona(persona)?,
        Err(error) => tracing::debug!(persona = %token, %error, "starting without persona file"),
    }

    let mut registry = CommandRegistry::new();
    builtins::register(&mut registry);
    let host = Arc::new(Host::new(
        registry,
        config.clone(),
        personas,
        Arc::new(UnavailableConversation),
    ));
    let editor = Arc::new(Editor::new(Arc::new(StdTerminal), config.verbosity()));

    if let Some(welcome) = config.prompt("welcome") {
        editor.print(welcome, PrintStyle::new(Speaker::Awi));
    }

    let mut session = Session::new(host, editor);
    session.run(tokio::io::BufReader::new(tokio::io::stdin())).await
}
