use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::host::{ConfigProvider, Persona, PersonaStore, UserConfig};

pub const CONFIG_FILENAME: &str = "play.json";
pub const CONFIG_VERSION: &str = "1.0.0";
pub const DEFAULT_COMMAND_PREFIX: &str = "awi.";
pub const DEFAULT_PERSONA: &str = "awi";
pub const MIN_VERBOSITY: u8 = 1;
pub const MAX_VERBOSITY: u8 = 4;

/// Fields missing from a stored file take their `default_new` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    pub version: String,
    /// Token of the active persona.
    pub persona: String,
    /// Directory holding `<token>.json` persona files, relative to the
    /// config directory unless absolute.
    pub persona_dir: PathBuf,
    pub verbosity: u8,
    pub command_prefix: String,
    pub user: UserConfig,
    /// Prompts by kind; a persona's own prompts take precedence.
    pub prompts: BTreeMap<String, String>,
}

impl PlayConfig {
    pub fn default_new() -> Self {
        let mut prompts = BTreeMap::new();
        prompts.insert(
            "welcome".to_string(),
            "Hello, I am Awi. Type awi.help to see what I can do.".to_string(),
        );
        Self {
            version: CONFIG_VERSION.to_string(),
            persona: DEFAULT_PERSONA.to_string(),
            persona_dir: PathBuf::from("personas"),
            verbosity: MIN_VERBOSITY,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            user: UserConfig::default(),
            prompts,
        }
    }
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self::default_new()
    }
}

pub fn load_or_create_config(dir: &Path) -> CoreResult<PlayConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        CoreError::Internal(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = config_path(dir);
    if !path.exists() {
        let config = PlayConfig::default_new();
        write_config(&path, &config)?;
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path).map_err(|error| {
        CoreError::Internal(format!("failed to read config {}: {error}", path.display()))
    })?;
    let mut config: PlayConfig = serde_json::from_str(&data).map_err(|error| {
        CoreError::Internal(format!("failed to parse config {}: {error}", path.display()))
    })?;

    if config.version != CONFIG_VERSION {
        config = migrate_config(config)?;
        write_config(&path, &config)?;
    }

    Ok(config)
}

/// Brings a config written by another release up to [`CONFIG_VERSION`].
///
/// Within one major version the layout only ever gains fields, which
/// deserialize to their defaults, so migrating is a version bump. Other
/// majors are refused; the file has to be removed and recreated.
pub fn migrate_config(mut config: PlayConfig) -> CoreResult<PlayConfig> {
    let current = major_version(CONFIG_VERSION);
    let found = major_version(&config.version);
    if found.is_none() || found != current {
        return Err(CoreError::InvalidInput(format!(
            "unsupported config version '{}' (expected {}.x); remove {CONFIG_FILENAME} to recreate it",
            config.version,
            current.unwrap_or_default()
        )));
    }
    tracing::info!(from = %config.version, to = CONFIG_VERSION, "config migrated");
    config.version = CONFIG_VERSION.to_string();
    Ok(config)
}

fn major_version(version: &str) -> Option<u64> {
    version.trim().split('.').next()?.parse().ok()
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

fn write_config(path: &Path, config: &PlayConfig) -> CoreResult<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        CoreError::Internal(format!(
            "failed to serialize config {}: {error}",
            path.display()
        ))
    })?;
    std::fs::write(path, data).map_err(|error| {
        CoreError::Internal(format!("failed to write config {}: {error}", path.display()))
    })?;
    Ok(())
}

/// In-memory configuration, optionally persisted to `play.json` on change.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: RwLock<PlayConfig>,
    persona: RwLock<Persona>,
}

impl ConfigStore {
    /// Loads (or creates) the config file in `dir`.
    pub fn open(dir: &Path) -> CoreResult<Self> {
        let config = load_or_create_config(dir)?;
        Ok(Self::build(Some(config_path(dir)), config))
    }

    /// Config that is never written to disk.
    pub fn in_memory(config: PlayConfig) -> Self {
        Self::build(None, config)
    }

    fn build(path: Option<PathBuf>, config: PlayConfig) -> Self {
        let persona = Persona {
            token: config.persona.clone(),
            ..Persona::default()
        };
        Self {
            path,
            config: RwLock::new(config),
            persona: RwLock::new(persona),
        }
    }

    pub fn snapshot(&self) -> PlayConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Persona directory resolved against the config file location.
    pub fn persona_dir(&self) -> PathBuf {
        let dir = self.snapshot().persona_dir;
        match (&self.path, dir.is_absolute()) {
            (Some(path), false) => path
                .parent()
                .map(|parent| parent.join(&dir))
                .unwrap_or(dir),
            _ => dir,
        }
    }

    fn update(&self, change: impl FnOnce(&mut PlayConfig)) -> CoreResult<()> {
        let snapshot = {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut config);
            config.clone()
        };
        match &self.path {
            Some(path) => write_config(path, &snapshot),
            None => Ok(()),
        }
    }
}

impl ConfigProvider for ConfigStore {
    fn persona(&self) -> Persona {
        self.persona.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_persona(&self, persona: Persona) -> CoreResult<()> {
        let token = persona.token.clone();
        *self.persona.write().unwrap_or_else(PoisonError::into_inner) = persona;
        self.update(|config| config.persona = token)
    }

    fn prompt(&self, kind: &str) -> Option<String> {
        let persona_prompt = self
            .persona
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .prompts
            .get(kind)
            .cloned();
        persona_prompt.or_else(|| self.snapshot().prompts.get(kind).cloned())
    }

    fn user_config(&self) -> UserConfig {
        self.snapshot().user
    }

    fn verbosity(&self) -> u8 {
        self.snapshot().verbosity
    }

    fn set_verbosity(&self, level: u8) -> CoreResult<()> {
        if !(MIN_VERBOSITY..=MAX_VERBOSITY).contains(&level) {
            return Err(CoreError::InvalidInput(format!(
                "verbosity must be between {MIN_VERBOSITY} and {MAX_VERBOSITY}, got {level}"
            )));
        }
        self.update(|config| config.verbosity = level)
    }

    fn command_prefix(&self) -> String {
        self.snapshot().command_prefix
    }
}

/// Persona definitions stored as `<dir>/<token>.json`.
#[derive(Debug, Clone)]
pub struct FilePersonaStore {
    dir: PathBuf,
}

impl FilePersonaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn persona_path(&self, token: &str) -> CoreResult<PathBuf> {
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::InvalidInput(format!("invalid persona token: '{token}'")));
        }
        Ok(self.dir.join(format!("{token}.json")))
    }

    pub fn save(&self, persona: &Persona) -> CoreResult<()> {
        let path = self.persona_path(&persona.token)?;
        std::fs::create_dir_all(&self.dir).map_err(|error| {
            CoreError::Internal(format!(
                "failed to create persona directory {}: {error}",
                self.dir.display()
            ))
        })?;
        let data = serde_json::to_string_pretty(persona).map_err(|error| {
            CoreError::Internal(format!("failed to serialize persona {}: {error}", persona.token))
        })?;
        std::fs::write(&path, data).map_err(|error| {
            CoreError::Internal(format!("failed to write persona {}: {error}", path.display()))
        })
    }
}

#[async_trait::async_trait]
impl PersonaStore for FilePersonaStore {
    async fn load_persona(&self, token: &str) -> CoreResult<Persona> {
        let path = self.persona_path(token)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::NotFound(format!("persona '{token}'")));
            }
            Err(error) => {
                return Err(CoreError::Internal(format!(
                    "failed to read persona {}: {error}",
                    path.display()
                )));
            }
        };
        let mut persona: Persona = serde_json::from_str(&data).map_err(|error| {
            CoreError::Internal(format!("failed to parse persona {}: {error}", path.display()))
        })?;
        if persona.token.is_empty() {
            persona.token = token.to_string();
        }
        Ok(persona)
    }
}
