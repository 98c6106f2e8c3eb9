use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use log::info;
use thiserror::Error;

/// Persona shipped inside the binary, used when no `PERSONA_PATH` is given.
pub const DEFAULT_PERSONA: &str = include_str!("../../persona/default.txt");

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Failed to read persona file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Persona file '{0}' is empty")]
    Empty(PathBuf),
}

/// The system prompt prepended to every upstream call.
///
/// Loaded once at startup and shared read-only between requests; there is no
/// reload path.
#[derive(Debug, Clone)]
pub struct Persona {
    prompt: Arc<str>,
}

impl Persona {
    pub fn new(prompt: impl Into<Arc<str>>) -> Self {
        Self { prompt: prompt.into() }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_PERSONA)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PersonaError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PersonaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Err(PersonaError::Empty(path.to_path_buf()));
        }
        Ok(Self::new(text))
    }

    /// Resolves the persona for this process: the file at `path` when set,
    /// the built-in text otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, PersonaError> {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => {
                let persona = Self::from_file(p)?;
                info!("Persona loaded from {} ({} bytes)", p, persona.prompt.len());
                Ok(persona)
            }
            None => {
                info!("Using built-in persona ({} bytes)", DEFAULT_PERSONA.len());
                Ok(Self::builtin())
            }
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}
