use crate::constants::CREDENTIAL_FILE_NAME;
use crate::error::{Result, ShrinkError};
use dialoguer::Password;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Where the active API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `-k/--key`; used for this run only.
    Flag,
    File,
    Prompt,
}

#[derive(Debug, Clone)]
pub struct Credential {
    key: String,
    source: CredentialSource,
}

impl Credential {
    pub fn new(key: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

/// The on-disk key cache, a single line readable only by its owner.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.tinypng`
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or(ShrinkError::NoHomeDirectory)?;
        Ok(Self::new(home.join(CREDENTIAL_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached key. A missing or blank file yields `Ok(None)`.
    pub fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let key = contents.trim();
                if key.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(key.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `key` to the cache, creating or overwriting it with mode 0600.
    pub fn save(&self, key: &str) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(crate::constants::CREDENTIAL_FILE_MODE);
        }

        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten an existing file too.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(
                crate::constants::CREDENTIAL_FILE_MODE,
            ))?;
        }

        writeln!(file, "{}", key)?;
        Ok(())
    }

    /// Pick the key for this run: explicit value, then the cache, then
    /// `prompt`. A prompted key is persisted before it is returned.
    pub fn resolve<F>(&self, explicit: Option<String>, prompt: F) -> Result<Credential>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(key) = explicit {
            let key = key.trim();
            if key.is_empty() {
                return Err(ShrinkError::Credential("API key must not be empty".into()));
            }
            return Ok(Credential::new(key, CredentialSource::Flag));
        }

        match self.load() {
            Ok(Some(key)) => {
                crate::verbose!("Using API key from {:?}", self.path);
                return Ok(Credential::new(key, CredentialSource::File));
            }
            Ok(None) => {}
            Err(e) => {
                crate::warn!("Cannot read API key from {:?}: {}", self.path, e);
            }
        }

        let key = prompt()?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ShrinkError::Credential("no API key entered".into()));
        }

        self.save(key)?;
        crate::info!("🔑 API key saved to {:?}", self.path);
        Ok(Credential::new(key, CredentialSource::Prompt))
    }
}

/// Ask for the key on the terminal without echoing it.
pub fn prompt_for_key() -> Result<String> {
    Password::new()
        .with_prompt("TinyPNG API key")
        .interact()
        .map_err(|e| ShrinkError::Credential(format!("cannot prompt for API key: {}", e)))
}
