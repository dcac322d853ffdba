use std::fmt;
use std::path::PathBuf;

use crate::auth::config_file::read_secrets;
use crate::error::AppError;

pub const CONFIG_FILE_NAME: &str = "config.ini";
const APP_DIR: &str = "meross-bridge";

/// Meross account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Where credentials may come from, highest priority first.
#[derive(Debug, Default)]
pub struct CredentialSources {
    pub email: Option<String>,
    pub password: Option<String>,
    pub config: Option<PathBuf>,
    pub default_paths: Vec<PathBuf>,
}

/// `config.ini` next to the executable, then in the user config directory.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.canonicalize().ok())
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join(CONFIG_FILE_NAME));
    }
    paths
}

/// Resolve credentials: explicit flags, then `--config`, then the first
/// default config file that exists.
pub fn load_credentials(sources: &CredentialSources) -> Result<Credentials, AppError> {
    let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    if let (Some(email), Some(password)) = (non_empty(&sources.email), non_empty(&sources.password))
    {
        tracing::debug!("using credentials from command line");
        return Ok(Credentials::new(email, password));
    }

    if let Some(ref path) = sources.config {
        tracing::debug!(path = %path.display(), "reading credentials from config file");
        return read_secrets(path);
    }

    if let Some(path) = sources.default_paths.iter().find(|p| p.is_file()) {
        tracing::debug!(path = %path.display(), "reading credentials from default config file");
        return read_secrets(path);
    }

    Err(AppError::MissingCredentials)
}
