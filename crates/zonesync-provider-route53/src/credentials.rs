//! Credential resolution
//!
//! Turns an account's [`CredentialKind`] into a static key pair. Sources that
//! need a token exchange (STS, instance metadata) are not resolved here and
//! are rejected with [`Error::UnsupportedCredentials`].

use std::path::{Path, PathBuf};

use zonesync_core::model::CredentialKind;
use zonesync_core::{Error, Result};

const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const ENV_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// A resolved key pair
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    /// ⚠️ NEVER log this value
    secret_access_key: String,
    /// ⚠️ NEVER log this value
    session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    fn ensure_complete(self, source: &str) -> Result<Self> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(Error::config(format!(
                "Incomplete credentials from {}: key id and secret are required",
                source
            )));
        }
        Ok(self)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve credentials for one account
pub fn resolve(kind: &CredentialKind) -> Result<Credentials> {
    match kind {
        CredentialKind::AccessKey {
            access_key_id,
            secret_access_key,
            session_token,
        } => Credentials::new(
            access_key_id.clone(),
            secret_access_key.clone(),
            session_token.clone(),
        )
        .ensure_complete("access key descriptor"),
        CredentialKind::Env => from_env(|name| std::env::var(name).ok()),
        CredentialKind::Profile { name } => {
            let path = shared_credentials_path()?;
            from_profile_file(&path, name)
        }
        other => Err(Error::unsupported_credentials(other.type_name())),
    }
}

/// Read the standard `AWS_*` variables through `lookup`
pub fn from_env<F>(lookup: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let access_key_id = lookup(ENV_ACCESS_KEY_ID).unwrap_or_default();
    let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY).unwrap_or_default();
    Credentials::new(access_key_id, secret_access_key, lookup(ENV_SESSION_TOKEN))
        .ensure_complete("environment")
}

fn shared_credentials_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_SHARED_CREDENTIALS_FILE) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = std::env::var("HOME")
        .map_err(|_| Error::config("HOME is not set; cannot locate ~/.aws/credentials"))?;
    Ok(Path::new(&home).join(".aws").join("credentials"))
}

/// Load one profile from a shared credentials file
pub fn from_profile_file(path: &Path, profile: &str) -> Result<Credentials> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_profile(&content, profile)?.ensure_complete(&format!("profile '{}'", profile))
}

/// Parse the INI layout of `~/.aws/credentials`
fn parse_profile(content: &str, profile: &str) -> Result<Credentials> {
    let mut in_section = false;
    let mut found = false;
    let mut access_key_id = String::new();
    let mut secret_access_key = String::new();
    let mut session_token = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = section.trim() == profile;
            found |= in_section;
            continue;
        }

        if !in_section {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim() {
                "aws_access_key_id" => access_key_id = value,
                "aws_secret_access_key" => secret_access_key = value,
                "aws_session_token" => session_token = Some(value),
                _ => {}
            }
        }
    }

    if !found {
        return Err(Error::config(format!(
            "Profile '{}' not found in credentials file",
            profile
        )));
    }

    Ok(Credentials::new(access_key_id, secret_access_key, session_token))
}
