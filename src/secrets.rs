//! Bearer credential sources. The transport asks a `TokenSource` once, before
//! any request is made, so a missing credential fails fast.

use crate::error::{EtlError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SECRETS_PATH: &str = "../../secrets.toml";
pub const TOKEN_ENV_VAR: &str = "TETL_BEARER_TOKEN";
const TOKEN_KEY: &str = "BEARER_TOKEN";

pub trait TokenSource {
    fn bearer_token(&self) -> Result<String>;
}

/// TOML secrets file. The token is read from `[twitter] BEARER_TOKEN`, or from a
/// top-level `BEARER_TOKEN` when the file has no `[twitter]` table.
#[derive(Clone, Debug)]
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for SecretsFile {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_PATH)
    }
}

impl TokenSource for SecretsFile {
    fn bearer_token(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(EtlError::config(format!(
                "You need to save your bearer token in the file `{}`.",
                self.path.display()
            )));
        }
        let raw = fs::read_to_string(&self.path)?;
        let token = token_from_toml(&raw).map_err(|e| {
            EtlError::config(format!("Secrets file `{}` is not valid TOML: {}", self.path.display(), e))
        })?;
        token.ok_or_else(|| {
            EtlError::config(format!(
                "You need to include a {} key in your secrets file `{}`.",
                TOKEN_KEY,
                self.path.display()
            ))
        })
    }
}

/// Extract a non-empty token from TOML text. `Ok(None)` when the key is absent or blank.
pub fn token_from_toml(raw: &str) -> std::result::Result<Option<String>, toml::de::Error> {
    let table: toml::Table = toml::from_str(raw)?;
    let scope = match table.get("twitter").and_then(|v| v.as_table()) {
        Some(t) => t,
        None => &table,
    };
    Ok(scope
        .get(TOKEN_KEY)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Token from an environment variable (default `TETL_BEARER_TOKEN`).
#[derive(Clone, Debug)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

impl TokenSource for EnvToken {
    fn bearer_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(EtlError::config(format!("environment variable {} is not set", self.var))),
        }
    }
}

/// A token already in hand.
#[derive(Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        if self.0.trim().is_empty() {
            return Err(EtlError::config("bearer token is empty"));
        }
        Ok(self.0.clone())
    }
}

/// Try each source in order; the first token wins.
/// Reports the last source's error when none yields a token.
pub struct FirstOf(pub Vec<Box<dyn TokenSource>>);

impl TokenSource for FirstOf {
    fn bearer_token(&self) -> Result<String> {
        let mut last = EtlError::config("no credential source configured");
        for src in &self.0 {
            match src.bearer_token() {
                Ok(t) => return Ok(t),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}
