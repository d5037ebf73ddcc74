use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dialoguer::{Password, theme::ColorfulTheme};
use serde::{Deserialize, Serialize};

use crate::palette::Palette;
use crate::utils::{get_data_dir, strip_controls_and_escapes, trim_line};

pub const API_KEY_ENV: &str = "BOOKMOOD_GEMINI_API_KEY";

const AUTH_FILE_NAME: &str = "auth.json";
const GEMINI_PROVIDER: &str = "gemini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Environment,
    AuthFile,
}

impl ApiKeySource {
    pub fn description(&self) -> &'static str {
        match self {
            ApiKeySource::Environment => "environment variable",
            ApiKeySource::AuthFile => "local auth file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AuthFile {
    #[serde(flatten)]
    providers: HashMap<String, ProviderAuth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProviderAuth {
    key: String,
}

#[cfg(test)]
const TEST_AUTH_PATH_ENV: &str = "BOOKMOOD_TEST_AUTH_PATH";

/// Look up the Gemini key: environment variable first, then the auth file.
/// Returns `None` when neither source has a non-empty key.
pub fn resolve_api_key() -> Result<Option<(String, ApiKeySource)>> {
    if let Ok(value) = env::var(API_KEY_ENV)
        && !value.trim().is_empty()
    {
        return Ok(Some((value, ApiKeySource::Environment)));
    }

    let auth_path = auth_file_path()?;
    let Some(auth) = read_auth_file(&auth_path)? else {
        return Ok(None);
    };

    let stored = auth
        .providers
        .get(GEMINI_PROVIDER)
        .map(|entry| entry.key.trim())
        .filter(|key| !key.is_empty())
        .map(str::to_string);

    Ok(stored.map(|key| (key, ApiKeySource::AuthFile)))
}

pub fn store_api_key(api_key: &str) -> Result<()> {
    let trimmed = trim_line(api_key).with_context(|| "Cannot store an empty API key")?;

    let auth_path = auth_file_path()?;
    let mut auth = read_auth_file(&auth_path)?.unwrap_or_default();

    auth.providers.insert(
        GEMINI_PROVIDER.to_string(),
        ProviderAuth {
            key: trimmed.to_string(),
        },
    );

    write_auth_file(&auth_path, &auth)
}

pub fn clear_api_key() -> Result<bool> {
    let auth_path = auth_file_path()?;
    let Some(mut auth) = read_auth_file(&auth_path)? else {
        return Ok(false);
    };

    if auth.providers.remove(GEMINI_PROVIDER).is_none() {
        return Ok(false);
    }

    if auth.providers.is_empty() {
        fs::remove_file(&auth_path).with_context(|| {
            format!(
                "Failed to remove empty auth file at {}",
                auth_path.display()
            )
        })?;
        return Ok(true);
    }

    write_auth_file(&auth_path, &auth)?;
    Ok(true)
}

pub fn prompt_for_api_key() -> Result<String> {
    println!(
        "\n{} (https://aistudio.google.com/app/apikey) to fetch recommendations. It's stored locally for future runs.",
        Palette::paint(Palette::SUCCESS, "Enter your Gemini API key")
    );
    println!(
        "{}",
        Palette::dim("Leave the field blank to abort without storing anything.")
    );
    let raw_key = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API Key")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read the API key")?;

    Ok(strip_controls_and_escapes(&raw_key))
}

fn auth_file_path() -> Result<PathBuf> {
    #[cfg(test)]
    {
        if let Ok(path) = env::var(TEST_AUTH_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
    }

    let data_dir = get_data_dir()?;
    Ok(data_dir.join(AUTH_FILE_NAME))
}

fn read_auth_file(path: &Path) -> Result<Option<AuthFile>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(parse_auth_contents(&contents, path)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read auth file at {}", path.display()))
        }
    }
}

fn write_auth_file(path: &Path, value: &AuthFile) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("Failed to write auth file at {}", path.display()))?;
    Ok(())
}

fn parse_auth_contents(contents: &str, path: &Path) -> Result<Option<AuthFile>> {
    if contents.trim().is_empty() {
        return Ok(Some(AuthFile::default()));
    }

    let parsed: AuthFile = serde_json::from_str(contents)
        .with_context(|| format!("Failed to parse auth file at {}", path.display()))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_auth_contents_handles_empty() {
        let path = Path::new("auth.json");
        let parsed = parse_auth_contents("   \n", path).unwrap();
        let auth = parsed.expect("expected auth file for empty contents");
        assert!(auth.providers.is_empty());
    }

    #[test]
    fn auth_file_round_trip_keeps_the_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut auth = AuthFile::default();
        auth.providers.insert(
            GEMINI_PROVIDER.to_string(),
            ProviderAuth {
                key: "saved-key".to_string(),
            },
        );

        write_auth_file(&path, &auth).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with('\n'));

        let read_back = read_auth_file(&path).unwrap().expect("auth file exists");
        assert_eq!(
            read_back
                .providers
                .get(GEMINI_PROVIDER)
                .map(|entry| entry.key.as_str()),
            Some("saved-key")
        );
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        assert!(read_auth_file(&path).unwrap().is_none());
    }

    // Store, overwrite, resolve, and clear in one sequence: these all share
    // the test-path override, so they cannot run as separate parallel tests.
    #[test]
    fn store_resolve_and_clear_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");

        unsafe {
            env::remove_var(API_KEY_ENV);
            env::set_var(TEST_AUTH_PATH_ENV, &path);
        }

        assert!(resolve_api_key().unwrap().is_none());
        assert!(!clear_api_key().unwrap());

        store_api_key("first-key").unwrap();
        store_api_key("second-key").unwrap();

        let (key, source) = resolve_api_key().unwrap().expect("key was stored");
        assert_eq!(key, "second-key");
        assert_eq!(source, ApiKeySource::AuthFile);

        assert!(clear_api_key().unwrap());
        assert!(resolve_api_key().unwrap().is_none());
    }
}
