//! Credential Loading
//!
//! tastytrade login credentials, from environment variables or a CSV file
//! with `email,username,password` headers.

use std::path::Path;

use serde::Deserialize;

use super::settings::ConfigError;

/// tastytrade login credentials.
///
/// Either a password or a remember-token accompanies the login. Both are
/// secrets; `Debug` redacts them.
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: Option<String>,
    remember_token: Option<String>,
}

impl Credentials {
    /// Login and password credentials.
    #[must_use]
    pub const fn with_password(login: String, password: String) -> Self {
        Self {
            login,
            password: Some(password),
            remember_token: None,
        }
    }

    /// Login and remember-token credentials.
    #[must_use]
    pub const fn with_remember_token(login: String, remember_token: String) -> Self {
        Self {
            login,
            password: None,
            remember_token: Some(remember_token),
        }
    }

    /// Resolve credentials from the environment.
    ///
    /// `TASTY_LOGIN` plus `TASTY_PASSWORD` or `TASTY_REMEMBER_TOKEN` takes
    /// precedence; otherwise `TASTY_CREDENTIALS_FILE` points at a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error when neither source yields a usable login and
    /// secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(login) = std::env::var("TASTY_LOGIN") {
            if login.is_empty() {
                return Err(ConfigError::EmptyValue("TASTY_LOGIN".to_string()));
            }
            let password = std::env::var("TASTY_PASSWORD")
                .ok()
                .filter(|v| !v.is_empty());
            let remember_token = std::env::var("TASTY_REMEMBER_TOKEN")
                .ok()
                .filter(|v| !v.is_empty());
            if password.is_none() && remember_token.is_none() {
                return Err(ConfigError::MissingEnvVar(
                    "TASTY_PASSWORD or TASTY_REMEMBER_TOKEN".to_string(),
                ));
            }
            return Ok(Self {
                login,
                password,
                remember_token,
            });
        }

        if let Ok(path) = std::env::var("TASTY_CREDENTIALS_FILE") {
            return Self::from_csv_file(Path::new(&path));
        }

        Err(ConfigError::MissingEnvVar(
            "TASTY_LOGIN or TASTY_CREDENTIALS_FILE".to_string(),
        ))
    }

    /// Load the first data row of a `email,username,password` CSV file.
    ///
    /// The username column is preferred as the login; the email column is
    /// the fallback.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or the first row lacks
    /// a login or password.
    pub fn from_csv_file(path: &Path) -> Result<Self, ConfigError> {
        let mut reader = csv::Reader::from_path(path)?;
        let Some(row) = reader.deserialize::<CredentialRecord>().next() else {
            return Err(invalid_file(path, "no data rows"));
        };
        let row = row?;

        let login = if row.username.is_empty() {
            row.email
        } else {
            row.username
        };
        if login.is_empty() {
            return Err(invalid_file(path, "no username or email in first row"));
        }
        if row.password.is_empty() {
            return Err(invalid_file(path, "no password in first row"));
        }

        Ok(Self::with_password(login, row.password))
    }

    /// Get the login (username or email).
    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Get the password, when present.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Get the remember-token, when present.
    #[must_use]
    pub fn remember_token(&self) -> Option<&str> {
        self.remember_token.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "remember_token",
                &self.remember_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// First-row shape of the credentials CSV.
#[derive(Debug, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

fn invalid_file(path: &Path, reason: &str) -> ConfigError {
    ConfigError::InvalidCredentialsFile(path.display().to_string(), reason.to_string())
}
