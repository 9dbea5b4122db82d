//! Database credentials and operator details
//!
//! Credentials are captured lazily through a [`CredentialPrompt`] the first
//! time a target needs them and are reused for the rest of the run.

use crate::error::{InstallerError, Result};

/// Socket used by a MAMP-style local development database
pub const LOCAL_SOCKET_PATH: &str = "/Applications/MAMP/tmp/mysql/mysql.sock";

/// Default MySQL port
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Connection details for the application database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Connect through the local development socket
    pub using_local_socket: bool,
}

/// Everything the operator is asked for in one prompt round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDetails {
    pub database: DatabaseCredentials,
    /// Login for the seeded admin account; sandboxes do not ask for it
    pub email: Option<String>,
}

/// Suggested answers shown by the prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialDefaults {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl CredentialDefaults {
    /// Defaults for a local homestead-style sandbox database
    pub fn sandbox() -> Self {
        Self {
            host: Some("127.0.0.1".to_string()),
            port: Some(DEFAULT_DB_PORT),
            user: Some("homestead".to_string()),
            password: Some("secret".to_string()),
        }
    }

    /// Defaults for a full application install
    pub fn application() -> Self {
        Self {
            port: Some(DEFAULT_DB_PORT),
            ..Self::default()
        }
    }
}

/// What a prompt round should ask for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRequest {
    pub defaults: CredentialDefaults,
    pub ask_email: bool,
}

/// Source of operator answers (interactive prompts, or fixed values in tests)
pub trait CredentialPrompt {
    fn ask(&mut self, request: &CredentialRequest) -> Result<OperatorDetails>;
}

/// Reject an empty answer for a required field
pub fn require_answer(field: &str, answer: String) -> Result<String> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Err(InstallerError::rejected(field));
    }
    Ok(trimmed.to_string())
}

/// Prompt-once store for operator details
pub struct CredentialStore<P: CredentialPrompt> {
    prompt: P,
    request: CredentialRequest,
    captured: Option<OperatorDetails>,
}

impl<P: CredentialPrompt> CredentialStore<P> {
    pub fn new(prompt: P, request: CredentialRequest) -> Self {
        Self {
            prompt,
            request,
            captured: None,
        }
    }

    /// Details captured so far, without prompting
    pub fn captured(&self) -> Option<&OperatorDetails> {
        self.captured.as_ref()
    }

    /// Return the captured details, prompting on first use only
    pub fn get(&mut self) -> Result<&OperatorDetails> {
        let details = match self.captured.take() {
            Some(details) => details,
            None => {
                tracing::debug!("capturing database credentials");
                self.prompt.ask(&self.request)?
            }
        };
        let details: &OperatorDetails = self.captured.insert(details);
        Ok(details)
    }

    pub fn into_prompt(self) -> P {
        self.prompt
    }
}

/// Prompt that always answers with fixed details; counts how often it is asked
#[derive(Debug, Clone)]
pub struct FixedPrompt {
    details: OperatorDetails,
    asked: usize,
}

impl FixedPrompt {
    pub fn new(details: OperatorDetails) -> Self {
        Self { details, asked: 0 }
    }

    pub fn times_asked(&self) -> usize {
        self.asked
    }
}

impl CredentialPrompt for FixedPrompt {
    fn ask(&mut self, request: &CredentialRequest) -> Result<OperatorDetails> {
        self.asked += 1;
        if request.ask_email && self.details.email.is_none() {
            return Err(InstallerError::rejected("valid email address"));
        }
        Ok(self.details.clone())
    }
}
