use std::fmt;

use thiserror::Error;

/// Form field value sent when the user asks to stay signed in
const REMEMBER_SCOPE: &str = "remember";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username is required")]
    MissingUsername,

    #[error("Password is required")]
    MissingPassword,
}

/// Login form input. Never persisted.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub remember: bool,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember: false,
        }
    }

    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Required-field checks the login form applies before submitting
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        Ok(())
    }

    /// Fields for the form-urlencoded login body
    pub(crate) fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];
        if self.remember {
            fields.push(("scope", REMEMBER_SCOPE));
        }
        fields
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}
