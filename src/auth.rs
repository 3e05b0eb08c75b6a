// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Authentication for the X API.
//!
//! freescout uses app-only authentication: every request carries the
//! bearer token generated for your app in the X developer portal. Store it
//! in the `$X_BEARER_TOKEN` environment variable.

use std::{env, error, fmt};

/// Name of the environment variable holding the bearer token.
pub const BEARER_TOKEN_VAR: &str = "X_BEARER_TOKEN";

/// Manages the bearer token used to authenticate API requests.
pub struct Auth {
    bearer_token: String,
}

impl Auth {
    /// Creates a new `Auth` structure using the given bearer token.
    pub fn new(bearer_token: impl Into<String>) -> Self {
        let bearer_token = bearer_token.into();
        Self { bearer_token }
    }

    /// Retrieves a bearer token from the environment.
    ///
    /// Returns an error if the variable is unset, is not valid Unicode, or
    /// only contains whitespace.
    pub fn from_env(envvar: impl Into<String>) -> AuthResult {
        let envvar = envvar.into();
        let bearer_token = env::var(&envvar).map_err(AuthError::EnvError)?;
        let bearer_token = bearer_token.trim();
        if bearer_token.is_empty() {
            Err(AuthError::Empty(envvar))
        } else {
            Ok(Self::new(bearer_token))
        }
    }

    /// The actual bearer token.
    ///
    /// # Examples
    ///
    /// ```
    /// use freescout::auth::Auth;
    /// let auth = Auth::new("ThisIsMyBearerToken");
    /// assert_eq!(auth.bearer_token(), "ThisIsMyBearerToken");
    /// ```
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Auth {{ bearer_token: <redacted> }}")
    }
}

/// Standard result type for [`Auth`] creation.
pub type AuthResult = Result<Auth, AuthError>;

/// Indicates an error when loading a bearer token.
#[derive(Debug)]
pub enum AuthError {
    /// An error occurred while retrieving a token from the environment.
    EnvError(env::VarError),

    /// The named variable is set but blank.
    Empty(String),
}

impl From<env::VarError> for AuthError {
    fn from(error: env::VarError) -> Self {
        AuthError::EnvError(error)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::EnvError(err) => write!(f, "Environment error: {err}"),
            AuthError::Empty(envvar) => write!(f, "${envvar} is empty"),
        }
    }
}

impl error::Error for AuthError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            AuthError::EnvError(err) => Some(err),
            AuthError::Empty(_) => None,
        }
    }
}
