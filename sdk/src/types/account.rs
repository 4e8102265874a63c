//! Account types for the Gavel SDK.
//!
//! Provides login and registration bodies and the session they yield.

use serde::{Deserialize, Serialize};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Maximum accepted length for first and last names.
pub const MAX_NAME_LEN: usize = 50;

/// Body of `POST /auth/login-user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Authenticated session returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Bearer token for REST calls and hub joins.
    pub token: String,
    /// Display name, when the backend returns one.
    pub display_name: Option<String>,
}

/// Login response body.
///
/// The backend answers either with the bare token or with an object that
/// carries it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum LoginResponse {
    Token(String),
    Profile {
        #[serde(alias = "accessToken")]
        token: String,
        #[serde(default, rename = "firstName")]
        first_name: Option<String>,
    },
}

impl LoginResponse {
    pub(crate) fn into_session(self) -> AuthSession {
        match self {
            Self::Token(token) => AuthSession {
                token,
                display_name: None,
            },
            Self::Profile { token, first_name } => AuthSession {
                token,
                display_name: first_name,
            },
        }
    }
}

/// Body of `POST /Auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Account email.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password repeated for confirmation.
    pub confirm_password: String,
}

impl RegisterRequest {
    /// Checks the request before it is sent.
    ///
    /// # Errors
    ///
    /// Returns the user-facing message for the first failed check.
    pub fn validate(&self) -> Result<(), String> {
        if self.password != self.confirm_password {
            return Err("Passwords do not match.".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            ));
        }
        for (label, value) in [("First name", &self.first_name), ("Last name", &self.last_name)] {
            if value.trim().is_empty() {
                return Err(format!("{} is required.", label));
            }
            if value.chars().count() > MAX_NAME_LEN {
                return Err(format!(
                    "{} must be at most {} characters.",
                    label, MAX_NAME_LEN
                ));
            }
        }
        if !self.email.contains('@') {
            return Err("Please enter a valid email.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_login_response_bare_token() {
        let response: LoginResponse = serde_json::from_str("\"abc.def\"").expect("deserialize");
        let session = response.into_session();
        assert_eq!(session.token, "abc.def");
        assert!(session.display_name.is_none());
    }

    #[test]
    fn test_login_response_profile() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"token":"t1","firstName":"Ana"}"#).expect("deserialize");
        let session = response.into_session();
        assert_eq!(session.token, "t1");
        assert_eq!(session.display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_register_valid() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_register_password_mismatch() {
        let mut req = request();
        req.confirm_password = "other".to_string();
        assert_eq!(req.validate(), Err("Passwords do not match.".to_string()));
    }

    #[test]
    fn test_register_short_password() {
        let mut req = request();
        req.password = "abc".to_string();
        req.confirm_password = "abc".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_long_name() {
        let mut req = request();
        req.first_name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_serialize_camel_case() {
        let json = serde_json::to_value(request()).expect("serialize");
        assert_eq!(json["firstName"], "John");
        assert_eq!(json["confirmPassword"], "secret1");
    }
}
