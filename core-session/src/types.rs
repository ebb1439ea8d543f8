use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a user account by the store API.
///
/// The API is free to introduce roles this client has never heard of, so
/// deserialization folds anything unrecognized into [`Role::Unknown`] instead
/// of failing the whole profile fetch.
///
/// # Examples
///
/// ```
/// use core_session::Role;
///
/// let role: Role = serde_json::from_str("\"customer\"").unwrap();
/// assert_eq!(role, Role::Customer);
///
/// let role: Role = serde_json::from_str("\"superuser\"").unwrap();
/// assert_eq!(role, Role::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Can create and modify catalog content
    Editor,
    /// Read-only access
    Viewer,
    /// Regular shopper account
    Customer,
    /// Any role string the client does not recognize
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Get the role identifier string as the API spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
            Role::Customer => "customer",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A capability granted by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
    ManageUsers,
}

/// An authenticated user profile as returned by `GET /auth/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Avatar URL; the API always sets one but older snapshots may lack it
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Sign-in credentials.
///
/// The `Debug` implementation redacts the password.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Payload for creating a new account via `POST /users`.
///
/// Role and avatar defaults are filled in by [`AuthApi`](crate::api::AuthApi)
/// before the request is sent.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

/// Partial update for an existing user via `PUT /users/{id}`.
///
/// Only the fields that are `Some` are serialized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Token pair issued by the auth endpoints.
///
/// # Security
///
/// Tokens should be stored via [`TokenStore`](crate::token_store::TokenStore)
/// and never logged. The `Debug` implementation redacts both values.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    /// The bearer token attached to API requests
    pub access_token: String,
    /// Used to obtain a new access token; not every response carries one
    pub refresh_token: Option<String>,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                if self.refresh_token.is_some() {
                    &"[REDACTED]"
                } else {
                    &"None"
                },
            )
            .finish()
    }
}

/// Wire format of `POST /auth/login` and `POST /auth/refresh-token` responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(rename = "access_token")]
    pub access_token: String,
    #[serde(rename = "refresh_token", default)]
    pub refresh_token: Option<String>,
}

impl From<LoginResponse> for AuthTokens {
    fn from(response: LoginResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        }
    }
}

/// In-memory session state.
///
/// Always consistent as a unit: either all fields are populated (signed in)
/// or all are `None` (signed out). Transitions happen only through
/// [`SessionManager`](crate::manager::SessionManager).
#[derive(Clone, Default)]
pub struct Session {
    pub current_user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// Returns `true` when a user is signed in with an access token.
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some() && self.access_token.is_some()
    }

    /// Resets every field to the signed-out state.
    pub fn clear(&mut self) {
        self.current_user = None;
        self.access_token = None;
        self.refresh_token = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("current_user", &self.current_user)
            .field(
                "access_token",
                if self.access_token.is_some() {
                    &"[REDACTED]"
                } else {
                    &"None"
                },
            )
            .field(
                "refresh_token",
                if self.refresh_token.is_some() {
                    &"[REDACTED]"
                } else {
                    &"None"
                },
            )
            .finish()
    }
}
