//! # Auth API
//!
//! Thin client for the auth and user endpoints of the store API.
//!
//! Each method issues one HTTP request, classifies non-2xx responses through
//! [`ApiError::from_response`], and deserializes the success body. Session
//! state changes never happen here; that is the
//! [`SessionManager`](crate::manager::SessionManager)'s job.

use crate::error::{ApiError, Result};
use crate::types::{AuthTokens, Credentials, LoginResponse, RegisterRequest, User, UserUpdate};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::logging::redact_if_sensitive;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Avatar assigned to accounts registered without one.
pub const DEFAULT_AVATAR_URL: &str = "https://api.lorem.space/image/face?w=150&h=150";

/// Role assigned to self-registered accounts.
const DEFAULT_REGISTER_ROLE: &str = "customer";

pub struct AuthApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl AuthApi {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Exchanges credentials for a token pair via `POST /auth/login`.
    ///
    /// A 401 here means the credentials are wrong, not that a session
    /// expired, and maps to [`ApiError::InvalidCredentials`].
    #[instrument(
        skip(self, credentials),
        fields(email = %redact_if_sensitive("email", &credentials.email))
    )]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthTokens> {
        let request = HttpRequest::new(HttpMethod::Post, format!("{}/auth/login", self.base_url))
            .json(credentials)?;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, true));
        }

        let body: LoginResponse = response.json()?;
        debug!("Login exchange succeeded");
        Ok(body.into())
    }

    /// Fetches the authenticated user's profile via `GET /auth/profile`.
    #[instrument(skip(self, access_token))]
    pub async fn profile(&self, access_token: &str) -> Result<User> {
        let request = HttpRequest::new(HttpMethod::Get, format!("{}/auth/profile", self.base_url))
            .bearer_token(access_token);

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, false));
        }

        Ok(response.json()?)
    }

    /// Exchanges a refresh token for a new token pair via
    /// `POST /auth/refresh-token`.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/auth/refresh-token", self.base_url),
        )
        .json(&json!({ "refreshToken": refresh_token }))?;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, false));
        }

        let body: LoginResponse = response.json()?;
        debug!("Token exchange succeeded");
        Ok(body.into())
    }

    /// Creates a new account via `POST /users`.
    ///
    /// The API requires a role and avatar on creation; self-registration
    /// always sends the customer role and fills in the default avatar when
    /// the caller didn't pick one.
    #[instrument(
        skip(self, request),
        fields(email = %redact_if_sensitive("email", &request.email))
    )]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let avatar = request
            .avatar
            .clone()
            .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string());

        let http_request = HttpRequest::new(HttpMethod::Post, format!("{}/users", self.base_url))
            .json(&json!({
                "name": request.name,
                "email": request.email,
                "password": request.password,
                "role": DEFAULT_REGISTER_ROLE,
                "avatar": avatar,
            }))?;

        let response = self.http.execute(http_request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, false));
        }

        Ok(response.json()?)
    }

    /// Updates an existing user via `PUT /users/{id}`.
    #[instrument(skip(self, update, access_token), fields(user_id = user_id))]
    pub async fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        access_token: &str,
    ) -> Result<User> {
        let request = HttpRequest::new(
            HttpMethod::Put,
            format!("{}/users/{}", self.base_url, user_id),
        )
        .bearer_token(access_token)
        .json(update)?;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, false));
        }

        Ok(response.json()?)
    }
}
