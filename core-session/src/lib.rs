//! # Core Session Module
//!
//! Session lifecycle, authentication, and authorization for the storefront core.
//!
//! ## Overview
//!
//! This crate owns everything between "the user typed their credentials" and
//! "an authenticated request left the process":
//!
//! - **SessionManager**: sign-in, sign-out, restore, registration, and the
//!   single-flight token refresh cycle
//! - **TokenStore**: persistence of tokens and the user snapshot in the
//!   host-provided key-value store
//! - **RequestAuthenticator**: an `HttpClient` decorator that attaches bearer
//!   tokens and transparently retries once after a refresh on 401
//! - **AuthorizationEvaluator**: role and permission checks against the
//!   in-memory session
//!
//! Tokens are never logged. Types holding credential material redact their
//! `Debug` output.

pub mod api;
pub mod authenticator;
pub mod authz;
pub mod error;
pub mod manager;
pub mod token_store;
pub mod types;

pub use api::AuthApi;
pub use authenticator::RequestAuthenticator;
pub use authz::AuthorizationEvaluator;
pub use error::{ApiError, Result};
pub use manager::SessionManager;
pub use token_store::TokenStore;
pub use types::{AuthTokens, Credentials, Permission, RegisterRequest, Role, Session, User, UserUpdate};
