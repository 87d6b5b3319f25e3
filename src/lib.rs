//! Terminal client for a remote task backend.
//!
//! Users sign up or sign in, then list, create, edit, toggle and delete their
//! tasks. The session credential lives in a single `auth_token` cookie that
//! the [`api_client::ApiClient`] attaches as a bearer token and the
//! [`guard::RouteGuard`] checks before any screen is shown.

pub mod api_client;
pub mod app;
pub mod auth_api;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod task;
pub mod task_list;
pub mod ui;
pub mod validation;

pub use api_client::{ApiClient, HttpTransport, Navigator, RequestDescriptor};
pub use auth_api::AuthApi;
pub use error::{ApiError, TransportError, ValidationError};
pub use guard::{guard, GuardDecision, RouteGuard};
pub use session::{CredentialStore, FileCookieStore, MemoryCookieStore};
pub use task::Task;
