use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api_client::{extract_detail, ApiClient, RequestDescriptor};
use crate::error::ApiError;
use crate::guard::SIGN_IN_PATH;
use crate::session::CookieAttributes;

pub const SIGN_UP_ENDPOINT: &str = "/api/auth/signup";
pub const SIGN_IN_ENDPOINT: &str = "/api/auth/signin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// The backend follows the OAuth2 password form and calls the email `username`.
#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Sign-up, sign-in and sign-out on top of an [`ApiClient`].
///
/// A 401 from these endpoints means bad credentials, so unlike task calls it
/// does not trigger the sign-in redirect.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn sign_up(&self, data: &SignUpRequest) -> Result<AuthResponse, ApiError> {
        info!("Signing up {}", data.email);
        let descriptor = RequestDescriptor::post(SIGN_UP_ENDPOINT).json(data)?;
        self.authenticate(descriptor, "Failed to sign up").await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        info!("Signing in {email}");
        let descriptor = RequestDescriptor::post(SIGN_IN_ENDPOINT).json(&SignInRequest {
            username: email,
            password,
        })?;
        self.authenticate(descriptor, "Failed to sign in").await
    }

    pub fn sign_out(&self) -> Result<(), ApiError> {
        self.client.credentials().remove()?;
        info!("Signed out");
        self.client.navigator().navigate(SIGN_IN_PATH);
        Ok(())
    }

    async fn authenticate(
        &self,
        descriptor: RequestDescriptor,
        fallback: &str,
    ) -> Result<AuthResponse, ApiError> {
        let response = self.client.exchange(&descriptor, None).await?;

        if !response.is_success() {
            let status = response.status;
            let message = match serde_json::from_slice::<serde_json::Value>(&response.body) {
                Ok(_) => extract_detail(&response.body).unwrap_or_else(|| fallback.to_string()),
                Err(_) => format!("HTTP {status}"),
            };
            warn!("{} -> {status}: {message}", descriptor.path);
            return Err(ApiError::RequestFailed { status, message });
        }

        let auth: AuthResponse = serde_json::from_slice(&response.body)?;
        if !auth.access_token.is_empty() {
            let attributes = CookieAttributes::for_base_url(self.client.base_url());
            self.client
                .credentials()
                .set(&auth.access_token, attributes)
                .inspect_err(|err| warn!("Failed to store session cookie: {err}"))?;
        }
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_body_uses_username_field() {
        let body = serde_json::to_value(SignInRequest {
            username: "a@b.c",
            password: "pw",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"username": "a@b.c", "password": "pw"}));
    }

    #[test]
    fn auth_response_accepts_missing_optionals() {
        let auth: AuthResponse = serde_json::from_str(r#"{"access_token":"t"}"#).unwrap();
        assert_eq!(auth.token_type, "Bearer");
        assert_eq!(auth.user, None);
    }
}
