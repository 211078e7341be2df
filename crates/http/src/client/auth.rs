//! Authentication API client methods

use super::{ClientError, KuteeraClient};
use crate::types::{LoginRequest, LoginResponse, RefreshResponse};
use kuteera_core::{Identity, keys};
use reqwest::{Method, StatusCode, header};
use tracing::{debug, info};

impl KuteeraClient {
    /// Fetch the identity behind the stored access token
    pub async fn me(&self) -> Result<Identity, ClientError> {
        let request = self.backend(Method::GET, "/auth/me");
        self.execute(request).await
    }

    /// Fetch the identity behind a forwarded `Cookie` header.
    ///
    /// The stored bearer token is not attached. Any non-200 answer means the
    /// cookie carries no session and yields `None`.
    pub async fn me_with_cookie(&self, cookie: &str) -> Result<Option<Identity>, ClientError> {
        let response = self
            .client
            .get(self.backend_url("/auth/me"))
            .header(header::COOKIE, cookie)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "Forwarded cookie is not authenticated");
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Exchange the stored refresh token for a new access token and persist it
    pub async fn refresh_access_token(&self) -> Result<String, ClientError> {
        let refresh = self
            .refresh_token()
            .ok_or_else(|| ClientError::AuthenticationFailed("no refresh token".into()))?;

        let response = self
            .client
            .post(self.backend_url("/auth/refresh"))
            .bearer_auth(refresh)
            .send()
            .await?;

        let RefreshResponse { access_token } = Self::decode(response).await?;
        self.store.set(keys::ACCESS_TOKEN, &access_token)?;
        info!("Access token refreshed");
        Ok(access_token)
    }

    /// Invalidate the server-side session. The response body is ignored.
    pub async fn logout_remote(&self) -> Result<(), ClientError> {
        let request = self.backend(Method::POST, "/auth/logout");
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }

    /// Log in with a phone number, and an admin password for admin accounts.
    ///
    /// Tokens returned by the backend are persisted to the store.
    pub async fn login(
        &self,
        phone: impl Into<String>,
        admin_password: Option<String>,
    ) -> Result<LoginResponse, ClientError> {
        // Public endpoint: a 401 here is a bad password, not an expired session
        let response = self
            .client
            .post(self.backend_url("/api/login"))
            .json(&LoginRequest {
                phone: phone.into(),
                admin_password,
            })
            .send()
            .await?;
        let response: LoginResponse = Self::decode(response).await?;

        if let Some(access) = &response.access_token {
            self.store.set(keys::ACCESS_TOKEN, access)?;
        }
        if let Some(refresh) = &response.refresh_token {
            self.store.set(keys::REFRESH_TOKEN, refresh)?;
        }
        info!(is_admin = response.is_admin, "Logged in");
        Ok(response)
    }
}
