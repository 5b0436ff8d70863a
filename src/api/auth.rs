use crate::api::refresh::{RefreshFailed, RefreshOutcome};
use crate::api::schemas::auth::{Login, Refresh};
use crate::api::{API_KEY_HEADER, ApiClient, ClientInner, LOGIN_ENDPOINT, REFRESH_ENDPOINT};
use crate::domain::session::{Session, TokenRefresh};
use crate::error::{ApiError, Result, extract_message};
use serde_json::Value;

impl ApiClient {
    /// Exchanges credentials for a session and persists it.
    ///
    /// # Errors
    /// - `Http` with the backend's message when the credentials are rejected.
    /// - `InvalidResponse` when the body is not a valid login carrying `data.token`.
    #[tracing::instrument(skip(self, password), err(level = "warn"))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let inner = &self.inner;
        let response = inner
            .http
            .post(inner.url(LOGIN_ENDPOINT)?)
            .header(API_KEY_HEADER, &inner.config.api_key)
            .json(&Login { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| extract_message(&v))
                .unwrap_or_else(|| "Unknown server error".to_string());
            return Err(ApiError::Http { status: status.as_u16(), message });
        }

        let session = serde_json::from_slice::<Session>(&body)
            .ok()
            .filter(Session::is_valid_login)
            .ok_or_else(|| ApiError::InvalidResponse("login response did not include data.token".into()))?;

        inner.store.set(&session).await?;
        inner.metrics.login_total.add(1, &[]);
        tracing::info!(user_id = ?session.user_id(), "Logged in");

        Ok(session)
    }

    /// Ends the session: clears it from the store and fires the login redirect.
    pub async fn logout(&self) {
        tracing::info!("Logging out");
        self.inner.end_session().await;
    }
}

impl ClientInner {
    /// Runs the refresh protocol once. Any failure ends the session; the
    /// refresh is never retried.
    pub(super) async fn refresh_session(&self) -> RefreshOutcome {
        match self.exchange_token().await {
            Ok(token) => {
                self.metrics.refresh_total.add(1, &[]);
                tracing::info!("Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                self.metrics.refresh_failures_total.add(1, &[]);
                tracing::error!(error = %e, "Token refresh failed, ending session");
                self.end_session().await;
                Err(RefreshFailed(e.to_string()))
            }
        }
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn exchange_token(&self) -> Result<String> {
        let current = self.current_token().await?.ok_or(ApiError::SessionMissing)?;

        let response = self
            .http
            .post(self.url(REFRESH_ENDPOINT)?)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&Refresh { token: &current })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &body));
        }

        let refresh: TokenRefresh = serde_json::from_slice(&body)?;
        if refresh.token.is_empty() {
            return Err(ApiError::InvalidResponse("refresh response did not include a token".into()));
        }

        // Only token and expiry change; the rest of the session is kept as stored.
        let mut session = self
            .store
            .get()
            .await?
            .ok_or_else(|| ApiError::InvalidResponse("session disappeared during refresh".into()))?;
        session.apply_refresh(refresh);
        self.store.set(&session).await?;

        Ok(session.data.token)
    }
}
