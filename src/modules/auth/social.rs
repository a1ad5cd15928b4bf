use super::lifecycle::RefreshStrategy;
use crate::constants::{social_refresh_url, user_agent};
use crate::error::{AppError, AppResult};
use crate::models::{AuthType, IdcCredentials, KiroToken, RefreshedToken};
use crate::modules::system::config::SettingsStore;
use crate::utils::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SocialRefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialRefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Refresh for tokens issued by the Kiro desktop auth service
/// (GitHub/Google sign-in).
pub struct SocialRefreshClient {
    client: reqwest::Client,
    settings: SettingsStore,
    endpoint: Option<String>,
}

impl SocialRefreshClient {
    pub fn new(client: reqwest::Client, settings: SettingsStore) -> Self {
        Self {
            client,
            settings,
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

#[async_trait]
impl RefreshStrategy for SocialRefreshClient {
    fn auth_type(&self) -> AuthType {
        AuthType::Social
    }

    async fn refresh(
        &self,
        token: &KiroToken,
        hashed_machine_id: &str,
        _credentials: Option<&IdcCredentials>,
    ) -> AppResult<RefreshedToken> {
        let url = self
            .endpoint
            .clone()
            .unwrap_or_else(|| social_refresh_url(token.region.as_deref()));

        let response = self
            .client
            .post(url)
            .header(
                reqwest::header::USER_AGENT,
                user_agent(&self.settings.kiro_version(), hashed_machine_id),
            )
            .json(&SocialRefreshRequest {
                refresh_token: &token.refresh_token,
            })
            .send()
            .await
            .map_err(|e| AppError::RefreshFailed(format!("refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = http::error_body(response).await;
            return Err(AppError::RefreshFailed(format!("HTTP {} - {}", status, body)));
        }

        let parsed: SocialRefreshResponse = response
            .json()
            .await
            .map_err(|e| AppError::RefreshFailed(format!("refresh response parsing failed: {}", e)))?;
        if parsed.access_token.trim().is_empty() {
            return Err(AppError::RefreshFailed(
                "refresh response carried no access token".to_string(),
            ));
        }
        RefreshedToken::expires_in(parsed.access_token, parsed.expires_in.unwrap_or(3600))
    }
}
