use super::lifecycle::RefreshStrategy;
use crate::constants::{idc_token_url, user_agent};
use crate::error::{AppError, AppResult};
use crate::models::{AuthType, IdcCredentials, KiroToken, RefreshedToken};
use crate::modules::system::config::SettingsStore;
use crate::utils::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct OidcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn describe_oidc_error(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: OidcErrorBody = serde_json::from_str(body).unwrap_or_default();
    match (parsed.error, parsed.error_description) {
        (Some(code), Some(desc)) => format!("HTTP {} - {}: {}", status, code, desc),
        (Some(code), None) => format!("HTTP {} - {}", status, code),
        (None, Some(desc)) => format!("HTTP {} - {}", status, desc),
        (None, None) => format!("HTTP {} - {}", status, body),
    }
}

/// Refresh through the AWS SSO OIDC token endpoint (IAM Identity Center).
pub struct IdcRefreshClient {
    client: reqwest::Client,
    settings: SettingsStore,
    endpoint: Option<String>,
}

impl IdcRefreshClient {
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
impl RefreshStrategy for IdcRefreshClient {
    fn auth_type(&self) -> AuthType {
        AuthType::IdC
    }

    fn needs_client_credentials(&self) -> bool {
        true
    }

    async fn refresh(
        &self,
        token: &KiroToken,
        hashed_machine_id: &str,
        credentials: Option<&IdcCredentials>,
    ) -> AppResult<RefreshedToken> {
        let creds = credentials
            .ok_or_else(|| AppError::CredentialMissing(token.client_id_hash.clone()))?;
        let url = self
            .endpoint
            .clone()
            .unwrap_or_else(|| idc_token_url(token.region.as_deref()));

        let response = self
            .client
            .post(url)
            .header(
                reqwest::header::USER_AGENT,
                user_agent(&self.settings.kiro_version(), hashed_machine_id),
            )
            .json(&CreateTokenRequest {
                client_id: &creds.client_id,
                client_secret: &creds.client_secret,
                grant_type: "refresh_token",
                refresh_token: &token.refresh_token,
            })
            .send()
            .await
            .map_err(|e| AppError::RefreshFailed(format!("IdC token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = http::error_body(response).await;
            return Err(AppError::RefreshFailed(describe_oidc_error(status, &body)));
        }

        let parsed: CreateTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::RefreshFailed(format!("IdC response parsing failed: {}", e)))?;
        RefreshedToken::expires_in(parsed.access_token, parsed.expires_in.unwrap_or(3600))
    }
}
