use crate::constants::{usage_limits_url, user_agent};
use crate::error::{AppError, AppResult};
use crate::models::{KiroToken, UsageReading};
use crate::modules::system::config::SettingsStore;
use crate::modules::system::logger;
use crate::utils::http;
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait UsageApi: Send + Sync {
    /// A reading with an empty `subscription_title` is returned as-is; the
    /// caller decides whether that counts as a failure.
    async fn fetch_usage(&self, token: &KiroToken, hashed_machine_id: &str)
        -> AppResult<UsageReading>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageLimitsResponse {
    subscription_info: Option<SubscriptionInfo>,
    #[serde(default)]
    usage_breakdown_list: Vec<UsageBreakdown>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionInfo {
    subscription_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageBreakdown {
    usage_limit_with_precision: Option<f64>,
    usage_limit: Option<f64>,
    current_usage_with_precision: Option<f64>,
    current_usage: Option<f64>,
    free_trial_info: Option<FreeTrialInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FreeTrialInfo {
    free_trial_status: Option<String>,
    usage_limit_with_precision: Option<f64>,
    usage_limit: Option<f64>,
    current_usage_with_precision: Option<f64>,
    current_usage: Option<f64>,
}

fn summarize_usage(response: UsageLimitsResponse) -> UsageReading {
    let mut usage_limit = 0.0;
    let mut current_usage = 0.0;

    for item in &response.usage_breakdown_list {
        usage_limit += item
            .usage_limit_with_precision
            .or(item.usage_limit)
            .unwrap_or(0.0);
        current_usage += item
            .current_usage_with_precision
            .or(item.current_usage)
            .unwrap_or(0.0);

        if let Some(trial) = &item.free_trial_info {
            let active = trial
                .free_trial_status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("ACTIVE"));
            if active {
                usage_limit += trial
                    .usage_limit_with_precision
                    .or(trial.usage_limit)
                    .unwrap_or(0.0);
                current_usage += trial
                    .current_usage_with_precision
                    .or(trial.current_usage)
                    .unwrap_or(0.0);
            }
        }
    }

    let usage_limit = usage_limit.max(0.0);
    let current_usage = current_usage.max(0.0);
    UsageReading {
        subscription_title: response
            .subscription_info
            .and_then(|s| s.subscription_title)
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        usage_limit,
        current_usage,
        balance: (usage_limit - current_usage).max(0.0),
    }
}

pub struct KiroUsageClient {
    client: reqwest::Client,
    settings: SettingsStore,
    endpoint: Option<String>,
}

impl KiroUsageClient {
    pub fn new(client: reqwest::Client, settings: SettingsStore) -> Self {
        Self {
            client,
            settings,
            endpoint: None,
        }
    }

    /// Fixed endpoint instead of the per-region default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn url(&self, token: &KiroToken) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| usage_limits_url(token.region.as_deref()))
    }
}

#[async_trait]
impl UsageApi for KiroUsageClient {
    async fn fetch_usage(
        &self,
        token: &KiroToken,
        hashed_machine_id: &str,
    ) -> AppResult<UsageReading> {
        let agent = user_agent(&self.settings.kiro_version(), hashed_machine_id);

        let mut query = vec![("origin", "AI_EDITOR"), ("resourceType", "AGENTIC_REQUEST")];
        if let Some(arn) = token.profile_arn.as_deref().filter(|a| !a.is_empty()) {
            query.push(("profileArn", arn));
        }

        let response = self
            .client
            .get(self.url(token))
            .query(&query)
            .bearer_auth(&token.access_token)
            .header(reqwest::header::USER_AGENT, agent.as_str())
            .header("x-amz-user-agent", agent.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ApiCallFailed(format!("usage request timed out: {}", e))
                } else {
                    AppError::ApiCallFailed(format!("usage request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = http::error_body(response).await;
            logger::log_warn(&format!("Usage API error: {} - {}", status, body));
            return Err(AppError::ApiCallFailed(format!("HTTP {} - {}", status, body)));
        }

        let parsed: UsageLimitsResponse = response
            .json()
            .await
            .map_err(|e| AppError::ApiCallFailed(format!("usage response parsing failed: {}", e)))?;
        tracing::debug!(
            "Usage API returned {} breakdown entries",
            parsed.usage_breakdown_list.len()
        );
        Ok(summarize_usage(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{spawn_router, unique_temp_dir};
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::time::Duration;

    fn sample_token() -> KiroToken {
        serde_json::from_value(serde_json::json!({
            "accessToken": "atk-123",
            "refreshToken": "rtk",
            "expiresAt": "2099-01-01T00:00:00.000Z",
            "profileArn": "arn:aws:codewhisperer:us-east-1:1:profile/P"
        }))
        .unwrap()
    }

    fn client(base: &str) -> KiroUsageClient {
        let settings = SettingsStore::new(&unique_temp_dir("kiro-switch-quota"));
        KiroUsageClient::new(http::build_client(Duration::from_secs(5)).unwrap(), settings)
            .with_endpoint(format!("{}/getUsageLimits", base))
    }

    #[test]
    fn summarize_adds_active_free_trial() {
        let response: UsageLimitsResponse = serde_json::from_value(serde_json::json!({
            "subscriptionInfo": {"subscriptionTitle": "KIRO FREE"},
            "usageBreakdownList": [{
                "usageLimitWithPrecision": 50.0,
                "currentUsageWithPrecision": 10.5,
                "freeTrialInfo": {
                    "freeTrialStatus": "ACTIVE",
                    "usageLimitWithPrecision": 500.0,
                    "currentUsageWithPrecision": 39.5
                }
            }]
        }))
        .unwrap();
        let reading = summarize_usage(response);
        assert_eq!(reading.subscription_title, "KIRO FREE");
        assert_eq!(reading.usage_limit, 550.0);
        assert_eq!(reading.current_usage, 50.0);
        assert_eq!(reading.balance, 500.0);
    }

    #[test]
    fn summarize_ignores_expired_trial_and_clamps_balance() {
        let response: UsageLimitsResponse = serde_json::from_value(serde_json::json!({
            "usageBreakdownList": [{
                "usageLimit": 10.0,
                "currentUsage": 12.0,
                "freeTrialInfo": {"freeTrialStatus": "EXPIRED", "usageLimit": 500.0}
            }]
        }))
        .unwrap();
        let reading = summarize_usage(response);
        assert_eq!(reading.subscription_title, "");
        assert_eq!(reading.usage_limit, 10.0);
        assert_eq!(reading.balance, 0.0);
    }

    #[tokio::test]
    async fn fetch_usage_sends_token_and_machine_hash() {
        async fn handler(
            headers: HeaderMap,
            Query(query): Query<HashMap<String, String>>,
        ) -> Result<Json<serde_json::Value>, StatusCode> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let agent = headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth != "Bearer atk-123" || !agent.ends_with("-hashed-id") {
                return Err(StatusCode::UNAUTHORIZED);
            }
            if query.get("origin").map(String::as_str) != Some("AI_EDITOR")
                || !query.contains_key("profileArn")
            {
                return Err(StatusCode::BAD_REQUEST);
            }
            Ok(Json(serde_json::json!({
                "subscriptionInfo": {"subscriptionTitle": "KIRO PRO"},
                "usageBreakdownList": [
                    {"usageLimitWithPrecision": 100.0, "currentUsageWithPrecision": 85.0}
                ]
            })))
        }

        let base = spawn_router(Router::new().route("/getUsageLimits", get(handler))).await;
        let reading = client(&base)
            .fetch_usage(&sample_token(), "hashed-id")
            .await
            .expect("fetch usage");
        assert_eq!(reading.subscription_title, "KIRO PRO");
        assert_eq!(reading.balance, 15.0);
    }

    #[tokio::test]
    async fn http_error_maps_to_api_call_failed() {
        let router = Router::new().route(
            "/getUsageLimits",
            get(|| async { (StatusCode::FORBIDDEN, "account suspended") }),
        );
        let base = spawn_router(router).await;
        let err = client(&base)
            .fetch_usage(&sample_token(), "hashed-id")
            .await
            .unwrap_err();
        match err {
            AppError::ApiCallFailed(msg) => assert!(msg.contains("account suspended")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
