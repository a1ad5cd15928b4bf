use crate::error::{AppError, AppResult};
use crate::models::{AuthType, IdcCredentials, KiroToken, RefreshedToken};
use crate::modules::system::logger;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidity {
    Valid,
    Expired,
}

/// Evaluated against the clock on every call; nothing is cached.
pub fn token_validity(token: &KiroToken) -> TokenValidity {
    match token.expiry() {
        Some(expires_at) if expires_at > Utc::now() => TokenValidity::Valid,
        _ => TokenValidity::Expired,
    }
}

/// An `expiresAt` that cannot be parsed counts as expired.
pub fn is_expired(token: &KiroToken) -> bool {
    token_validity(token) == TokenValidity::Expired
}

pub fn detect_auth_type(token: &KiroToken) -> AuthType {
    token.auth_type()
}

/// Resolves the IdC client registration for a token's `clientIdHash`.
pub trait CredentialLookup: Send + Sync {
    fn idc_credentials(&self, client_id_hash: &str) -> AppResult<Option<IdcCredentials>>;
}

impl<F> CredentialLookup for F
where
    F: Fn(&str) -> AppResult<Option<IdcCredentials>> + Send + Sync,
{
    fn idc_credentials(&self, client_id_hash: &str) -> AppResult<Option<IdcCredentials>> {
        self(client_id_hash)
    }
}

/// One token-refresh protocol.
#[async_trait]
pub trait RefreshStrategy: Send + Sync {
    fn auth_type(&self) -> AuthType;

    fn needs_client_credentials(&self) -> bool {
        false
    }

    /// Must not touch local state: persisting the result is the caller's job.
    async fn refresh(
        &self,
        token: &KiroToken,
        hashed_machine_id: &str,
        credentials: Option<&IdcCredentials>,
    ) -> AppResult<RefreshedToken>;
}

#[derive(Default)]
pub struct TokenLifecycleManager {
    strategies: HashMap<AuthType, Arc<dyn RefreshStrategy>>,
}

impl TokenLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any strategy already registered for the same auth type.
    pub fn register(&mut self, strategy: Arc<dyn RefreshStrategy>) {
        self.strategies.insert(strategy.auth_type(), strategy);
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn RefreshStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub async fn refresh(
        &self,
        token: &KiroToken,
        hashed_machine_id: &str,
        lookup: &dyn CredentialLookup,
    ) -> AppResult<RefreshedToken> {
        let auth_type = detect_auth_type(token);
        let strategy = self.strategies.get(&auth_type).ok_or_else(|| {
            AppError::RefreshFailed(format!("no refresh strategy for {} tokens", auth_type))
        })?;

        if token.refresh_token.trim().is_empty() {
            return Err(AppError::RefreshFailed(
                "stored token has no refresh token".to_string(),
            ));
        }

        let credentials = if strategy.needs_client_credentials() {
            let hash = token.client_id_hash.trim();
            match lookup.idc_credentials(hash) {
                Ok(Some(creds)) => Some(creds),
                Ok(None) => return Err(AppError::CredentialMissing(hash.to_string())),
                Err(e) => {
                    return Err(AppError::CredentialMissing(format!("{}: {}", hash, e)));
                }
            }
        } else {
            None
        };

        tracing::info!("Refreshing expired {} token", auth_type);
        match strategy
            .refresh(token, hashed_machine_id, credentials.as_ref())
            .await
        {
            Ok(refreshed) => {
                logger::log_info(&format!(
                    "Token refresh succeeded, new expiry {}",
                    refreshed.expires_at_string()
                ));
                Ok(refreshed)
            }
            Err(e @ AppError::RefreshFailed(_)) => Err(e),
            Err(e) => Err(AppError::RefreshFailed(e.to_string())),
        }
    }
}
