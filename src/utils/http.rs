use crate::error::{AppError, AppResult};
use reqwest::Client;
use std::time::Duration;

#[cfg(not(any(feature = "tls-native", feature = "tls-rustls")))]
compile_error!("one TLS backend feature must be enabled: `tls-native` or `tls-rustls`");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsBackendSelection {
    NativeTls,
    Rustls,
}

fn parse_tls_backend_override(raw: Option<&str>) -> Option<TlsBackendSelection> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "native" | "native-tls" | "default-tls" => Some(TlsBackendSelection::NativeTls),
        "rustls" => Some(TlsBackendSelection::Rustls),
        _ => None,
    }
}

fn supports_tls_backend(selection: TlsBackendSelection) -> bool {
    match selection {
        TlsBackendSelection::NativeTls => cfg!(feature = "tls-native"),
        TlsBackendSelection::Rustls => cfg!(feature = "tls-rustls"),
    }
}

fn compiled_default_tls_backend() -> TlsBackendSelection {
    if cfg!(feature = "tls-rustls") {
        TlsBackendSelection::Rustls
    } else {
        TlsBackendSelection::NativeTls
    }
}

fn selected_tls_backend() -> TlsBackendSelection {
    let raw = std::env::var("TLS_BACKEND").ok();
    if let Some(requested) = parse_tls_backend_override(raw.as_deref()) {
        if supports_tls_backend(requested) {
            return requested;
        }
        tracing::warn!(
            "TLS_BACKEND requested an unavailable backend for this build; falling back to compiled default"
        );
    }
    compiled_default_tls_backend()
}

fn apply_tls_backend(builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
    match selected_tls_backend() {
        TlsBackendSelection::NativeTls => {
            #[cfg(feature = "tls-native")]
            let builder = builder.use_native_tls();
            builder
        }
        TlsBackendSelection::Rustls => {
            #[cfg(feature = "tls-rustls")]
            let builder = builder.use_rustls_tls();
            builder
        }
    }
}

/// Client for the remote Kiro/AWS endpoints. The whole request, body
/// included, must complete within `timeout`.
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    apply_tls_backend(Client::builder())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .map_err(AppError::Network)
}

/// Best-effort body text for error messages, bounded so a misbehaving
/// endpoint cannot flood the log.
pub async fn error_body(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    text.chars().take(500).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_override_parsing() {
        assert_eq!(
            parse_tls_backend_override(Some(" RustLS ")),
            Some(TlsBackendSelection::Rustls)
        );
        assert_eq!(
            parse_tls_backend_override(Some("native-tls")),
            Some(TlsBackendSelection::NativeTls)
        );
        assert_eq!(parse_tls_backend_override(Some("openssl3")), None);
        assert_eq!(parse_tls_backend_override(None), None);
    }

    #[test]
    fn compiled_default_is_supported() {
        assert!(supports_tls_backend(compiled_default_tls_backend()));
    }

    #[test]
    fn client_builds_with_timeout() {
        assert!(build_client(Duration::from_secs(3)).is_ok());
    }
}
