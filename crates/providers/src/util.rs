//! Helpers shared by the Gemini adapter and the notification relay:
//! transport error mapping, secret lookup, URL redaction.

use td_domain::config::AuthConfig;
use td_domain::error::{Error, Result};

/// Map a transport-level [`reqwest::Error`] onto the domain error.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve a secret from an [`AuthConfig`].
///
/// Tried in order: the inline `key`, the OS keychain entry
/// `service`/`account`, the `env` variable, and finally the variable
/// `SERVICE_ACCOUNT` (uppercased) for hosts without a keychain.
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(key) = &auth.key {
        tracing::warn!("secret read from plaintext config; use `env` or the keychain instead");
        return Ok(key.clone());
    }

    let keychain = auth.service.as_deref().zip(auth.account.as_deref());

    if let Some((service, account)) = keychain {
        match keychain_entry(service, account).and_then(|entry| {
            entry
                .get_password()
                .map_err(|e| Error::Auth(format!("keychain {service}/{account}: {e}")))
        }) {
            Ok(secret) => return Ok(secret),
            Err(e) => tracing::debug!(error = %e, "keychain lookup failed"),
        }
    }

    if let Some(var) = &auth.env {
        return std::env::var(var)
            .map_err(|_| Error::Auth(format!("environment variable '{var}' is not set")));
    }

    if let Some((service, account)) = keychain {
        let var = keychain_env_name(service, account);
        if let Ok(secret) = std::env::var(&var) {
            tracing::debug!(env_var = %var, "secret read from keychain fallback variable");
            return Ok(secret);
        }
    }

    Err(Error::Auth(
        "no API key configured: set `key`, `env`, or keychain `service` + `account`".into(),
    ))
}

/// Write a secret into the OS keychain (`tidings config set-secret`).
pub fn store_in_keychain(service: &str, account: &str, secret: &str) -> Result<()> {
    keychain_entry(service, account)?
        .set_password(secret)
        .map_err(|e| Error::Auth(format!("keychain {service}/{account}: {e}")))
}

fn keychain_entry(service: &str, account: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keychain {service}/{account}: {e}")))
}

/// `("tidings", "gemini-api-key")` → `TIDINGS_GEMINI_API_KEY`.
fn keychain_env_name(service: &str, account: &str) -> String {
    format!("{service}_{account}").to_uppercase().replace('-', "_")
}

/// Replace the value of the `key` query parameter with `[REDACTED]`.
pub(crate) fn redact_url_key(url: &str) -> String {
    let Some(start) = url.find("key=").map(|i| i + "key=".len()) else {
        return url.to_string();
    };
    let end = url[start..].find('&').map_or(url.len(), |i| start + i);
    format!("{}[REDACTED]{}", &url[..start], &url[end..])
}
