//! Plan utilization from the Anthropic OAuth usage endpoint
//!
//! Claude Code stores its OAuth token in `<claude_dir>/.credentials.json`.
//! With that token, `GET /api/oauth/usage` reports how much of the five-hour
//! and seven-day allowances is used. Responses are cached for five minutes,
//! and only the process holding the refresh lock talks to the API.

use ccline_core::cache::TtlCache;
use ccline_core::error::{CclineError, Result};
use ccline_core::lock::{DEFAULT_LOCK_MAX_AGE, PidLock};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const USAGE_API_URL: &str = "https://api.anthropic.com/api/oauth/usage";
const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
const ANTHROPIC_BETA_VALUE: &str = "oauth-2025-04-20";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
const CACHE_KEY: &str = "oauth-usage";
pub const CREDENTIALS_FILE: &str = ".credentials.json";

/// One rolling allowance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Percent used, 0-100
    pub utilization: f64,
    pub resets_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub five_hour: Option<UsageLimit>,
    pub seven_day: Option<UsageLimit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    claude_ai_oauth: Option<OauthCredentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OauthCredentials {
    access_token: String,
}

/// `claudeAiOauth.accessToken` from a credentials file
pub fn read_access_token(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)?;
    let credentials: Credentials = serde_json::from_str(content.trim())?;
    credentials
        .claude_ai_oauth
        .map(|oauth| oauth.access_token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CclineError::Config(format!("no OAuth token in {}", path.display())))
}

pub async fn fetch_usage_limits(token: &str) -> Result<UsageLimits> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| CclineError::Config(format!("invalid token format: {e}")))?,
    );
    headers.insert(ANTHROPIC_BETA_HEADER, HeaderValue::from_static(ANTHROPIC_BETA_VALUE));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("ccline/", env!("CARGO_PKG_VERSION"))),
    );

    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let limits = client
        .get(USAGE_API_URL)
        .headers(headers)
        .send()
        .await?
        .error_for_status()?
        .json::<UsageLimits>()
        .await?;
    Ok(limits)
}

/// Cached, lock-gated access to the usage endpoint
pub struct UsageLimitsProbe {
    cache: TtlCache,
    lock_path: PathBuf,
    credentials_path: PathBuf,
}

impl UsageLimitsProbe {
    pub fn new(claude_dir: &Path, cache_path: PathBuf, lock_path: PathBuf, ttl: TimeDelta) -> Self {
        Self {
            cache: TtlCache::new(cache_path, ttl),
            lock_path,
            credentials_path: claude_dir.join(CREDENTIALS_FILE),
        }
    }

    pub async fn limits(&self, now: DateTime<Utc>) -> Option<UsageLimits> {
        let credentials = self.credentials_path.clone();
        self.limits_with(now, || async move {
            let token = read_access_token(&credentials)?;
            fetch_usage_limits(&token).await
        })
        .await
    }

    /// Like [`UsageLimitsProbe::limits`] with a custom fetcher
    ///
    /// A failed fetch falls back to the last cached value, however old.
    pub async fn limits_with<F, Fut>(&self, now: DateTime<Utc>, fetch: F) -> Option<UsageLimits>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UsageLimits>>,
    {
        if let Some(limits) = self.cache.read::<UsageLimits>(CACHE_KEY, now) {
            return Some(limits);
        }

        let _guard = match PidLock::try_acquire(&self.lock_path, DEFAULT_LOCK_MAX_AGE) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!("Usage limit refresh in progress elsewhere");
                return self.cache.read_stale(CACHE_KEY);
            }
            Err(e) => {
                warn!("Failed to take usage limit lock: {}", e);
                return self.cache.read_stale(CACHE_KEY);
            }
        };

        match fetch().await {
            Ok(limits) => {
                if let Err(e) = self.cache.write(CACHE_KEY, &limits, now) {
                    warn!("Failed to write usage limit cache: {}", e);
                }
                Some(limits)
            }
            Err(e) => {
                debug!("Usage limit fetch failed: {}", e);
                self.cache.read_stale(CACHE_KEY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, m, 0).unwrap()
    }

    fn probe(dir: &TempDir) -> UsageLimitsProbe {
        UsageLimitsProbe::new(
            dir.path(),
            dir.path().join("limits.json"),
            dir.path().join("limits.lock"),
            TimeDelta::seconds(300),
        )
    }

    fn sample(five_hour: f64) -> UsageLimits {
        UsageLimits {
            five_hour: Some(UsageLimit {
                utilization: five_hour,
                resets_at: Some("2025-06-02T15:00:00Z".to_string()),
            }),
            seven_day: Some(UsageLimit {
                utilization: 12.0,
                resets_at: None,
            }),
        }
    }

    #[test]
    fn test_response_shape() {
        let json = r#"{
            "five_hour": {"utilization": 42.5, "resets_at": "2025-06-02T15:00:00Z"},
            "seven_day": {"utilization": 12.0, "resets_at": null},
            "seven_day_opus": null
        }"#;
        let limits: UsageLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits, sample(42.5));
    }

    #[test]
    fn test_read_access_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CREDENTIALS_FILE);

        std::fs::write(&path, r#"{"claudeAiOauth": {"accessToken": "sk-ant-oat-1", "expiresAt": 1}}"#).unwrap();
        assert_eq!(read_access_token(&path).unwrap(), "sk-ant-oat-1");

        std::fs::write(&path, r#"{"other": {}}"#).unwrap();
        assert!(matches!(read_access_token(&path), Err(CclineError::Config(_))));

        assert!(matches!(
            read_access_token(&dir.path().join("missing.json")),
            Err(CclineError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let dir = TempDir::new().unwrap();
        let probe = probe(&dir);
        let first = probe.limits_with(at(0), || async { Ok(sample(40.0)) }).await;
        let second = probe.limits_with(at(3), || async { Ok(sample(99.0)) }).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_fetch_uses_stale_value() {
        let dir = TempDir::new().unwrap();
        let probe = probe(&dir);
        probe.limits_with(at(0), || async { Ok(sample(40.0)) }).await;

        let limits = probe
            .limits_with(at(30), || async {
                Err(CclineError::Timeout {
                    operation: "usage API".to_string(),
                    seconds: 3,
                })
            })
            .await;
        assert_eq!(limits, Some(sample(40.0)));
    }

    #[tokio::test]
    async fn test_nothing_cached_and_fetch_fails() {
        let dir = TempDir::new().unwrap();
        let limits = probe(&dir)
            .limits_with(at(0), || async { Err(CclineError::Config("no token".to_string())) })
            .await;
        assert!(limits.is_none());
    }
}
