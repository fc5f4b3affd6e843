// SPDX-License-Identifier: Apache-2.0

use crate::load_error::{LoadError, LoadErrorCode};
use crate::location::SourceLocation;
use crate::retry::{BackoffPolicy, RetryPolicy};
use crate::source::DatasetSource;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{instrument, warn};

pub const DEFAULT_S3_ENDPOINT: &str = "https://s3.amazonaws.com";

#[derive(Debug, Clone)]
pub struct RemoteSourceConfig {
    /// Used for `s3://bucket/key` locations that carry no endpoint.
    pub s3_endpoint: String,
    pub bearer_token: Option<String>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub allow_private_hosts: bool,
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self {
            s3_endpoint: DEFAULT_S3_ENDPOINT.to_string(),
            bearer_token: None,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(15),
            allow_private_hosts: false,
        }
    }
}

/// Plain HTTP GET against S3-compatible object URLs
/// (`{endpoint}/{bucket}/{key}`) or arbitrary http(s) URLs.
pub struct S3LikeSource {
    config: RemoteSourceConfig,
    client: reqwest::Client,
}

impl S3LikeSource {
    #[must_use]
    pub fn new(config: RemoteSourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn object_url(&self, location: &SourceLocation) -> Result<String, LoadError> {
        match location {
            SourceLocation::ObjectStore {
                endpoint,
                bucket,
                key,
            } => {
                let base = endpoint.as_deref().unwrap_or(&self.config.s3_endpoint);
                Ok(format!(
                    "{}/{}/{}",
                    base.trim_end_matches('/'),
                    bucket,
                    key.trim_start_matches('/')
                ))
            }
            SourceLocation::Http(url) => Ok(url.clone()),
            SourceLocation::Local(_) => Err(LoadError::invalid(format!(
                "remote backend cannot read {location}"
            ))),
        }
    }

    fn validate_url(&self, url: &str) -> Result<(), LoadError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| LoadError::invalid(format!("invalid source url: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| LoadError::invalid("source url missing host"))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        if self.config.allow_private_hosts {
            return Ok(());
        }
        if host == "localhost" || host.ends_with(".localhost") {
            return Err(LoadError::invalid("blocked source host: localhost"));
        }
        if let Ok(ip) = host.parse::<IpAddr>() {
            let private = match ip {
                IpAddr::V4(v4) => {
                    v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_broadcast()
                }
                IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
            };
            if private {
                return Err(LoadError::invalid("blocked private source host"));
            }
        }
        Ok(())
    }

    fn auth_headers(&self) -> Result<HeaderMap, LoadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| LoadError::invalid(format!("invalid auth header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    #[instrument(name = "source_s3_get_with_retry", skip(self))]
    async fn get_with_retry(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        self.validate_url(url)?;
        let headers = self.auth_headers()?;
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last = attempt >= max_attempts;
            match self.client.get(url).headers(headers.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp.bytes().await.map(|b| b.to_vec()).map_err(|e| {
                        LoadError::unreachable(format!("read body failed url={url}: {e}"))
                    });
                }
                Ok(resp) if resp.status().is_client_error() => {
                    return Err(LoadError::unreachable(format!(
                        "download failed status={} url={url}",
                        resp.status()
                    )));
                }
                Ok(resp) => {
                    if last {
                        return Err(LoadError::unreachable(format!(
                            "download failed status={} url={url}",
                            resp.status()
                        )));
                    }
                    warn!(attempt, status = %resp.status(), url, "source fetch failed, retrying");
                }
                Err(e) => {
                    if last {
                        let code = if e.is_timeout() {
                            LoadErrorCode::SourceTimeout
                        } else {
                            LoadErrorCode::SourceUnreachable
                        };
                        return Err(LoadError::new(code, format!("download failed url={url}: {e}")));
                    }
                    warn!(attempt, error = %e, url, "source fetch failed, retrying");
                }
            }
            tokio::time::sleep(self.config.retry.delay_for_attempt(attempt)).await;
        }
    }
}

#[async_trait]
impl DatasetSource for S3LikeSource {
    fn backend_tag(&self) -> &'static str {
        "s3like"
    }

    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError> {
        let url = self.object_url(location)?;
        self.get_with_retry(&url).await
    }
}
