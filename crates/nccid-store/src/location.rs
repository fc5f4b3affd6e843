// SPDX-License-Identifier: Apache-2.0

use crate::load_error::LoadError;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Where the dataset (or its index) lives.
///
/// Accepted forms:
/// - `local:/path/latest.csv` or a plain path
/// - `s3://bucket/key` (endpoint taken from the remote source config)
/// - `s3:https://endpoint/bucket/key`
/// - `http:https://host/path` or a bare `http(s)://` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    ObjectStore {
        endpoint: Option<String>,
        bucket: String,
        key: String,
    },
    Http(String),
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Result<Self, LoadError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(LoadError::invalid("source location is empty"));
        }
        if let Some(path) = s.strip_prefix("local:") {
            return non_empty_path(path);
        }
        if let Some(rest) = s.strip_prefix("s3://") {
            let (bucket, key) = split_bucket_key(rest)?;
            return Ok(Self::ObjectStore {
                endpoint: None,
                bucket,
                key,
            });
        }
        if let Some(url) = s.strip_prefix("s3:") {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| LoadError::invalid(format!("invalid object store url {url:?}: {e}")))?;
            let path = parsed.path().trim_start_matches('/').to_string();
            let (bucket, key) = split_bucket_key(&path)?;
            let mut endpoint = parsed;
            endpoint.set_path("");
            endpoint.set_query(None);
            return Ok(Self::ObjectStore {
                endpoint: Some(endpoint.as_str().trim_end_matches('/').to_string()),
                bucket,
                key,
            });
        }
        let url = s.strip_prefix("http:").filter(|u| u.contains("://")).unwrap_or(s);
        if url.starts_with("http://") || url.starts_with("https://") {
            reqwest::Url::parse(url)
                .map_err(|e| LoadError::invalid(format!("invalid http url {url:?}: {e}")))?;
            return Ok(Self::Http(url.to_string()));
        }
        non_empty_path(s)
    }

    /// Location of `relative` next to this one, as listed in an index file.
    pub fn sibling(&self, relative: &str) -> Result<Self, LoadError> {
        let relative = relative.trim();
        if relative.is_empty() {
            return Err(LoadError::invalid("index entry has an empty path"));
        }
        match self {
            Self::Local(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                Ok(Self::Local(dir.join(relative)))
            }
            Self::ObjectStore {
                endpoint,
                bucket,
                key,
            } => {
                let key = match (relative.strip_prefix('/'), key.rsplit_once('/')) {
                    (Some(absolute), _) => absolute.to_string(),
                    (None, Some((dir, _))) => format!("{dir}/{relative}"),
                    (None, None) => relative.to_string(),
                };
                Ok(Self::ObjectStore {
                    endpoint: endpoint.clone(),
                    bucket: bucket.clone(),
                    key,
                })
            }
            Self::Http(url) => {
                let base = reqwest::Url::parse(url)
                    .map_err(|e| LoadError::invalid(format!("invalid http url {url:?}: {e}")))?;
                let joined = base
                    .join(relative)
                    .map_err(|e| LoadError::invalid(format!("cannot resolve {relative:?}: {e}")))?;
                Ok(Self::Http(joined.to_string()))
            }
        }
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        !matches!(self, Self::Local(_))
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "local:{}", path.display()),
            Self::ObjectStore {
                endpoint: None,
                bucket,
                key,
            } => write!(f, "s3://{bucket}/{key}"),
            Self::ObjectStore {
                endpoint: Some(endpoint),
                bucket,
                key,
            } => write!(f, "s3:{endpoint}/{bucket}/{key}"),
            Self::Http(url) => write!(f, "http:{url}"),
        }
    }
}

fn non_empty_path(raw: &str) -> Result<SourceLocation, LoadError> {
    if raw.trim().is_empty() {
        return Err(LoadError::invalid("local source path is empty"));
    }
    Ok(SourceLocation::Local(PathBuf::from(raw.trim())))
}

fn split_bucket_key(rest: &str) -> Result<(String, String), LoadError> {
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.trim_matches('/').is_empty() => {
            Ok((bucket.to_string(), key.trim_start_matches('/').to_string()))
        }
        _ => Err(LoadError::invalid(format!(
            "object store location needs bucket and key (got {rest:?})"
        ))),
    }
}
