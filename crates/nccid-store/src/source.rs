// SPDX-License-Identifier: Apache-2.0

use crate::load_error::{LoadError, LoadErrorCode};
use crate::location::SourceLocation;
use crate::source_s3::{RemoteSourceConfig, S3LikeSource};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::instrument;

/// Raw byte access to a source location. Parsing happens in the loader.
#[async_trait]
pub trait DatasetSource: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError>;
}

#[derive(Debug, Default)]
pub struct LocalFsSource;

#[async_trait]
impl DatasetSource for LocalFsSource {
    fn backend_tag(&self) -> &'static str {
        "localfs"
    }

    #[instrument(name = "source_local_fetch", skip(self))]
    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError> {
        let SourceLocation::Local(path) = location else {
            return Err(LoadError::invalid(format!(
                "local backend cannot read {location}"
            )));
        };
        tokio::fs::read(path).await.map_err(|e| {
            let code = match e.kind() {
                ErrorKind::TimedOut => LoadErrorCode::SourceTimeout,
                _ => LoadErrorCode::SourceUnreachable,
            };
            LoadError::new(code, format!("read {} failed: {e}", path.display()))
        })
    }
}

/// Dispatches by location kind: local paths to the filesystem, everything
/// else to the remote backend.
pub struct RoutingSource {
    local: Arc<dyn DatasetSource>,
    remote: Arc<dyn DatasetSource>,
}

impl RoutingSource {
    #[must_use]
    pub fn new(local: Arc<dyn DatasetSource>, remote: Arc<dyn DatasetSource>) -> Self {
        Self { local, remote }
    }

    #[must_use]
    pub fn from_config(remote: RemoteSourceConfig) -> Self {
        Self::new(Arc::new(LocalFsSource), Arc::new(S3LikeSource::new(remote)))
    }
}

#[async_trait]
impl DatasetSource for RoutingSource {
    fn backend_tag(&self) -> &'static str {
        "routing"
    }

    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError> {
        if location.is_remote() {
            self.remote.fetch(location).await
        } else {
            self.local.fetch(location).await
        }
    }
}
