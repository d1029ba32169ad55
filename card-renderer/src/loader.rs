//! [`AssetLoader`] backed by the local filesystem and inline data URIs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use card_core::{AssetLoader, CardResult, RasterImage};

use crate::error::{RenderError, RenderResult};
use crate::image::{load_image_from_bytes, load_image_from_data_uri};
use crate::qr::rasterize_qr;

/// Loads `data:` URIs and local image files, and rasterizes QR symbols.
#[derive(Debug, Clone, Default)]
pub struct ImageAssetLoader {
    base_dir: Option<PathBuf>,
}

impl ImageAssetLoader {
    /// Create a loader resolving relative paths against the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir`, e.g. the directory of the template file.
    #[must_use]
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve_path(&self, src: &str) -> PathBuf {
        let path = Path::new(src.strip_prefix("file://").unwrap_or(src));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    async fn fetch(&self, src: &str) -> RenderResult<RasterImage> {
        if src.starts_with("data:") {
            return load_image_from_data_uri(src);
        }
        if src.contains("://") && !src.starts_with("file://") {
            return Err(RenderError::UnsupportedSource(src.to_string()));
        }
        let path = self.resolve_path(src);
        tracing::debug!("Reading image {}", path.display());
        let bytes = tokio::fs::read(&path).await?;
        load_image_from_bytes(&bytes)
    }
}

#[async_trait]
impl AssetLoader for ImageAssetLoader {
    async fn load_image(&self, src: &str) -> CardResult<RasterImage> {
        Ok(self.fetch(src).await?)
    }

    async fn rasterize_qr(&self, value: &str, size: u32) -> CardResult<RasterImage> {
        Ok(rasterize_qr(value, size)?)
    }
}
