//! Export trigger: hand a captured artifact to a save action, then release it

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::blob::{Blob, BlobStore, ObjectUrl};
use crate::{Error, Result};

pub const SVG_FILENAME: &str = "export.svg";
pub const PNG_FILENAME: &str = "export.png";
pub const SVG_MIME: &str = "image/svg+xml";

/// Output of one capture strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    Svg(String),
    Png(ObjectUrl),
}

impl ExportArtifact {
    pub fn filename(&self) -> &'static str {
        match self {
            ExportArtifact::Svg(_) => SVG_FILENAME,
            ExportArtifact::Png(_) => PNG_FILENAME,
        }
    }
}

/// The single save action invoked per export
pub trait Downloader: Send + Sync {
    fn save<'a>(&'a self, filename: &'a str, blob: &'a Blob) -> BoxFuture<'a, Result<()>>;
}

/// Saves exports as files in a directory
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirectoryDownloader {
    fn save<'a>(&'a self, filename: &'a str, blob: &'a Blob) -> BoxFuture<'a, Result<()>> {
        async move {
            tokio::fs::create_dir_all(&self.dir).await?;
            let path = self.dir.join(filename);
            tokio::fs::write(&path, blob.bytes()).await?;
            log::info!("saved {} ({} bytes)", path.display(), blob.len());
            Ok(())
        }
        .boxed()
    }
}

/// Save `artifact` through `downloader` and revoke the object URL used for
/// it, whether or not the save succeeded.
pub async fn export_artifact(
    artifact: ExportArtifact,
    blobs: &BlobStore,
    downloader: &dyn Downloader,
) -> Result<()> {
    let filename = artifact.filename();
    let url = match artifact {
        ExportArtifact::Svg(text) => blobs.create_object_url(Blob::new(SVG_MIME, text.into_bytes())),
        ExportArtifact::Png(url) => url,
    };

    let saved = match blobs.resolve(&url) {
        Some(blob) => downloader.save(filename, &blob).await,
        None => Err(Error::Other(format!("Object URL {} was already revoked", url))),
    };
    blobs.revoke(&url);
    saved
}
