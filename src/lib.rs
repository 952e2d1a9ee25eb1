//! Codepicture snapshot engine
//!
//! Renders syntax-highlighted source code inside an editor-style card and
//! exports the card as a vector image (SVG with embedded font faces and a
//! drop-shadow filter) or a raster image (transparent PNG behind an object
//! URL).
//!
//! # Features
//!
//! - **Render identity**: every parameter change remounts the card under a new
//!   [`RenderEpoch`]; handles to older mounts become unavailable
//! - **Vector capture**: self-contained SVG, external resources inlined
//! - **Raster capture**: PNG via tiny-skia/resvg on a blocking worker
//! - **`http`** (default): fetch `http(s)` resources while inlining
//!
//! # Example
//!
//! ```no_run
//! use codepicture::{DirectoryDownloader, EngineConfig, PresentationParameters};
//!
//! # async fn run() -> codepicture::Result<()> {
//! let mut engine = codepicture::new_engine(EngineConfig::default())?;
//! let card = engine.mount(
//!     PresentationParameters::default()
//!         .with_language("rs")
//!         .with_code("fn main() {}"),
//! )?;
//!
//! let downloads = DirectoryDownloader::new("out");
//! engine.export_svg(&card, &downloads).await?;
//! engine.export_png(&card, &downloads).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod blob;
pub mod capture;
pub mod color;
pub mod dom;
pub mod export;
pub mod fetch;
pub mod fonts;
pub mod highlight;
pub mod identity;
pub mod params;
pub mod rendering;
pub mod svg;

pub use blob::{Blob, BlobStore, ObjectUrl};
pub use capture::CaptureContext;
pub use export::{DirectoryDownloader, Downloader, ExportArtifact};
pub use fetch::{DefaultFetcher, Resource, ResourceFetcher};
pub use highlight::{Highlighter, SyntectHighlighter};
pub use identity::{CardHandle, RenderController, RenderEpoch};
pub use params::{parse_dimension, FontChoice, PresentationParameters};

use rendering::layout::TextMetrics;

/// Configuration for the snapshot engine
///
/// Defaults render 14px text on 21px lines at 1x scale, look for bundled
/// fonts in `./fonts` and fall back to system fonts for rasterization.
///
/// # Examples
///
/// ```
/// let cfg = codepicture::EngineConfig::default();
/// assert_eq!(cfg.raster_scale, 1.0);
/// assert_eq!(cfg.defaults.width, 800);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of font face files; families with none embed the compiled-in Hack face
    pub fonts_dir: PathBuf,
    /// Extra `.tmTheme` files to offer alongside the built-in themes
    pub themes_dir: Option<PathBuf>,
    /// Code font size in pixels
    pub font_size: f32,
    /// Line height in pixels
    pub line_height: f32,
    /// Advance of one monospace character in pixels
    pub char_advance: f32,
    /// Device pixels per CSS pixel for PNG export
    pub raster_scale: f32,
    /// Whether the raster font database also loads system fonts
    pub load_system_fonts: bool,
    /// User agent sent when fetching remote resources
    pub user_agent: String,
    /// Timeout for resource fetches in milliseconds
    pub timeout_ms: u64,
    /// Base URL that relative resource references resolve against
    pub resource_base: Option<String>,
    /// Parameters used by [`SnapshotEngine::mount_defaults`]
    pub defaults: PresentationParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fonts_dir: PathBuf::from("fonts"),
            themes_dir: None,
            font_size: 14.0,
            line_height: 21.0,
            char_advance: 8.4,
            raster_scale: 1.0,
            load_system_fonts: true,
            user_agent: concat!("codepicture/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 30000,
            resource_base: None,
            defaults: PresentationParameters::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("font_size", self.font_size),
            ("line_height", self.line_height),
            ("char_advance", self.char_advance),
            ("raster_scale", self.raster_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigError(format!("{} must be positive, got {}", name, value)));
            }
        }
        Ok(())
    }

    pub fn text_metrics(&self) -> TextMetrics {
        TextMetrics {
            font_size: self.font_size,
            line_height: self.line_height,
            char_advance: self.char_advance,
        }
    }
}

/// Render controller plus the export glue around it
pub struct SnapshotEngine {
    config: EngineConfig,
    controller: RenderController,
    highlighter: Arc<dyn Highlighter>,
    blobs: BlobStore,
}

impl SnapshotEngine {
    /// Engine with the syntect highlighter and the default fetcher
    pub fn new(config: EngineConfig) -> Result<Self> {
        let highlighter = Arc::new(SyntectHighlighter::new(config.themes_dir.as_deref())?);
        Self::with_highlighter(config, highlighter)
    }

    pub fn with_highlighter(config: EngineConfig, highlighter: Arc<dyn Highlighter>) -> Result<Self> {
        let fetcher: Arc<dyn ResourceFetcher> = Arc::new(DefaultFetcher::new(&config)?);
        Self::from_parts(config, highlighter, fetcher)
    }

    /// Engine over caller-supplied highlighting and fetching capabilities
    pub fn from_parts(
        config: EngineConfig,
        highlighter: Arc<dyn Highlighter>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let blobs = BlobStore::new();
        let context = Arc::new(CaptureContext::with_fetcher(&config, blobs.clone(), fetcher));
        let controller = RenderController::new(highlighter.clone(), context);
        log::info!(
            "snapshot engine ready (fonts: {}, scale: {})",
            config.fonts_dir.display(),
            config.raster_scale
        );
        Ok(Self {
            config,
            controller,
            highlighter,
            blobs,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Remount the card with `params`
    pub fn mount(&mut self, params: PresentationParameters) -> Result<CardHandle> {
        self.controller.mount(params)
    }

    /// Mount the configured default parameters
    pub fn mount_defaults(&mut self) -> Result<CardHandle> {
        self.controller.mount(self.config.defaults.clone())
    }

    /// Remount only if `params` changed
    pub fn update(&mut self, params: PresentationParameters) -> Result<CardHandle> {
        self.controller.update(params)
    }

    pub fn handle(&self) -> Option<CardHandle> {
        self.controller.handle()
    }

    pub fn current_epoch(&self) -> RenderEpoch {
        self.controller.current_epoch()
    }

    pub fn unmount(&mut self) {
        self.controller.unmount()
    }

    /// Languages offered by the highlighter
    pub fn languages(&self) -> Vec<String> {
        self.highlighter.languages()
    }

    /// Themes offered by the highlighter
    pub fn themes(&self) -> Vec<String> {
        self.highlighter.themes()
    }

    pub fn fonts(&self) -> &'static [FontChoice] {
        FontChoice::all()
    }

    /// Store holding PNG object URLs until they are revoked
    pub fn blob_store(&self) -> &BlobStore {
        &self.blobs
    }

    /// Capture `card` as SVG and save it as `export.svg`.
    ///
    /// Returns `Ok(false)` when the card is no longer mounted.
    pub async fn export_svg(&self, card: &CardHandle, downloader: &dyn Downloader) -> Result<bool> {
        match card.capture_svg().await? {
            Some(svg) => {
                export::export_artifact(ExportArtifact::Svg(svg), &self.blobs, downloader).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Capture `card` as PNG and save it as `export.png`.
    ///
    /// Returns `Ok(false)` when the card is no longer mounted.
    pub async fn export_png(&self, card: &CardHandle, downloader: &dyn Downloader) -> Result<bool> {
        match card.capture_png().await? {
            Some(url) => {
                export::export_artifact(ExportArtifact::Png(url), card.blob_store(), downloader)
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Create an engine with the default highlighter and fetcher
pub fn new_engine(config: EngineConfig) -> Result<SnapshotEngine> {
    SnapshotEngine::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.fonts_dir, PathBuf::from("fonts"));
        assert!(config.user_agent.starts_with("codepicture/"));
        assert_eq!(config.text_metrics(), TextMetrics::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "raster_scale": 2.0, "defaults": { "language": "rust", "codePadding": 20 } }"#,
        )
        .unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.raster_scale, 2.0);
        assert_eq!(config.font_size, 14.0);
        assert_eq!(config.defaults.language, "rust");
        assert_eq!(config.defaults.code_padding, 20);
        assert_eq!(config.defaults.width, 800);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "line_height": 0 }"#).unwrap();
        let err = EngineConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let missing = EngineConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, Error::ConfigError(_)));
    }

    #[test]
    fn test_engine_catalogues() {
        let config = EngineConfig {
            load_system_fonts: false,
            ..Default::default()
        };
        let mut engine = new_engine(config).unwrap();
        assert!(engine.languages().iter().any(|l| l == "Rust"));
        assert!(engine.themes().iter().any(|t| t == params::DEFAULT_THEME));
        assert_eq!(engine.fonts().len(), 2);

        let card = engine.mount_defaults().unwrap();
        assert_eq!(card.epoch(), engine.current_epoch());
        assert_eq!(card.subtree().unwrap().code_text(), "No Code");
    }
}
