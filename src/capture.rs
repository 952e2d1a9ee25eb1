//! The two capture strategies: vector (SVG text) and raster (PNG object URL)

use std::sync::Arc;

use crate::blob::{Blob, BlobStore, ObjectUrl};
use crate::fetch::{DefaultFetcher, ResourceFetcher};
use crate::fonts::FontLibrary;
use crate::identity::CardHandle;
use crate::rendering::layout::{layout_tree, TextMetrics};
use crate::rendering::raster::{RasterOptions, Rasterizer};
use crate::svg::inline::ResourceInliner;
use crate::svg::postprocess::finalize;
use crate::svg::serialize::element_to_svg;
use crate::{EngineConfig, Result};

/// Capabilities shared by every handle a controller issues
pub struct CaptureContext {
    pub metrics: TextMetrics,
    pub fonts: Arc<FontLibrary>,
    pub inliner: ResourceInliner,
    pub rasterizer: Rasterizer,
    pub blobs: BlobStore,
    pub raster_scale: f32,
}

impl CaptureContext {
    pub fn new(config: &EngineConfig, blobs: BlobStore) -> Result<Self> {
        let fetcher: Arc<dyn ResourceFetcher> = Arc::new(DefaultFetcher::new(config)?);
        Ok(Self::with_fetcher(config, blobs, fetcher))
    }

    pub fn with_fetcher(
        config: &EngineConfig,
        blobs: BlobStore,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        let metrics = config.text_metrics();
        let fonts = Arc::new(FontLibrary::new(
            config.fonts_dir.clone(),
            config.load_system_fonts,
        ));
        Self {
            metrics,
            rasterizer: Rasterizer::new(fonts.clone(), metrics),
            fonts,
            inliner: ResourceInliner::new(fetcher),
            blobs,
            raster_scale: config.raster_scale,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let config = EngineConfig {
            load_system_fonts: false,
            ..Default::default()
        };
        Self::new(&config, BlobStore::new()).unwrap()
    }
}

impl CardHandle {
    /// Serialize the card to a self-contained SVG document.
    ///
    /// `Ok(None)` when the handle is detached, either before the capture
    /// starts or because a remount superseded it while resources loaded.
    pub async fn capture_svg(&self) -> Result<Option<String>> {
        let Some(subtree) = self.subtree() else {
            log::warn!("SVG capture unavailable: card {} is no longer mounted", self.epoch());
            return Ok(None);
        };
        let ctx = &self.context;

        let layout = layout_tree(&subtree.root, ctx.metrics);
        let mut doc = element_to_svg(&layout);
        let inlined = ctx.inliner.inline_resources(&mut doc).await?;
        let face = ctx.fonts.font_face(subtree.params.font).await?;
        let xml = finalize(doc, &face).to_xml();

        if !self.is_attached() {
            log::warn!("discarding SVG capture of superseded card {}", self.epoch());
            return Ok(None);
        }
        log::info!(
            "captured SVG of card {}: {} bytes, {} resources inlined",
            self.epoch(),
            xml.len(),
            inlined
        );
        Ok(Some(xml))
    }

    /// Rasterize the card onto a transparent surface and register the PNG
    /// bytes in the blob store. The caller owns the returned URL and must
    /// revoke it.
    pub async fn capture_png(&self) -> Result<Option<ObjectUrl>> {
        let Some(subtree) = self.subtree() else {
            log::warn!("PNG capture unavailable: card {} is no longer mounted", self.epoch());
            return Ok(None);
        };
        let ctx = &self.context;

        let options = RasterOptions {
            background: None,
            scale: ctx.raster_scale,
        };
        let surface = ctx.rasterizer.rasterize(subtree, options).await?;
        let png = surface.encode_png()?;
        let size = png.len();

        let Some(url) = self.publish_png(png) else {
            return Ok(None);
        };
        log::info!(
            "captured PNG of card {}: {}x{}, {} bytes",
            self.epoch(),
            surface.width(),
            surface.height(),
            size
        );
        Ok(Some(url))
    }

    // Registers the bytes only while the card is still mounted
    fn publish_png(&self, png: Vec<u8>) -> Option<ObjectUrl> {
        if !self.is_attached() {
            log::warn!("discarding PNG capture of superseded card {}", self.epoch());
            return None;
        }
        Some(self.context.blobs.create_object_url(Blob::new("image/png", png)))
    }

    /// Blob store the PNG object URLs are registered in
    pub fn blob_store(&self) -> &BlobStore {
        &self.context.blobs
    }
}
