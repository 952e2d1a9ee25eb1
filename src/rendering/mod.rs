//! Rendering layer: card markup, layout, painting and rasterization

pub mod layout;
pub mod paint;
pub mod raster;
pub mod template;

use crate::dom::Element;
use crate::identity::RenderEpoch;
use crate::params::PresentationParameters;

/// One mounted generation of the card.
///
/// Built and highlighted by the
/// [`RenderController`](crate::identity::RenderController), then shared
/// read-only with captures.
#[derive(Debug, Clone)]
pub struct VisualSubtree {
    pub epoch: RenderEpoch,
    pub params: PresentationParameters,
    pub root: Element,
    /// Set once the highlighter has run over the code node
    pub highlighted: bool,
}

impl VisualSubtree {
    /// Text shown in the code box, after highlighting
    pub fn code_text(&self) -> String {
        self.root
            .find_first("code")
            .map(|c| c.text_content())
            .unwrap_or_default()
    }
}
