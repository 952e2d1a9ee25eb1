//! Render identity: which mount generation of the card is current
//!
//! Every (re)mount builds a brand-new [`VisualSubtree`] and tags it with a
//! fresh [`RenderEpoch`]. Handles remember the epoch they were issued for and
//! only hold a weak reference to their subtree, so once a newer mount
//! replaces it they report the subtree as gone instead of capturing stale
//! content.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::capture::CaptureContext;
use crate::highlight::Highlighter;
use crate::params::PresentationParameters;
use crate::rendering::template::build_card;
use crate::rendering::VisualSubtree;
use crate::{Error, Result};

/// Mount generation counter. Epoch 0 means nothing has been mounted yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderEpoch(u64);

impl RenderEpoch {
    pub fn next(self) -> RenderEpoch {
        RenderEpoch(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RenderEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns the current subtree and decides when it is rebuilt
pub struct RenderController {
    epoch: RenderEpoch,
    // Shared with handles so they can tell whether they are still current
    live: Arc<AtomicU64>,
    current: Option<Arc<VisualSubtree>>,
    highlighter: Arc<dyn Highlighter>,
    context: Arc<CaptureContext>,
}

impl RenderController {
    pub fn new(highlighter: Arc<dyn Highlighter>, context: Arc<CaptureContext>) -> Self {
        Self {
            epoch: RenderEpoch::default(),
            live: Arc::new(AtomicU64::new(0)),
            current: None,
            highlighter,
            context,
        }
    }

    /// Build, highlight and install a new subtree for `params`.
    ///
    /// The previous subtree is discarded before the new one is built, so a
    /// failed mount leaves nothing mounted rather than stale content.
    pub fn mount(&mut self, params: PresentationParameters) -> Result<CardHandle> {
        self.epoch = self.epoch.next();
        self.live.store(self.epoch.value(), Ordering::SeqCst);
        self.current = None;

        let mut root = build_card(&params)?;
        let code = root
            .find_first_mut("code")
            .ok_or_else(|| Error::RenderError("Card has no code element".into()))?;
        self.highlighter
            .highlight(code, &params.language, &params.theme)?;

        log::debug!(
            "mounted card {} (language: {}, theme: {}, font: {})",
            self.epoch,
            params.language,
            params.theme,
            params.font
        );
        let subtree = Arc::new(VisualSubtree {
            epoch: self.epoch,
            params,
            root,
            highlighted: true,
        });
        let handle = self.handle_for(&subtree);
        self.current = Some(subtree);
        Ok(handle)
    }

    /// Remount only if `params` differ from what is mounted
    pub fn update(&mut self, params: PresentationParameters) -> Result<CardHandle> {
        match &self.current {
            Some(current) if current.params == params => Ok(self.handle_for(current)),
            _ => self.mount(params),
        }
    }

    /// Handle to the current subtree, if one is mounted
    pub fn handle(&self) -> Option<CardHandle> {
        self.current.as_ref().map(|s| self.handle_for(s))
    }

    pub fn current_epoch(&self) -> RenderEpoch {
        self.epoch
    }

    /// Parameters of the mounted subtree
    pub fn params(&self) -> Option<&PresentationParameters> {
        self.current.as_ref().map(|s| &s.params)
    }

    /// Discard the current subtree; outstanding handles become detached
    pub fn unmount(&mut self) {
        if self.current.take().is_some() {
            log::debug!("unmounted card {}", self.epoch);
        }
    }

    fn handle_for(&self, subtree: &Arc<VisualSubtree>) -> CardHandle {
        CardHandle {
            epoch: subtree.epoch,
            subtree: Arc::downgrade(subtree),
            live: self.live.clone(),
            context: self.context.clone(),
        }
    }
}

/// Capture-side reference to one mounted subtree
#[derive(Clone)]
pub struct CardHandle {
    epoch: RenderEpoch,
    subtree: Weak<VisualSubtree>,
    live: Arc<AtomicU64>,
    pub(crate) context: Arc<CaptureContext>,
}

impl CardHandle {
    pub fn epoch(&self) -> RenderEpoch {
        self.epoch
    }

    /// The subtree, if it is still the mounted one
    pub fn subtree(&self) -> Option<Arc<VisualSubtree>> {
        if self.live.load(Ordering::SeqCst) != self.epoch.value() {
            return None;
        }
        self.subtree
            .upgrade()
            .filter(|s| s.epoch == self.epoch && s.highlighted)
    }

    pub fn is_attached(&self) -> bool {
        self.subtree().is_some()
    }
}

impl fmt::Debug for CardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardHandle")
            .field("epoch", &self.epoch)
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use std::sync::atomic::AtomicUsize;

    /// Counts calls; fails every call when `fail` is set
    #[derive(Default)]
    struct CountingHighlighter {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Highlighter for CountingHighlighter {
        fn highlight(&self, code: &mut Element, _language: &str, _theme: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::HighlightError("boom".into()));
            }
            code.add_class("hljs");
            Ok(())
        }
    }

    fn controller(h: Arc<CountingHighlighter>) -> RenderController {
        RenderController::new(h, Arc::new(CaptureContext::for_tests()))
    }

    #[test]
    fn epochs_advance_per_mount() {
        let h = Arc::new(CountingHighlighter::default());
        let mut c = controller(h.clone());
        assert_eq!(c.current_epoch().value(), 0);
        assert!(c.handle().is_none());

        let first = c.mount(PresentationParameters::default()).unwrap();
        let second = c.mount(PresentationParameters::default()).unwrap();
        assert_eq!(first.epoch().value(), 1);
        assert_eq!(second.epoch().value(), 2);
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
        assert!(!first.is_attached());
        assert!(second.is_attached());
    }

    #[test]
    fn update_reuses_matching_subtree() {
        let h = Arc::new(CountingHighlighter::default());
        let mut c = controller(h.clone());
        let params = PresentationParameters::default().with_code("x");
        let a = c.update(params.clone()).unwrap();
        let b = c.update(params.clone()).unwrap();
        assert_eq!(a.epoch(), b.epoch());
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);

        let d = c.update(params.with_code("y")).unwrap();
        assert_eq!(d.epoch().value(), 2);
        assert!(!a.is_attached());
        assert_eq!(d.subtree().unwrap().code_text(), "y");
    }

    #[test]
    fn failed_mount_discards_previous_subtree() {
        let ok = Arc::new(CountingHighlighter::default());
        let mut c = controller(ok);
        let old = c.mount(PresentationParameters::default()).unwrap();

        c.highlighter = Arc::new(CountingHighlighter {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let err = c.mount(PresentationParameters::default()).unwrap_err();
        assert!(matches!(err, Error::HighlightError(_)));
        assert!(!old.is_attached());
        assert!(c.handle().is_none());
    }

    #[test]
    fn in_flight_reference_does_not_revive_stale_handle() {
        let mut c = controller(Arc::new(CountingHighlighter::default()));
        let old = c.mount(PresentationParameters::default()).unwrap();
        let held = old.subtree().unwrap();
        c.mount(PresentationParameters::default()).unwrap();
        // the old allocation is still alive but no longer current
        assert_eq!(held.epoch.value(), 1);
        assert!(old.subtree().is_none());
    }

    #[test]
    fn unmount_detaches_handles() {
        let mut c = controller(Arc::new(CountingHighlighter::default()));
        let h = c.mount(PresentationParameters::default()).unwrap();
        c.unmount();
        assert!(!h.is_attached());
        assert!(c.params().is_none());
    }
}
