//! Stale-render protection and the export trigger

use std::sync::Arc;

use codepicture::dom::{Element, Node};
use codepicture::{
    DirectoryDownloader, EngineConfig, Highlighter, PresentationParameters, Resource,
    ResourceFetcher, SnapshotEngine,
};
use futures::future::BoxFuture;
use tokio::sync::Notify;

fn engine() -> SnapshotEngine {
    let cfg = EngineConfig {
        load_system_fonts: false,
        ..Default::default()
    };
    codepicture::new_engine(cfg).expect("Failed to create engine")
}

#[tokio::test]
async fn rapid_changes_capture_the_latest_code() {
    let mut engine = engine();
    let old = engine
        .update(PresentationParameters::default().with_code("String stale = \"a\";"))
        .unwrap();
    let new = engine
        .update(PresentationParameters::default().with_code("String fresh = \"b\";"))
        .unwrap();
    assert_eq!(new.epoch().value(), 2);

    let current = engine.handle().expect("mounted");
    assert_eq!(current.epoch(), new.epoch());
    let svg = current.capture_svg().await.unwrap().unwrap();
    assert!(svg.contains("fresh"));
    assert!(!svg.contains("stale"));

    assert_eq!(old.capture_svg().await.unwrap(), None);
    assert_eq!(old.capture_png().await.unwrap(), None);
}

#[tokio::test]
async fn unchanged_parameters_do_not_remount() {
    let mut engine = engine();
    let params = PresentationParameters::default().with_code("x");
    let a = engine.update(params.clone()).unwrap();
    let b = engine.update(params).unwrap();
    assert_eq!(a.epoch(), b.epoch());
    assert!(a.capture_svg().await.unwrap().is_some());
}

#[tokio::test]
async fn failed_remount_leaves_no_stale_card() {
    let mut engine = engine();
    let good = engine.mount(PresentationParameters::default()).unwrap();
    let err = engine
        .mount(PresentationParameters::default().with_theme("no-such-theme"))
        .unwrap_err();
    assert!(matches!(err, codepicture::Error::HighlightError(_)));
    assert!(engine.handle().is_none());
    assert_eq!(good.capture_svg().await.unwrap(), None);
}

#[tokio::test]
async fn exports_save_files_and_revoke_urls() {
    let out = tempfile::tempdir().unwrap();
    let downloads = DirectoryDownloader::new(out.path());
    let mut engine = engine();
    let card = engine
        .mount(PresentationParameters::default().with_code("print('hi')").with_language("py"))
        .unwrap();

    assert!(engine.export_svg(&card, &downloads).await.unwrap());
    assert!(engine.export_png(&card, &downloads).await.unwrap());
    assert!(engine.blob_store().is_empty());

    let svg = std::fs::read_to_string(out.path().join("export.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    let png = std::fs::read(out.path().join("export.png")).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn exporting_a_detached_card_is_a_no_op() {
    let out = tempfile::tempdir().unwrap();
    let downloads = DirectoryDownloader::new(out.path());
    let mut engine = engine();
    let card = engine.mount(PresentationParameters::default()).unwrap();
    engine.unmount();

    assert!(!engine.export_svg(&card, &downloads).await.unwrap());
    assert!(!engine.export_png(&card, &downloads).await.unwrap());
    assert!(!out.path().join("export.svg").exists());
    assert!(!out.path().join("export.png").exists());
}

/// Appends an inline graphic with an external image to every card
struct LogoHighlighter;

impl Highlighter for LogoHighlighter {
    fn highlight(&self, code: &mut Element, _: &str, _: &str) -> codepicture::Result<()> {
        let mut logo = Element::new("svg");
        logo.set_attr("width", "16");
        logo.set_attr("height", "16");
        let mut image = Element::new("image");
        image.set_attr("href", "logo.png");
        logo.children.push(Node::Element(image));
        code.children.push(Node::Element(logo));
        Ok(())
    }
}

/// Holds every fetch until released
struct GatedFetcher {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl ResourceFetcher for GatedFetcher {
    fn fetch<'a>(&'a self, _reference: &'a str) -> BoxFuture<'a, codepicture::Result<Resource>> {
        Box::pin(async move {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Resource::new("image/png", vec![1, 2, 3]))
        })
    }
}

#[tokio::test]
async fn remount_during_svg_capture_discards_the_result() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let fetcher = GatedFetcher {
        entered: entered.clone(),
        release: release.clone(),
    };
    let cfg = EngineConfig {
        load_system_fonts: false,
        ..Default::default()
    };
    let mut engine =
        SnapshotEngine::from_parts(cfg, Arc::new(LogoHighlighter), Arc::new(fetcher)).unwrap();

    let card = engine
        .mount(PresentationParameters::default().with_code("stale"))
        .unwrap();
    let capture = tokio::spawn({
        let card = card.clone();
        async move { card.capture_svg().await }
    });

    entered.notified().await;
    assert!(card.is_attached());
    engine
        .mount(PresentationParameters::default().with_code("fresh"))
        .unwrap();
    release.notify_one();

    assert_eq!(capture.await.unwrap().unwrap(), None);
    assert!(!card.is_attached());
}

#[tokio::test]
async fn svg_capture_waits_for_resources_while_attached() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let fetcher = GatedFetcher {
        entered: entered.clone(),
        release: release.clone(),
    };
    let cfg = EngineConfig {
        load_system_fonts: false,
        ..Default::default()
    };
    let mut engine =
        SnapshotEngine::from_parts(cfg, Arc::new(LogoHighlighter), Arc::new(fetcher)).unwrap();

    let card = engine.mount(PresentationParameters::default()).unwrap();
    let capture = tokio::spawn({
        let card = card.clone();
        async move { card.capture_svg().await }
    });
    entered.notified().await;
    release.notify_one();

    let svg = capture.await.unwrap().unwrap().expect("still attached");
    assert!(svg.contains("href=\"data:image/png;base64,AQID\""));
}
