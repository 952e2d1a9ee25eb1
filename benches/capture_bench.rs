use criterion::{criterion_group, criterion_main, Criterion};

use codepicture::{EngineConfig, PresentationParameters};

const SAMPLE: &str = r#"public class Main {
    public static void main(String[] args) {
        for (int i = 0; i < 10; i++) {
            System.out.println("Hello " + i);
        }
    }
}
"#;

fn engine() -> codepicture::SnapshotEngine {
    let cfg = EngineConfig {
        load_system_fonts: false,
        ..Default::default()
    };
    codepicture::new_engine(cfg).expect("failed to create engine")
}

fn bench_mount(c: &mut Criterion) {
    let mut engine = engine();
    let params = PresentationParameters::default().with_code(SAMPLE);
    c.bench_function("mount_and_highlight", |b| {
        b.iter(|| engine.mount(params.clone()).unwrap())
    });
}

fn bench_captures(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut engine = engine();
    let card = engine
        .mount(PresentationParameters::default().with_code(SAMPLE))
        .expect("mount failed");

    c.bench_function("capture_svg", |b| {
        b.iter(|| rt.block_on(card.capture_svg()).unwrap())
    });

    c.bench_function("capture_png", |b| {
        b.iter(|| {
            let url = rt.block_on(card.capture_png()).unwrap().unwrap();
            engine.blob_store().revoke(&url);
        })
    });
}

criterion_group!(benches, bench_mount, bench_captures);
criterion_main!(benches);
