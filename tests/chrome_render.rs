//! End-to-end rendering through a real Chrome. Run with `cargo test -- --ignored`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pdf_generator::config::RenderSettings;
use pdf_generator::error::AppError;
use pdf_generator::render::browser::LocalProvisioner;
use pdf_generator::render::{ChromeRenderer, ContentSource, PdfRenderer, RenderJob, RenderMode};

fn renderer(settings: RenderSettings) -> ChromeRenderer {
    let provisioner = LocalProvisioner {
        executable_override: std::env::var("CHROME_EXECUTABLE_PATH").ok().map(Into::into),
    };
    ChromeRenderer::new(Arc::new(provisioner), settings)
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn text_renders_desktop_pdf() {
    let job = RenderJob {
        mode: RenderMode::Desktop,
        source: ContentSource::Text("Visit https://example.com now".into()),
    };
    let pdf = renderer(RenderSettings::default()).render(&job).await.unwrap();

    assert!(pdf.bytes.starts_with(b"%PDF"));
    assert_eq!(pdf.fit.width_px, 640);
    assert_eq!(pdf.fit.print_scale, 1.0);
    assert!(pdf.fit.height_px > 1);
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn long_text_is_clamped_on_mobile() {
    let text = "line\n".repeat(3_000);
    let job = RenderJob {
        mode: RenderMode::Mobile,
        source: ContentSource::Text(text),
    };
    let pdf = renderer(RenderSettings::default()).render(&job).await.unwrap();

    assert!(pdf.bytes.starts_with(b"%PDF"));
    assert_eq!(pdf.fit.width_px, 390);
    assert_eq!(pdf.fit.height_px, 19_104);
    assert!(pdf.fit.fit_scale < 1.0);
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn unreachable_host_fails_without_hanging() {
    let settings = RenderSettings {
        navigation_timeout: Duration::from_secs(10),
        ..RenderSettings::default()
    };
    let job = RenderJob {
        mode: RenderMode::Desktop,
        source: ContentSource::Url("http://unreachable.invalid/".into()),
    };

    let started = Instant::now();
    let err = renderer(settings).render(&job).await.unwrap_err();

    assert!(matches!(err, AppError::NavigationError(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(30));
}
