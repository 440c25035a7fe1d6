pub mod browser;
pub mod content;
pub mod device;
pub mod layout;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, PrintToPdfParams, SetLifecycleEventsEnabledParams,
};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::RenderSettings;
use crate::error::{AppError, Result};
use browser::{BrowserProvisioner, BrowserSession};
use device::{DeviceProfile, IPHONE_13};
use layout::PageFit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Desktop,
    Mobile,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Desktop => "desktop",
            RenderMode::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Url(String),
    Text(String),
}

impl ContentSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentSource::Url(_) => "url",
            ContentSource::Text(_) => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub mode: RenderMode,
    pub source: ContentSource,
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub fit: PageFit,
}

/// Turns a [`RenderJob`] into PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, job: &RenderJob) -> Result<RenderedPdf>;
}

/// Renders with a fresh headless Chrome per job.
pub struct ChromeRenderer {
    provisioner: Arc<dyn BrowserProvisioner>,
    settings: RenderSettings,
}

impl ChromeRenderer {
    pub fn new(provisioner: Arc<dyn BrowserProvisioner>, settings: RenderSettings) -> Self {
        Self { provisioner, settings }
    }

    fn profile(&self, mode: RenderMode) -> DeviceProfile {
        match mode {
            RenderMode::Desktop => {
                let (width, height) = self.settings.desktop_viewport;
                DeviceProfile::desktop(width, height)
            }
            RenderMode::Mobile => IPHONE_13,
        }
    }

    async fn render_page(&self, session: &BrowserSession, job: &RenderJob) -> Result<RenderedPdf> {
        let page = session.new_page().await?;
        let profile = self.profile(job.mode);
        profile.apply(&page).await?;

        self.load_content(&page, &job.source).await?;
        prepare_for_print(&page).await?;
        self.wait_for_render_settled(&page).await;

        let raw: f64 = evaluate(&page, layout::HEIGHT_SCRIPT).await?;
        let height = layout::measured_height(raw);

        let fit = match job.mode {
            RenderMode::Desktop => layout::desktop_fit(profile.width, height),
            RenderMode::Mobile => layout::mobile_fit(profile.width, height, &self.settings),
        };
        debug!(content_height = height, ?fit, "page measured");

        let bytes = page.pdf(print_params(&fit, &self.settings)).await?;
        Ok(RenderedPdf { bytes, fit })
    }

    async fn load_content(&self, page: &Page, source: &ContentSource) -> Result<()> {
        match source {
            ContentSource::Text(text) => {
                page.set_content(content::text_document(text)).await?;
                Ok(())
            }
            ContentSource::Url(url) => {
                let timeout = self.settings.navigation_timeout;
                tokio::time::timeout(timeout, navigate_until_idle(page, url))
                    .await
                    .map_err(|_| {
                        AppError::NavigationError(format!(
                            "Navigation timeout of {} ms exceeded for {}",
                            timeout.as_millis(),
                            url
                        ))
                    })?
            }
        }
    }

    /// Best effort: a slow `readyState` is tolerated, the fixed delay is not skipped.
    async fn wait_for_render_settled(&self, page: &Page) {
        match tokio::time::timeout(self.settings.ready_state_timeout, wait_until_complete(page)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("readyState check failed: {}", e),
            Err(_) => debug!("document not complete after {:?}", self.settings.ready_state_timeout),
        }

        tokio::time::sleep(self.settings.settle_delay).await;
    }
}

/// Single zero-margin page sized to `fit`, backgrounds included.
pub fn print_params(fit: &PageFit, settings: &RenderSettings) -> PrintToPdfParams {
    PrintToPdfParams {
        print_background: Some(true),
        paper_width: Some(fit.paper_width_in(settings)),
        paper_height: Some(fit.paper_height_in(settings)),
        scale: Some(fit.print_scale),
        margin_top: Some(0.0),
        margin_bottom: Some(0.0),
        margin_left: Some(0.0),
        margin_right: Some(0.0),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

#[async_trait]
impl PdfRenderer for ChromeRenderer {
    async fn render(&self, job: &RenderJob) -> Result<RenderedPdf> {
        let plan = self.provisioner.launch_plan()?;
        let window = match job.mode {
            RenderMode::Desktop => self.settings.desktop_viewport,
            RenderMode::Mobile => (IPHONE_13.width, IPHONE_13.height),
        };
        let session = BrowserSession::launch(&plan, window, self.settings.navigation_timeout).await?;

        let result = self.render_page(&session, job).await;
        session.close().await;

        if let Ok(pdf) = &result {
            info!(
                provisioner = self.provisioner.name(),
                mode = job.mode.as_str(),
                width = pdf.fit.width_px,
                height = pdf.fit.height_px,
                scale = pdf.fit.print_scale,
                "pdf rendered"
            );
        }
        result
    }
}

async fn evaluate<T: DeserializeOwned>(page: &Page, expression: &str) -> Result<T> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .return_by_value(true)
        .await_promise(true)
        .build()
        .map_err(AppError::RenderError)?;

    page.evaluate_expression(params)
        .await?
        .into_value()
        .map_err(|e| AppError::RenderError(format!("Unexpected value from `{}`: {}", expression, e)))
}

async fn wait_until_complete(page: &Page) -> Result<()> {
    loop {
        let state: String = evaluate(page, "document.readyState").await?;
        if state == "complete" {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn prepare_for_print(page: &Page) -> Result<()> {
    let _: bool = evaluate(page, &content::print_style_script()).await?;
    Ok(())
}

/// Navigates and waits for the `networkIdle` lifecycle event of that navigation.
async fn navigate_until_idle(page: &Page, url: &str) -> Result<()> {
    page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
    let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

    let navigation = page
        .execute(NavigateParams::new(url))
        .await
        .map_err(|e| AppError::NavigationError(e.to_string()))?
        .result;

    if let Some(error) = navigation.error_text {
        return Err(AppError::NavigationError(format!("{} at {}", error, url)));
    }

    while let Some(event) = lifecycle.next().await {
        let same_document = navigation
            .loader_id
            .as_ref()
            .map_or(true, |loader| *loader == event.loader_id);
        if event.frame_id == navigation.frame_id && same_document && event.name == "networkIdle" {
            debug!(url, "network idle");
            return Ok(());
        }
    }

    Err(AppError::NavigationError(format!("Page closed while loading {}", url)))
}
