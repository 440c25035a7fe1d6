use crate::config::RenderSettings;

/// Largest of the five DOM height metrics, in CSS pixels.
pub const HEIGHT_SCRIPT: &str = r#"(() => {
  const body = document.body;
  const html = document.documentElement;
  return Math.max(
    body ? body.scrollHeight : 0,
    body ? body.offsetHeight : 0,
    html.clientHeight,
    html.scrollHeight,
    html.offsetHeight
  );
})()"#;

/// Page geometry handed to the PDF printer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    pub width_px: u32,
    pub height_px: u32,
    /// Fraction of the content that fits on the page (1.0 when it all does).
    pub fit_scale: f64,
    /// Scale actually sent to the printer.
    pub print_scale: f64,
}

impl PageFit {
    pub fn paper_width_in(&self, settings: &RenderSettings) -> f64 {
        self.width_px as f64 / settings.px_per_in
    }

    pub fn paper_height_in(&self, settings: &RenderSettings) -> f64 {
        self.height_px as f64 / settings.px_per_in
    }
}

/// Rounds the raw DOM height up and adds a one pixel margin.
pub fn measured_height(raw: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1;
    }
    raw.ceil() as u32 + 1
}

/// Desktop pages are never scaled: fixed width, content height.
pub fn desktop_fit(width_px: u32, content_height: u32) -> PageFit {
    PageFit {
        width_px,
        height_px: content_height,
        fit_scale: 1.0,
        print_scale: 1.0,
    }
}

/// Mobile pages are clamped to the maximum page length and scaled to fit.
pub fn mobile_fit(width_px: u32, content_height: u32, settings: &RenderSettings) -> PageFit {
    let max_px = settings.max_page_px();
    let height = content_height as f64;

    let (fit_scale, height_px) = if height > max_px {
        (max_px / height, max_px.round() as u32)
    } else {
        (1.0, content_height)
    };

    PageFit {
        width_px,
        height_px,
        fit_scale,
        print_scale: fit_scale / settings.mobile_shrink_divisor,
    }
}
