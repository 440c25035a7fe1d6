use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::render::{ContentSource, RenderJob, RenderMode};

/// Body of `POST /api/generate`. Unknown `mode`/`type` values fall back to desktop/url.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub mode: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content: Option<String>,
}

impl GenerateRequest {
    pub fn mode(&self) -> RenderMode {
        match self.mode.as_deref() {
            Some("mobile") => RenderMode::Mobile,
            _ => RenderMode::Desktop,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind.as_deref() == Some("text")
    }

    pub fn into_job(self) -> Result<RenderJob> {
        let mode = self.mode();
        let is_text = self.is_text();
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .ok_or(AppError::MissingContent)?;

        let source = if is_text {
            ContentSource::Text(content)
        } else {
            ContentSource::Url(content)
        };

        Ok(RenderJob { mode, source })
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
