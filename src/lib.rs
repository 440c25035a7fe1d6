pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod render;
pub mod usage;

use std::sync::Arc;
use config::Config;
use render::{ChromeRenderer, PdfRenderer};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<dyn PdfRenderer>,
}

impl AppState {
    /// State backed by headless Chrome, provisioned per `config.browser`.
    pub fn from_config(config: &Config) -> Self {
        let provisioner = render::browser::provisioner_from_settings(&config.browser);
        let renderer = ChromeRenderer::new(provisioner, config.render.clone());
        Self {
            renderer: Arc::new(renderer),
        }
    }
}
