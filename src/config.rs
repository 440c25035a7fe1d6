use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

/// Env vars that mark a managed (serverless) deployment when set.
pub const KNOWN_DEPLOY_MARKERS: &[&str] = &["VERCEL", "AWS_LAMBDA_FUNCTION_NAME"];

/// How the browser executable is resolved for each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserMode {
    /// Always launch the local Chrome with the sandbox disabled.
    Local,
    /// Managed deployment resolution with local fallback.
    Managed,
    /// `Managed` when a deployment marker is present, `Local` otherwise.
    Auto,
}

impl FromStr for BrowserMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BrowserMode::Local),
            "managed" => Ok(BrowserMode::Managed),
            "auto" => Ok(BrowserMode::Auto),
            other => Err(AppError::ConfigError(format!("Invalid BROWSER_MODE: {}", other))),
        }
    }
}

/// Read-only rendering constants, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub px_per_in: f64,
    pub max_page_in: f64,
    /// Extra shrink applied to the mobile print scale to keep the bottom edge from clipping.
    pub mobile_shrink_divisor: f64,
    pub desktop_viewport: (u32, u32),
    pub navigation_timeout: Duration,
    pub ready_state_timeout: Duration,
    pub settle_delay: Duration,
}

impl RenderSettings {
    pub fn max_page_px(&self) -> f64 {
        self.max_page_in * self.px_per_in
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            px_per_in: 96.0,
            max_page_in: 199.0,
            mobile_shrink_divisor: 1.05,
            desktop_viewport: (640, 800),
            navigation_timeout: Duration::from_secs(60),
            ready_state_timeout: Duration::from_secs(3),
            settle_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub mode: BrowserMode,
    /// Whether a managed-deployment marker was found at startup.
    pub deploy_marker_present: bool,
    pub executable_override: Option<PathBuf>,
    pub managed_executable: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub browser: BrowserSettings,
    pub render: RenderSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        let mode = match lookup("BROWSER_MODE") {
            Some(raw) => raw.parse()?,
            None => BrowserMode::Auto,
        };

        let custom_marker = lookup("DEPLOY_ENV_MARKER");
        let deploy_marker_present = custom_marker
            .iter()
            .map(String::as_str)
            .chain(KNOWN_DEPLOY_MARKERS.iter().copied())
            .any(|name| lookup(name).is_some_and(|v| !v.is_empty()));

        let executable_override = lookup("CHROME_EXECUTABLE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let managed_executable = lookup("MANAGED_CHROMIUM_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp/chromium"));

        let mut render = RenderSettings::default();
        if let Some(secs) = lookup("NAVIGATION_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| AppError::ConfigError(format!("Invalid NAVIGATION_TIMEOUT_SECS: {}", e)))?;
            render.navigation_timeout = Duration::from_secs(secs);
        }

        Ok(Config {
            server_addr,
            browser: BrowserSettings {
                mode,
                deploy_marker_present,
                executable_override,
                managed_executable,
            },
            render,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.browser.mode, BrowserMode::Auto);
        assert!(!config.browser.deploy_marker_present);
        assert!(config.browser.executable_override.is_none());
        assert_eq!(config.render.navigation_timeout, Duration::from_secs(60));
        assert_eq!(config.render.max_page_px(), 19104.0);
    }

    #[test]
    fn known_and_custom_markers_are_detected() {
        assert!(config_from(&[("VERCEL", "1")]).unwrap().browser.deploy_marker_present);
        assert!(config_from(&[("DEPLOY_ENV_MARKER", "NETLIFY"), ("NETLIFY", "true")])
            .unwrap()
            .browser
            .deploy_marker_present);
        assert!(!config_from(&[("DEPLOY_ENV_MARKER", "NETLIFY")]).unwrap().browser.deploy_marker_present);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(config_from(&[("PORT", "http")]), Err(AppError::ConfigError(_))));
        assert!(matches!(config_from(&[("HOST", "localhost:1")]), Err(AppError::ConfigError(_))));
        assert!(matches!(config_from(&[("BROWSER_MODE", "cloud")]), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("BROWSER_MODE", "Managed"),
            ("CHROME_EXECUTABLE_PATH", "/opt/chrome/chrome"),
            ("NAVIGATION_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.browser.mode, BrowserMode::Managed);
        assert_eq!(config.browser.executable_override, Some(PathBuf::from("/opt/chrome/chrome")));
        assert_eq!(config.render.navigation_timeout, Duration::from_secs(5));
    }
}
