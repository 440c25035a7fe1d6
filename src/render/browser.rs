//! Browser provisioning and per-request browser lifetime.
//!
//! A [`BrowserProvisioner`] decides *which* Chrome to start and with which
//! flags; [`BrowserSession`] owns the running process and its CDP event loop
//! until [`BrowserSession::close`] reaps both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BrowserMode, BrowserSettings};
use crate::error::{AppError, Result};

/// Needed to run Chrome in a container without elevated privileges.
pub const SANDBOX_FLAGS: &[&str] = &["--no-sandbox", "--disable-setuid-sandbox"];

/// Flags recommended for the packaged serverless Chromium build.
pub const SERVERLESS_FLAGS: &[&str] = &[
    "--allow-pre-commit-input",
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-component-extensions-with-background-pages",
    "--disable-component-update",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-hang-monitor",
    "--disable-ipc-flooding-protection",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-renderer-backgrounding",
    "--disable-sync",
    "--enable-automation",
    "--export-tagged-pdf",
    "--force-color-profile=srgb",
    "--metrics-recording-only",
    "--no-first-run",
    "--password-store=basic",
    "--use-mock-keychain",
    "--disable-domain-reliability",
    "--disable-print-preview",
    "--disable-speech-api",
    "--disk-cache-size=33554432",
    "--mute-audio",
    "--no-default-browser-check",
    "--no-pings",
    "--single-process",
    "--font-render-hinting=none",
    "--disable-gpu",
    "--use-gl=angle",
    "--use-angle=swiftshader",
    "--no-zygote",
    "--no-sandbox",
];

pub const MANAGED_EXTRA_FLAGS: &[&str] = &["--hide-scrollbars", "--disable-web-security"];

#[cfg(target_os = "linux")]
const SYSTEM_CHROME_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/opt/google/chrome/chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

#[cfg(target_os = "macos")]
const SYSTEM_CHROME_CANDIDATES: &[&str] =
    &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"];

#[cfg(target_os = "windows")]
const SYSTEM_CHROME_CANDIDATES: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const SYSTEM_CHROME_CANDIDATES: &[&str] = &[];

/// Everything needed to start one browser process.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// `None` lets chromiumoxide locate Chrome on its own.
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
}

/// Chooses the browser binary and launch flags for a request.
pub trait BrowserProvisioner: Send + Sync {
    fn name(&self) -> &'static str;

    fn launch_plan(&self) -> Result<LaunchPlan>;
}

/// The always-available local Chrome, sandbox disabled.
#[derive(Debug, Clone, Default)]
pub struct LocalProvisioner {
    pub executable_override: Option<PathBuf>,
}

impl BrowserProvisioner for LocalProvisioner {
    fn name(&self) -> &'static str {
        "local"
    }

    fn launch_plan(&self) -> Result<LaunchPlan> {
        Ok(LaunchPlan {
            executable: self.executable_override.clone(),
            args: to_args(SANDBOX_FLAGS),
        })
    }
}

/// Packaged Chromium in managed deployments, configured or system Chrome elsewhere.
#[derive(Debug, Clone)]
pub struct ManagedProvisioner {
    pub deploy_marker_present: bool,
    pub managed_executable: PathBuf,
    pub executable_override: Option<PathBuf>,
}

impl ManagedProvisioner {
    fn system_chrome() -> Option<PathBuf> {
        SYSTEM_CHROME_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }
}

impl BrowserProvisioner for ManagedProvisioner {
    fn name(&self) -> &'static str {
        "managed"
    }

    fn launch_plan(&self) -> Result<LaunchPlan> {
        if self.deploy_marker_present {
            if !self.managed_executable.exists() {
                return Err(AppError::LaunchError(format!(
                    "Packaged Chromium not found at {}",
                    self.managed_executable.display()
                )));
            }
            let mut args = to_args(SERVERLESS_FLAGS);
            args.extend(to_args(MANAGED_EXTRA_FLAGS));
            return Ok(LaunchPlan {
                executable: Some(self.managed_executable.clone()),
                args,
            });
        }

        let executable = self
            .executable_override
            .clone()
            .or_else(Self::system_chrome)
            .ok_or_else(|| {
                AppError::LaunchError(
                    "No Chrome executable found; set CHROME_EXECUTABLE_PATH".to_string(),
                )
            })?;

        Ok(LaunchPlan {
            executable: Some(executable),
            args: to_args(SANDBOX_FLAGS),
        })
    }
}

fn to_args(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

/// Builds the provisioner selected by configuration.
pub fn provisioner_from_settings(settings: &BrowserSettings) -> Arc<dyn BrowserProvisioner> {
    let managed = match settings.mode {
        BrowserMode::Local => false,
        BrowserMode::Managed => true,
        BrowserMode::Auto => settings.deploy_marker_present,
    };

    if managed {
        Arc::new(ManagedProvisioner {
            deploy_marker_present: settings.deploy_marker_present,
            managed_executable: settings.managed_executable.clone(),
            executable_override: settings.executable_override.clone(),
        })
    } else {
        Arc::new(LocalProvisioner {
            executable_override: settings.executable_override.clone(),
        })
    }
}

/// Fresh, empty Chrome profile; removed from disk when dropped.
pub fn new_profile_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("pdf-generator-profile-")
        .tempdir()
        .map_err(|e| AppError::LaunchError(format!("Failed to create browser profile dir: {}", e)))
}

/// Launch configuration for one browser using its own profile directory.
pub fn browser_config(
    plan: &LaunchPlan,
    window: (u32, u32),
    request_timeout: Duration,
    profile_dir: &Path,
) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .window_size(window.0, window.1)
        .request_timeout(request_timeout)
        .user_data_dir(profile_dir)
        .args(plan.args.iter().cloned());
    if let Some(path) = &plan.executable {
        builder = builder.chrome_executable(path);
    }
    if plan.args.iter().any(|a| a == "--no-sandbox") {
        builder = builder.no_sandbox();
    }
    builder.build().map_err(AppError::LaunchError)
}

/// Polls the CDP handler until the connection ends, returning how many errors it saw.
///
/// Unparsable messages surface as per-message errors; the connection stays usable after them.
pub async fn drive_events<S, E>(events: &mut S) -> usize
where
    S: futures::Stream<Item = std::result::Result<(), E>> + Unpin,
    E: std::fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            warn!("CDP handler error: {}", e);
        }
    }
    errors
}

/// One running browser plus the task that drives its CDP connection.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    // concurrent browsers must not share a profile (SingletonLock, cookies, cache)
    profile_dir: TempDir,
}

impl BrowserSession {
    pub async fn launch(plan: &LaunchPlan, window: (u32, u32), request_timeout: Duration) -> Result<Self> {
        let profile_dir = new_profile_dir()?;
        let config = browser_config(plan, window, request_timeout, profile_dir.path())?;

        debug!(
            executable = ?plan.executable,
            profile = %profile_dir.path().display(),
            args = plan.args.len(),
            "launching browser"
        );
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::LaunchError(e.to_string()))?;

        let handler = tokio::spawn(async move {
            drive_events(&mut handler).await;
        });

        info!("browser launched");
        Ok(Self { browser, handler, profile_dir })
    }

    pub async fn new_page(&self) -> Result<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::RenderError(format!("Failed to open page: {}", e)))
    }

    /// Shuts the browser down and waits for the process to exit.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("graceful browser close failed, killing: {}", e);
            if let Some(Err(e)) = self.browser.kill().await {
                warn!("failed to kill browser: {}", e);
            }
        }
        if let Err(e) = self.browser.wait().await {
            warn!("failed to reap browser process: {}", e);
        }
        self.handler.abort();
        if let Err(e) = self.profile_dir.close() {
            warn!("failed to remove browser profile dir: {}", e);
        }
        debug!("browser closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: BrowserMode, marker: bool) -> BrowserSettings {
        BrowserSettings {
            mode,
            deploy_marker_present: marker,
            executable_override: Some(PathBuf::from("/custom/chrome")),
            managed_executable: PathBuf::from("/definitely/missing/chromium"),
        }
    }

    #[test]
    fn auto_mode_follows_the_marker() {
        assert_eq!(provisioner_from_settings(&settings(BrowserMode::Auto, true)).name(), "managed");
        assert_eq!(provisioner_from_settings(&settings(BrowserMode::Auto, false)).name(), "local");
        assert_eq!(provisioner_from_settings(&settings(BrowserMode::Local, true)).name(), "local");
        assert_eq!(provisioner_from_settings(&settings(BrowserMode::Managed, false)).name(), "managed");
    }

    #[test]
    fn local_plan_disables_the_sandbox() {
        let plan = LocalProvisioner::default().launch_plan().unwrap();
        assert_eq!(plan.executable, None);
        assert_eq!(plan.args, vec!["--no-sandbox", "--disable-setuid-sandbox"]);
    }

    #[test]
    fn managed_without_marker_prefers_the_override() {
        let plan = provisioner_from_settings(&settings(BrowserMode::Managed, false))
            .launch_plan()
            .unwrap();
        assert_eq!(plan.executable, Some(PathBuf::from("/custom/chrome")));
        assert!(plan.args.contains(&"--no-sandbox".to_string()));
    }

    #[test]
    fn managed_with_marker_needs_the_packaged_binary() {
        let err = provisioner_from_settings(&settings(BrowserMode::Managed, true))
            .launch_plan()
            .unwrap_err();
        assert!(matches!(err, AppError::LaunchError(_)));
    }

    #[tokio::test]
    async fn event_loop_survives_message_errors() {
        let mut events = futures::stream::iter(vec![
            Ok(()),
            Err("unknown event"),
            Ok(()),
            Err("bad payload"),
            Ok(()),
        ]);
        assert_eq!(drive_events(&mut events).await, 2);
        // every item was consumed, not just the ones before the first error
        assert!(events.next().await.is_none());
    }

    #[test]
    fn every_session_gets_its_own_profile_dir() {
        let first = new_profile_dir().unwrap();
        let second = new_profile_dir().unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().is_dir() && second.path().is_dir());

        let plan = LocalProvisioner::default().launch_plan().unwrap();
        for dir in [&first, &second] {
            browser_config(&plan, (640, 800), Duration::from_secs(60), dir.path()).unwrap();
        }

        let kept = first.path().to_path_buf();
        first.close().unwrap();
        assert!(!kept.exists());
    }

    #[test]
    fn managed_with_marker_adds_serverless_flags() {
        // any existing file stands in for the packaged binary
        let binary = std::env::current_exe().unwrap();
        let provisioner = ManagedProvisioner {
            deploy_marker_present: true,
            managed_executable: binary.clone(),
            executable_override: None,
        };
        let plan = provisioner.launch_plan().unwrap();
        assert_eq!(plan.executable, Some(binary));
        assert!(plan.args.iter().any(|a| a == "--single-process"));
        assert!(plan.args.iter().any(|a| a == "--hide-scrollbars"));
        assert!(plan.args.iter().any(|a| a == "--disable-web-security"));
    }
}
