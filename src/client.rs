//! Client side of the generator: turns the form fields into one or two
//! `/api/generate` calls and saves each PDF it gets back.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::join_all;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use crate::render::RenderMode;

// Create a static client to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .timeout(Duration::from_secs(180))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTP client")
});

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Please provide at least a URL or Text content.")]
    NothingToGenerate,

    #[error("Web Version: URL must start with http:// or https://")]
    InvalidUrl,

    #[error("Error generating {filename}: {message}")]
    Server { filename: String, message: String },

    #[error("Request for {filename} failed: {source}")]
    Http {
        filename: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not save {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The four fields of the generator form. Empty strings mean "not filled in".
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    pub web_name: String,
    pub web_url: String,
    pub text_name: String,
    pub text_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadJob {
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content: String,
    #[serde(skip)]
    pub filename: String,
}

#[derive(Deserialize)]
struct ServerError {
    error: String,
}

/// Filename from the user's choice or `fallback`, tagged for mobile and ending in `.pdf`.
pub fn output_filename(name: &str, fallback: &str, mode: RenderMode) -> String {
    let trimmed = name.trim();
    let mut filename = if trimmed.is_empty() { fallback.to_string() } else { trimmed.to_string() };
    if mode == RenderMode::Mobile {
        filename.push_str("_mobile");
    }
    if !filename.ends_with(".pdf") {
        filename.push_str(".pdf");
    }
    filename
}

/// One job per populated field: URL first, then text.
pub fn plan_downloads(mode: RenderMode, form: &FormInput) -> Result<Vec<DownloadJob>, ClientError> {
    if form.web_url.is_empty() && form.text_content.is_empty() {
        return Err(ClientError::NothingToGenerate);
    }

    let mut jobs = Vec::with_capacity(2);

    if !form.web_url.is_empty() {
        if !form.web_url.starts_with("http") {
            return Err(ClientError::InvalidUrl);
        }
        jobs.push(DownloadJob {
            mode: mode.as_str(),
            kind: "url",
            content: form.web_url.clone(),
            filename: output_filename(&form.web_name, "web-version", mode),
        });
    }

    if !form.text_content.is_empty() {
        jobs.push(DownloadJob {
            mode: mode.as_str(),
            kind: "text",
            content: form.text_content.clone(),
            filename: output_filename(&form.text_name, "text-version", mode),
        });
    }

    Ok(jobs)
}

/// Target file inside `out_dir`; any directory part of `filename` is dropped.
pub fn save_path(out_dir: &Path, filename: &str) -> PathBuf {
    let name = Path::new(filename)
        .file_name()
        .unwrap_or_else(|| OsStr::new("generated.pdf"));
    out_dir.join(name)
}

/// Requests one PDF and writes it into `out_dir`.
pub async fn download(base_url: &str, job: &DownloadJob, out_dir: &Path) -> Result<PathBuf, ClientError> {
    let endpoint = format!("{}/api/generate", base_url.trim_end_matches('/'));
    let http_err = |source| ClientError::Http { filename: job.filename.clone(), source };

    let response = CLIENT.post(&endpoint).json(job).send().await.map_err(http_err)?;

    if !response.status().is_success() {
        let status = response.status();
        let message = match response.json::<ServerError>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(ClientError::Server { filename: job.filename.clone(), message });
    }

    let bytes = response.bytes().await.map_err(http_err)?;
    let path = save_path(out_dir, &job.filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| ClientError::Io { path: path.clone(), source })?;

    Ok(path)
}

/// Fires every job at once; each outcome is independent of the others.
pub async fn download_all(
    base_url: &str,
    jobs: &[DownloadJob],
    out_dir: &Path,
) -> Vec<Result<PathBuf, ClientError>> {
    join_all(jobs.iter().map(|job| download(base_url, job, out_dir))).await
}
