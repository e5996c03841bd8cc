//! Fetching `plantuml.jar` into the application's PlantUML directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::{AppConfig, AppPaths};
use crate::errors::AppError;

/// Release the application is tested against.
pub const PLANTUML_DOWNLOAD_URL: &str =
    "https://github.com/plantuml/plantuml/releases/download/v1.2025.3/plantuml-1.2025.3.jar";

const JAR_NAME: &str = "plantuml.jar";
const PARTIAL_NAME: &str = "plantuml.jar.part";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download of {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// HTTP client used for jar downloads.
///
/// # Errors
/// Returns `DownloadError::Http` if the TLS backend cannot be initialized.
pub fn http_client() -> Result<reqwest::Client, DownloadError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

/// Downloads the jar at `url` to `plantuml_dir/plantuml.jar`.
///
/// `on_progress` receives the bytes received so far and the total size when
/// the server reports one. The body goes to a partial file first; only after
/// it is complete are other `.jar` files in the directory removed and the
/// partial file moved into place. A failed download leaves an existing jar
/// untouched.
///
/// # Errors
/// Returns `DownloadError` on a connection failure, a non-success status, or
/// a filesystem error.
pub async fn download_jar<F>(
    client: &reqwest::Client,
    url: &str,
    plantuml_dir: &Path,
    mut on_progress: F,
) -> Result<PathBuf, DownloadError>
where
    F: FnMut(u64, Option<u64>),
{
    tokio::fs::create_dir_all(plantuml_dir)
        .await
        .map_err(io_error(plantuml_dir))?;

    tracing::info!(event = "jar_download_started", url, "jar_download_started");
    let mut response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total = response.content_length();
    let partial = plantuml_dir.join(PARTIAL_NAME);
    let mut file = tokio::fs::File::create(&partial)
        .await
        .map_err(io_error(&partial))?;

    let mut received = 0u64;
    on_progress(received, total);
    let written: Result<(), DownloadError> = async {
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.map_err(io_error(&partial))?;
            received += chunk.len() as u64;
            on_progress(received, total);
        }
        file.flush().await.map_err(io_error(&partial))
    }
    .await;
    drop(file);

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    remove_stale_jars(plantuml_dir).await?;
    let jar = plantuml_dir.join(JAR_NAME);
    tokio::fs::rename(&partial, &jar)
        .await
        .map_err(io_error(&jar))?;

    tracing::info!(event = "jar_download_finished", path = %jar.display(), bytes = received, "jar_download_finished");
    Ok(jar)
}

/// Downloads the jar into `paths.plantuml_dir` and records it as `jar_path`
/// in the configuration file.
///
/// # Errors
/// Returns `AppError::Download` if the download fails, or an I/O error if the
/// configuration cannot be saved.
pub async fn fetch_jar<F>(
    client: &reqwest::Client,
    url: &str,
    config: &mut AppConfig,
    paths: &AppPaths,
    on_progress: F,
) -> Result<PathBuf, AppError>
where
    F: FnMut(u64, Option<u64>),
{
    let jar = download_jar(client, url, &paths.plantuml_dir, on_progress).await?;
    config.jar_path = Some(jar.clone());
    config.save(&paths.config_file)?;
    Ok(jar)
}

async fn remove_stale_jars(dir: &Path) -> Result<(), DownloadError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error(dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "jar") && path.is_file() {
            tokio::fs::remove_file(&path).await.map_err(io_error(&path))?;
        }
    }
    Ok(())
}
