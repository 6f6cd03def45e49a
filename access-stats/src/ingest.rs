use std::{
    io,
    path::{Path, PathBuf},
    string::FromUtf8Error,
    time::Duration,
};

use tokio::fs;
use tracing::{info, warn};
use tryhard::{RetryFutureConfig, retry_fn};

const FETCH_ATTEMPTS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("log file {} does not exist and no source URL was given", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to access log file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch access log from {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("access log from {url} is not valid UTF-8")]
    Decode {
        url: String,
        #[source]
        source: FromUtf8Error,
    },
}

/// Returns the log text from `cache`, downloading it from `url` into `cache`
/// first when the file does not exist yet.
///
/// Line endings are normalized to `\n` either way.
pub async fn load_or_fetch(cache: &Path, url: Option<&str>) -> Result<String, IngestError> {
    match fs::read_to_string(cache).await {
        Ok(text) => {
            info!(path = %cache.display(), "using cached access log");
            Ok(normalize_newlines(text))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let url = url.ok_or_else(|| IngestError::MissingSource(cache.to_path_buf()))?;
            let text = fetch(url).await?;
            fs::write(cache, &text).await.map_err(|source| IngestError::Io {
                path: cache.to_path_buf(),
                source,
            })?;
            info!(path = %cache.display(), bytes = text.len(), "cached access log");
            Ok(text)
        }
        Err(source) => Err(IngestError::Io {
            path: cache.to_path_buf(),
            source,
        }),
    }
}

async fn fetch(url: &str) -> Result<String, IngestError> {
    let config = RetryFutureConfig::new(FETCH_ATTEMPTS)
        .exponential_backoff(Duration::from_millis(100))
        .max_delay(Duration::from_secs(5));
    let body = retry_fn(|| fetch_once(url))
        .with_config(config)
        .await
        .and_then(|rejected| rejected)
        .map_err(|source| IngestError::Fetch {
            url: url.to_owned(),
            source,
        })?;
    let text = String::from_utf8(body).map_err(|source| IngestError::Decode {
        url: url.to_owned(),
        source,
    })?;
    Ok(normalize_newlines(text))
}

// The outer error is retried; a 4xx comes back as `Ok(Err(..))` so the
// retry loop stops on it.
async fn fetch_once(url: &str) -> Result<Result<Vec<u8>, reqwest::Error>, reqwest::Error> {
    info!(url, "fetching access log");
    match reqwest::get(url).await?.error_for_status() {
        Ok(response) => Ok(Ok(response.bytes().await?.to_vec())),
        Err(e) if e.status().is_some_and(|s| s.is_client_error()) => {
            warn!(url, status = ?e.status(), "access log request rejected");
            Ok(Err(e))
        }
        Err(e) => Err(e),
    }
}

fn normalize_newlines(text: String) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asserting::prelude::*;
    use axum::{Router, http::StatusCode, routing::get};
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Instant,
    };
    use tokio::net::TcpListener;

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(normalize_newlines("a\r\nb\r\n".into()), "a\nb\n");
        assert_eq!(normalize_newlines("a\nb".into()), "a\nb");
    }

    #[tokio::test]
    async fn reads_existing_cache_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("access_log");
        std::fs::write(&cache, "one\r\ntwo\r\n").unwrap();

        let text = load_or_fetch(&cache, None).await.unwrap();
        assert_that!(text).is_equal_to("one\ntwo\n".to_string());
    }

    async fn serve_status_sequence(statuses: Vec<StatusCode>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/http_access_log",
            get(move || {
                let hit = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses.get(hit).copied().unwrap_or(StatusCode::OK);
                async move { (status, "a - - [01/Jan/2021:00:00:00 +0000] \"GET /\" 200 1\r\n") }
            }),
        );
        let port = portpicker::pick_unused_port().expect("No free ports available");
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://127.0.0.1:{port}/http_access_log"), hits)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn client_errors_are_not_retried() {
        let (url, hits) = serve_status_sequence(vec![StatusCode::NOT_FOUND; 10]).await;
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("http_access_log");

        let started = Instant::now();
        let err = load_or_fetch(&cache, Some(&url)).await.unwrap_err();
        assert!(matches!(err, IngestError::Fetch { .. }), "{err:?}");
        assert_that!(hits.load(Ordering::SeqCst)).is_equal_to(1);
        assert_that!(started.elapsed() < Duration::from_secs(2)).is_true();
        assert_that!(cache.exists()).is_false();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn server_errors_are_retried() {
        let (url, hits) = serve_status_sequence(vec![StatusCode::SERVICE_UNAVAILABLE]).await;
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("http_access_log");

        let text = load_or_fetch(&cache, Some(&url)).await.unwrap();
        assert_eq!(text, "a - - [01/Jan/2021:00:00:00 +0000] \"GET /\" 200 1\n");
        assert_that!(hits.load(Ordering::SeqCst)).is_equal_to(2);
        assert_eq!(std::fs::read_to_string(&cache).unwrap(), text);
    }

    #[tokio::test]
    async fn missing_cache_without_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("absent");

        let err = load_or_fetch(&cache, None).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingSource(ref path) if *path == cache));
        assert_that!(cache.exists()).is_false();
    }
}
