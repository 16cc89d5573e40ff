use crate::error::{Result, UpdraftError};
use crate::utils::fs as fs_utils;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("updraft/", env!("CARGO_PKG_VERSION"));
const CHUNK_SIZE: usize = 8192;

/// Cooperative cancellation flag shared between a caller and an in-flight
/// download. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Bail out of the current operation if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(UpdraftError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct Downloader;

impl Downloader {
    pub fn new() -> Self {
        Self
    }

    /// Fetch `url` into `dest_dir` and return the path of the completed
    /// file. The body streams into a uniquely named temp file that is
    /// removed on any failure; only a fully transferred, validly named
    /// artifact survives.
    pub fn download_file(
        &self,
        url: &str,
        dest_dir: &Path,
        force_secure: bool,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        fs_utils::ensure_dir_exists(dest_dir)?;
        cancel.check()?;

        log::info!("downloading {}", url);
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            // archives must arrive byte-exact, no transparent decompression
            .no_gzip()
            .https_only(force_secure)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .map_err(|e| UpdraftError::transport(url, &e))?;

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| UpdraftError::transport(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdraftError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Capture header and post-redirect URL before the body is consumed
        let disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let resolved_url = response.url().to_string();

        let mut temp = tempfile::Builder::new()
            .prefix("plugin_")
            .suffix("_download")
            .tempfile_in(dest_dir)?;

        let mut buffer = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            cancel.check()?;
            let read = response.read(&mut buffer).map_err(|e| UpdraftError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            if read == 0 {
                break;
            }
            temp.write_all(&buffer[..read])?;
            total += read as u64;
        }
        temp.flush()?;
        log::debug!("transferred {} bytes from {}", total, url);

        let name = resolve_file_name(disposition.as_deref(), &resolved_url, url);
        if !fs_utils::is_valid_file_name(&name) {
            // temp file cleans itself up on drop
            return Err(UpdraftError::InvalidFileName { name });
        }

        let dest = dest_dir.join(&name);
        temp.persist(&dest).map_err(|e| UpdraftError::Io(e.error))?;
        Ok(dest)
    }
}

/// Pick the artifact's file name: a `filename=` directive from
/// Content-Disposition wins, then the last segment of the post-redirect
/// URL, then the last segment of the URL the caller asked for.
fn resolve_file_name(disposition: Option<&str>, resolved_url: &str, original_url: &str) -> String {
    if let Some(header) = disposition {
        log::debug!("Content-Disposition: {}", header);
        if let Some(name) = file_name_from_disposition(header) {
            return name;
        }
    }

    let name = last_url_segment(resolved_url);
    if name.is_empty() || name.contains('?') {
        return last_url_segment(original_url);
    }
    name
}

fn file_name_from_disposition(header: &str) -> Option<String> {
    const MARKER: &str = "filename=";

    let start = header.find(MARKER)? + MARKER.len();
    let rest = &header[start..];
    let value = match rest.find(';') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some(value.to_string())
}

fn last_url_segment(url: &str) -> String {
    match url.rfind('/') {
        Some(pos) => url[pos + 1..].to_string(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{BufRead, BufReader};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// One-shot HTTP server: answers a single request with the given
    /// response and exits
    fn serve_once(status: &str, extra_headers: &str, body: &[u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
            status,
            body.len(),
            extra_headers
        )
        .into_bytes();
        response.extend_from_slice(body);

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                read_request(&stream);
                let _ = stream.write_all(&response);
            }
        });

        format!("http://{}", addr)
    }

    fn read_request(stream: &TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
    }

    fn dir_entries(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_resolve_name_prefers_content_disposition() {
        let name = resolve_file_name(
            Some("attachment; filename=\"thing-1.0.zip\""),
            "https://mirror.example/pkg/download?x=1",
            "https://host.example/pkg/download?x=1",
        );
        assert_eq!(name, "thing-1.0.zip");
    }

    #[test]
    fn test_resolve_name_truncates_at_semicolon() {
        let name = resolve_file_name(
            Some("attachment; filename=plain.zip; size=120"),
            "https://host.example/any",
            "https://host.example/any",
        );
        assert_eq!(name, "plain.zip");
    }

    #[test]
    fn test_resolve_name_empty_directive_stays_empty() {
        // filename= with no value is used as-is and fails validation later
        let name = resolve_file_name(
            Some("attachment; filename="),
            "https://host.example/files/real.zip",
            "https://host.example/files/real.zip",
        );
        assert_eq!(name, "");
    }

    #[test]
    fn test_resolve_name_from_resolved_url() {
        let name = resolve_file_name(
            None,
            "https://mirror.example/files/sample-2.0.zip",
            "https://host.example/pkg/download?x=1",
        );
        assert_eq!(name, "sample-2.0.zip");
    }

    #[test]
    fn test_resolve_name_falls_back_to_original_url() {
        let name = resolve_file_name(
            None,
            "https://mirror.example/pkg/download?x=1",
            "https://host.example/files/orig-1.0.zip",
        );
        assert_eq!(name, "orig-1.0.zip");

        let name = resolve_file_name(
            None,
            "https://mirror.example/pkg/",
            "https://host.example/files/orig-1.0.zip",
        );
        assert_eq!(name, "orig-1.0.zip");
    }

    #[test]
    fn test_download_uses_server_proposed_name() {
        let base = serve_once(
            "200 OK",
            "Content-Disposition: attachment; filename=\"thing-1.0.zip\"\r\n",
            b"payload-bytes",
        );
        let dir = tempfile::tempdir().unwrap();

        let downloader = Downloader::new();
        let url = format!("{}/pkg/download?x=1", base);
        let saved = downloader
            .download_file(&url, dir.path(), false, &CancelToken::new())
            .unwrap();

        assert_eq!(saved.file_name().unwrap(), "thing-1.0.zip");
        assert_eq!(fs::read(&saved).unwrap(), b"payload-bytes");
        // no temp files left behind
        assert_eq!(dir_entries(dir.path()), vec![saved]);
    }

    #[test]
    fn test_download_names_after_url_without_header() {
        let base = serve_once("200 OK", "", b"zip-bytes");
        let dir = tempfile::tempdir().unwrap();

        let downloader = Downloader::new();
        let url = format!("{}/files/sample-plugin.zip", base);
        let saved = downloader
            .download_file(&url, dir.path(), false, &CancelToken::new())
            .unwrap();

        assert_eq!(saved.file_name().unwrap(), "sample-plugin.zip");
    }

    #[test]
    fn test_download_follows_redirect_for_name() {
        let target = serve_once("200 OK", "", b"real-bytes");
        let location = format!("Location: {}/files/final-3.1.zip\r\n", target);
        let base = serve_once("302 Found", &location, b"");
        let dir = tempfile::tempdir().unwrap();

        let downloader = Downloader::new();
        let url = format!("{}/pkg/download?id=plugin", base);
        let saved = downloader
            .download_file(&url, dir.path(), false, &CancelToken::new())
            .unwrap();

        assert_eq!(saved.file_name().unwrap(), "final-3.1.zip");
        assert_eq!(fs::read(&saved).unwrap(), b"real-bytes");
    }

    #[test]
    fn test_download_error_status_leaves_nothing() {
        let base = serve_once("404 Not Found", "", b"missing");
        let dir = tempfile::tempdir().unwrap();

        let downloader = Downloader::new();
        let url = format!("{}/files/gone.zip", base);
        let result = downloader.download_file(&url, dir.path(), false, &CancelToken::new());

        assert!(matches!(result, Err(UpdraftError::Status { status: 404, .. })));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_download_invalid_name_cleans_up() {
        let base = serve_once(
            "200 OK",
            "Content-Disposition: attachment; filename=\"../evil.zip\"\r\n",
            b"payload",
        );
        let dir = tempfile::tempdir().unwrap();

        let downloader = Downloader::new();
        let url = format!("{}/pkg/download", base);
        let result = downloader.download_file(&url, dir.path(), false, &CancelToken::new());

        assert!(matches!(result, Err(UpdraftError::InvalidFileName { .. })));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_cancelled_before_transfer_makes_no_request() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        // port 9 is never listening; a request here would fail loudly
        let downloader = Downloader::new();
        let result = downloader.download_file("http://127.0.0.1:9/x.zip", dir.path(), false, &cancel);

        assert!(matches!(result, Err(UpdraftError::Cancelled)));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_force_secure_rejects_plain_http() {
        let base = serve_once("200 OK", "", b"never-sent");
        let dir = tempfile::tempdir().unwrap();

        let downloader = Downloader::new();
        let url = format!("{}/files/sample.zip", base);
        let result = downloader.download_file(&url, dir.path(), true, &CancelToken::new());

        assert!(matches!(result, Err(UpdraftError::Transport { .. })));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(UpdraftError::Cancelled)));
    }
}
