//! Downloads of the embeddable distribution and the pip bootstrap script.

use crate::config::{embeddable_file_name, Endpoints};
use crate::error::{EmbedError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::StatusCode;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory (relative to the working directory) archives are cached in.
pub const DEFAULT_CACHE_DIR: &str = "embeddable_packages";

/// File name of the pip bootstrap script inside the environment.
pub const GET_PIP_FILE_NAME: &str = "get-pip.py";

const CHUNK_SIZE: usize = 1024;

/// Blocking HTTP client bound to a set of endpoints.
pub struct Downloader {
    client: Client,
    endpoints: Endpoints,
}

impl Downloader {
    /// Create a downloader. Requests never time out.
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("embedpy/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self { client, endpoints })
    }

    /// Download the embeddable archive for `version` into `cache_dir`.
    ///
    /// Any existing archive at the target path is overwritten. The HTTP
    /// status is not inspected: whatever body the server returns is written.
    pub fn download_embeddable(&self, version: &str, cache_dir: &Path) -> Result<PathBuf> {
        let url = self.endpoints.embeddable_url(version);
        let file_name = embeddable_file_name(version);

        fs::create_dir_all(cache_dir)?;

        tracing::info!("GET {}", url);
        let mut response = self.client.get(&url).send()?;
        tracing::debug!("{} responded with {}", url, response.status());

        let total = content_length(response.headers(), &url)?;
        let file_path = cache_dir.join(&file_name);
        let mut file = File::create(&file_path)?;

        let progress = ProgressBar::new(total);
        progress.set_style(
            ProgressStyle::with_template("{msg} {wide_bar} {bytes}/{total_bytes} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(format!("Downloading [{}]", file_name));

        let mut buffer = [0u8; CHUNK_SIZE];
        loop {
            let read = response.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])?;
            progress.inc(read as u64);
        }
        file.flush()?;
        progress.finish();

        println!(
            "Downloaded Python embeddable package for version {}",
            version
        );
        Ok(file_path)
    }

    /// Download the pip bootstrap script into `dest_dir`.
    ///
    /// A non-200 response is reported on stdout and yields `Ok(None)`.
    pub fn download_get_pip(&self, dest_dir: &Path) -> Result<Option<PathBuf>> {
        let url = &self.endpoints.get_pip_url;

        tracing::info!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status();

        if status != StatusCode::OK {
            println!(
                "Failed to download get-pip.py. Status code: {}",
                status.as_u16()
            );
            return Ok(None);
        }

        let body = response.bytes()?;
        let path = dest_dir.join(GET_PIP_FILE_NAME);
        fs::write(&path, &body)?;
        println!("get-pip.py downloaded successfully.");

        Ok(Some(path))
    }
}

/// Declared body length from `headers`. A missing or malformed header is an error.
fn content_length(headers: &HeaderMap, url: &str) -> Result<u64> {
    let header = headers
        .get(CONTENT_LENGTH)
        .ok_or_else(|| EmbedError::MissingContentLength {
            url: url.to_string(),
        })?;

    let value = String::from_utf8_lossy(header.as_bytes()).into_owned();
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| EmbedError::InvalidContentLength {
            url: url.to_string(),
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use reqwest::header::HeaderValue;
    use std::io::BufRead;
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Serve one request with a raw response that carries no Content-Length.
    fn serve_without_content_length() -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/python", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = std::io::BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let mut stream = stream;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nzipbytes")
                .unwrap();
        });
        (base, handle)
    }

    fn endpoints_for(server: &Server) -> Endpoints {
        Endpoints {
            python_mirror: server.url_str("/python"),
            get_pip_url: server.url_str("/get-pip.py"),
            ..Endpoints::default()
        }
    }

    #[test]
    fn test_download_embeddable_writes_body() {
        let server = Server::run();
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        server.expect(
            Expectation::matching(request::method_path(
                "GET",
                "/python/3.10.4/python-3.10.4-embed-amd64.zip",
            ))
            .respond_with(status_code(200).body(body.clone())),
        );

        let temp = TempDir::new().unwrap();
        let cache = temp.path().join(DEFAULT_CACHE_DIR);
        let downloader = Downloader::new(endpoints_for(&server)).unwrap();

        let path = downloader.download_embeddable("3.10.4", &cache).unwrap();

        assert_eq!(path, cache.join("python-3.10.4-embed-amd64.zip"));
        assert_eq!(fs::metadata(&path).unwrap().len(), body.len() as u64);
        assert_eq!(fs::read(&path).unwrap(), body);
    }

    #[test]
    fn test_download_embeddable_overwrites_existing_file() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "GET",
                "/python/3.11.0/python-3.11.0-embed-amd64.zip",
            ))
            .respond_with(status_code(200).body("fresh")),
        );

        let temp = TempDir::new().unwrap();
        let cache = temp.path().join(DEFAULT_CACHE_DIR);
        fs::create_dir_all(&cache).unwrap();
        fs::write(
            cache.join("python-3.11.0-embed-amd64.zip"),
            "a much longer stale archive",
        )
        .unwrap();

        let downloader = Downloader::new(endpoints_for(&server)).unwrap();
        let path = downloader.download_embeddable("3.11.0", &cache).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "fresh");
    }

    #[test]
    fn test_download_embeddable_ignores_status() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "GET",
                "/python/9.9.9/python-9.9.9-embed-amd64.zip",
            ))
            .respond_with(status_code(404).body("not found")),
        );

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(endpoints_for(&server)).unwrap();
        let path = downloader
            .download_embeddable("9.9.9", temp.path())
            .unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "not found");
    }

    #[test]
    fn test_download_get_pip() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/get-pip.py"))
                .respond_with(status_code(200).body("print('bootstrap')\n")),
        );

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(endpoints_for(&server)).unwrap();
        let path = downloader.download_get_pip(temp.path()).unwrap().unwrap();

        assert_eq!(path, temp.path().join(GET_PIP_FILE_NAME));
        assert_eq!(fs::read_to_string(path).unwrap(), "print('bootstrap')\n");
    }

    #[test]
    fn test_download_get_pip_non_200_is_reported_not_raised() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/get-pip.py"))
                .respond_with(status_code(503)),
        );

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(endpoints_for(&server)).unwrap();
        let result = downloader.download_get_pip(temp.path()).unwrap();

        assert!(result.is_none());
        assert!(!temp.path().join(GET_PIP_FILE_NAME).exists());
    }

    #[test]
    fn test_download_embeddable_requires_content_length() {
        let (base, server) = serve_without_content_length();
        let endpoints = Endpoints {
            python_mirror: base,
            ..Endpoints::default()
        };

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(endpoints).unwrap();
        let err = downloader
            .download_embeddable("3.10.4", temp.path())
            .unwrap_err();
        server.join().unwrap();

        match err {
            EmbedError::MissingContentLength { url } => {
                assert!(url.ends_with("/python/3.10.4/python-3.10.4-embed-amd64.zip"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!temp.path().join("python-3.10.4-embed-amd64.zip").exists());
    }

    #[test]
    fn test_content_length_parsing() {
        let url = "http://localhost/python-3.10.4-embed-amd64.zip";
        let mut headers = HeaderMap::new();

        assert!(matches!(
            content_length(&headers, url),
            Err(EmbedError::MissingContentLength { .. })
        ));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("8742"));
        assert_eq!(content_length(&headers, url).unwrap(), 8742);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        match content_length(&headers, url) {
            Err(EmbedError::InvalidContentLength { value, .. }) => assert_eq!(value, "lots"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
