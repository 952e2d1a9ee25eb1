//! Fetching external resources referenced from SVG documents

use std::path::PathBuf;

use base64::Engine as _;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::{EngineConfig, Error, Result};

/// A fetched resource, ready to be embedded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Resource {
    pub fn new(mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Resolves a reference (URL or path) to its contents
pub trait ResourceFetcher: Send + Sync {
    fn fetch<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<Resource>>;
}

/// Default fetcher: `data:` URLs, local files and, with the `http` feature,
/// `http(s)` URLs. Relative references resolve against `resource_base`.
pub struct DefaultFetcher {
    base: Option<String>,
    #[cfg(feature = "http")]
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        #[cfg(feature = "http")]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base: config.resource_base.clone(),
            #[cfg(feature = "http")]
            client,
        })
    }

    async fn fetch_reference(&self, reference: &str) -> Result<Resource> {
        if reference.starts_with("data:") {
            return decode_data_url(reference);
        }
        match self.resolve(reference)? {
            Target::Remote(url) => self.fetch_remote(&url).await,
            Target::File(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::resource(reference, e))?;
                Ok(Resource::new(guess_mime(&path.to_string_lossy()), bytes))
            }
        }
    }

    #[cfg(feature = "http")]
    async fn fetch_remote(&self, url: &str) -> Result<Resource> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::NetworkError(format!("Failed to fetch {}: {}", url, e)))?;
        if !resp.status().is_success() {
            return Err(Error::resource(url, format!("HTTP status {}", resp.status())));
        }
        let mime = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| guess_mime(url).to_string());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::NetworkError(format!("Failed to read {}: {}", url, e)))?;
        Ok(Resource::new(mime, bytes.to_vec()))
    }

    #[cfg(not(feature = "http"))]
    async fn fetch_remote(&self, url: &str) -> Result<Resource> {
        Err(Error::resource(url, "remote fetching requires the `http` feature"))
    }

    #[cfg(feature = "http")]
    fn resolve(&self, reference: &str) -> Result<Target> {
        let parsed = match url::Url::parse(reference) {
            Ok(u) => u,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
                Some(base) => url::Url::parse(base)
                    .and_then(|b| b.join(reference))
                    .map_err(|e| Error::resource(reference, e))?,
                None => return Ok(Target::File(PathBuf::from(reference))),
            },
            Err(e) => return Err(Error::resource(reference, e)),
        };
        match parsed.scheme() {
            "http" | "https" => Ok(Target::Remote(parsed.to_string())),
            "file" => parsed
                .to_file_path()
                .map(Target::File)
                .map_err(|_| Error::resource(reference, "invalid file URL")),
            other => Err(Error::resource(reference, format!("unsupported scheme `{}`", other))),
        }
    }

    #[cfg(not(feature = "http"))]
    fn resolve(&self, reference: &str) -> Result<Target> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(Target::Remote(reference.to_string()));
        }
        if let Some(path) = reference.strip_prefix("file://") {
            return Ok(Target::File(PathBuf::from(path)));
        }
        Ok(match &self.base {
            Some(base) => Target::File(PathBuf::from(base.trim_start_matches("file://")).join(reference)),
            None => Target::File(PathBuf::from(reference)),
        })
    }
}

enum Target {
    Remote(String),
    File(PathBuf),
}

impl ResourceFetcher for DefaultFetcher {
    fn fetch<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<Resource>> {
        self.fetch_reference(reference).boxed()
    }
}

/// Decode a `data:` URL (base64 or plain payload)
pub fn decode_data_url(url: &str) -> Result<Resource> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::resource(url, "not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::resource(url, "missing data URL payload"))?;
    let is_base64 = meta.ends_with(";base64");
    let mime = meta.trim_end_matches(";base64").split(';').next().unwrap_or("");
    let mime = if mime.is_empty() { "text/plain" } else { mime };
    let bytes = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::resource(url, e))?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok(Resource::new(mime, bytes))
}

/// Mime type from a file extension
pub fn guess_mime(reference: &str) -> &'static str {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let ext = path
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "css" => "text/css",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    }
}
