use crate::constants::{
    API_URL_ENV, API_USERNAME, DEFAULT_API_URL, OUTPUT_PATH, PNG_MIME_TYPE, PROBE_TIMEOUT,
    SHRINK_PATH,
};
use crate::credentials::Credential;
use crate::error::{Result, ShrinkError};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Url;
use serde::Deserialize;
use std::fs::{self, File};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Where the compression service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub host: String,
    pub port: u16,
}

impl ServiceConfig {
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| ShrinkError::InvalidServiceUrl(format!("{}: {}", url, e)))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ShrinkError::InvalidServiceUrl(format!("{}: missing host", url)))?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| ShrinkError::InvalidServiceUrl(format!("{}: unknown port", url)))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            host,
            port,
        })
    }

    /// Default endpoint, overridable through `TINYPNG_API_URL`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::parse(url.trim()),
            _ => Self::parse(DEFAULT_API_URL),
        }
    }

    pub fn shrink_url(&self) -> String {
        format!("{}{}", self.base_url, SHRINK_PATH)
    }

    /// Every result URL handed out by the service starts with this.
    pub fn output_prefix(&self) -> String {
        format!("{}{}", self.base_url, OUTPUT_PATH)
    }
}

/// Outcome of one successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkResult {
    pub url: String,
    pub input_size: Option<u64>,
    pub output_size: Option<u64>,
}

/// The three remote operations the batch workflow needs.
pub trait ShrinkService {
    /// Cheap liveness check run once before any upload.
    fn probe(&self) -> Result<()>;

    /// Upload one PNG and return where its shrunk version can be fetched.
    fn shrink(&self, path: &Path) -> Result<ShrinkResult>;

    /// Fetch `url` into `destination`, returning the number of bytes written.
    fn download(&self, url: &str, destination: &Path) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    input: Option<ImageSummary>,
    output: Option<OutputSummary>,
}

#[derive(Debug, Deserialize)]
struct ImageSummary {
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OutputSummary {
    size: Option<u64>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Recognizes the result URLs handed out by one service instance.
#[derive(Debug, Clone)]
pub struct OutputUrlMatcher {
    prefix: String,
    pattern: Regex,
}

impl OutputUrlMatcher {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let prefix = config.output_prefix();
        let pattern = Regex::new(&format!(r#"{}[^\s"'<>]*?\.png"#, regex::escape(&prefix)))
            .map_err(|e| ShrinkError::InvalidServiceUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self { prefix, pattern })
    }

    fn accepts(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }

    /// First `<base>/output/...png` substring of `text`.
    fn find(&self, text: &str) -> Option<String> {
        self.pattern.find(text).map(|m| m.as_str().to_string())
    }
}

/// Blocking HTTP client for the TinyPNG API.
pub struct TinyPngClient {
    client: Client,
    config: ServiceConfig,
    output_urls: OutputUrlMatcher,
    credential: Credential,
}

impl TinyPngClient {
    pub fn new(config: ServiceConfig, credential: Credential) -> Result<Self> {
        // Uploads and downloads run without a deadline; only the probe is bounded.
        let client = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let output_urls = OutputUrlMatcher::new(&config)?;

        Ok(Self {
            client,
            config,
            output_urls,
            credential,
        })
    }
}

impl ShrinkService for TinyPngClient {
    fn probe(&self) -> Result<()> {
        probe_host(&self.config.host, self.config.port, PROBE_TIMEOUT)
    }

    fn shrink(&self, path: &Path) -> Result<ShrinkResult> {
        let data = fs::read(path)?;

        let response = self
            .client
            .post(self.config.shrink_url())
            .basic_auth(API_USERNAME, Some(self.credential.key()))
            .header(CONTENT_TYPE, PNG_MIME_TYPE)
            .body(data)
            .send()?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text()?;

        if !status.is_success() {
            return Err(ShrinkError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        parse_shrink_response(&self.output_urls, location.as_deref(), &body)
    }

    fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShrinkError::Api {
                status: status.as_u16(),
                message: api_error_message(&response.text().unwrap_or_default()),
            });
        }

        let mut file = File::create(destination)?;
        match response.copy_to(&mut file) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(destination);
                Err(e.into())
            }
        }
    }
}

/// Try a TCP connection to `host:port`, succeeding on the first address
/// that accepts within `timeout`.
pub fn probe_host(host: &str, port: u16, timeout: Duration) -> Result<()> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ShrinkError::ServiceUnreachable(format!("cannot resolve {}: {}", host, e)))?
        .collect();

    let mut last_error = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(_) => return Ok(()),
            Err(e) => last_error = Some(e),
        }
    }

    Err(ShrinkError::ServiceUnreachable(match last_error {
        Some(e) => format!("{}:{}: {}", host, port, e),
        None => format!("no addresses found for {}", host),
    }))
}

/// Pull the result URL and sizes out of a successful shrink response.
///
/// The `Location` header is preferred, then the JSON `output.url` field.
/// Bodies that are not the documented JSON shape are scanned for the first
/// `<base>/output/...png` URL.
pub fn parse_shrink_response(
    output_urls: &OutputUrlMatcher,
    location: Option<&str>,
    body: &str,
) -> Result<ShrinkResult> {
    let parsed = serde_json::from_str::<ShrinkResponse>(body).ok();

    let input_size = parsed
        .as_ref()
        .and_then(|r| r.input.as_ref())
        .and_then(|i| i.size);
    let output_size = parsed
        .as_ref()
        .and_then(|r| r.output.as_ref())
        .and_then(|o| o.size);
    let body_url = parsed
        .as_ref()
        .and_then(|r| r.output.as_ref())
        .and_then(|o| o.url.as_deref());

    let url = location
        .filter(|url| output_urls.accepts(url))
        .or_else(|| body_url.filter(|url| output_urls.accepts(url)))
        .map(str::to_owned)
        .or_else(|| output_urls.find(body))
        .ok_or(ShrinkError::MissingOutputUrl)?;

    Ok(ShrinkResult {
        url,
        input_size,
        output_size,
    })
}

fn api_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        match (parsed.error, parsed.message) {
            (Some(error), Some(message)) => return format!("{}: {}", error, message),
            (Some(text), None) | (None, Some(text)) => return text,
            (None, None) => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}
