use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.tinypng.com";
pub const API_URL_ENV: &str = "TINYPNG_API_URL";

pub const SHRINK_PATH: &str = "/shrink";
pub const OUTPUT_PATH: &str = "/output/";

/// Fixed Basic auth username; the API key is sent as the password.
pub const API_USERNAME: &str = "api";

pub const CREDENTIAL_FILE_NAME: &str = ".tinypng";
#[cfg(unix)]
pub const CREDENTIAL_FILE_MODE: u32 = 0o600;

pub const SHRUNK_PREFIX: &str = "shrunk_";

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub const PNG_MIME_TYPE: &str = "image/png";
/// Enough leading bytes for every signature `image::guess_format` knows.
pub const SNIFF_LENGTH: u64 = 32;

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
