//! Binary downloads and filename recovery from `Content-Disposition`.

use std::sync::LazyLock;

use regex::Regex;

/// Filename used when the response does not name the file.
pub const DEFAULT_FILENAME: &str = "download";

static EXTENDED_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)filename\*=UTF-8''([^;]+)").expect("valid regex"));

static PLAIN_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)filename="?([^";]+)"?"#).expect("valid regex"));

/// A downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Recover a filename from a `Content-Disposition` header value.
///
/// `filename*=UTF-8''...` wins over `filename="..."` regardless of order,
/// unless it names nothing.
/// The name is trimmed and percent-decoded; undecodable names are kept as-is.
pub fn filename_from_disposition(header: Option<&str>) -> String {
    let header = header.unwrap_or("");
    let raw = [&*EXTENDED_FILENAME, &*PLAIN_FILENAME]
        .into_iter()
        .find_map(|pattern| {
            let name = pattern.captures(header)?.get(1)?.as_str().trim();
            (!name.is_empty()).then_some(name)
        })
        .unwrap_or(DEFAULT_FILENAME);

    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(_) => raw.to_string(),
    }
}
