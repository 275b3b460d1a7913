use std::sync::OnceLock;

use regex::Regex;
use url::Url;

pub fn extract_file_property(script: &str) -> Option<&str> {
    static FILE_PROPERTY_RE: OnceLock<Regex> = OnceLock::new();
    FILE_PROPERTY_RE
        .get_or_init(|| Regex::new(r#"file:\s*['"](?<file>[^'"]+)['"]"#).unwrap())
        .captures(script)
        .and_then(|m| Some(m.name("file")?.as_str()))
}

/// Scheme-relative urls (`//host/path`) take the scheme of `base`.
pub fn to_full_url(url: &str, base: &Url) -> String {
    if url.starts_with("//") {
        format!("{}:{url}", base.scheme())
    } else {
        url.into()
    }
}

/// True for absolute http(s) urls with a host.
pub fn is_absolute_http_url(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}
