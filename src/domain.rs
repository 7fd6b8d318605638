//! Host extraction shared by classification and capping.

use url::{Host, Url};

/// Normalized host of `url`: lower-cased, punycode for IDNs, one leading
/// `www.` stripped.
/// Returns an empty string when the url has no parseable host.
pub fn host_of(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(u) => u.host_str().map(normalize_host).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Apply the host normalization to a bare domain (e.g. from configuration).
/// Internationalized names become the ASCII form `Url` reports; strings that
/// are not valid hosts are only lower-cased.
pub fn normalize_host(host: &str) -> String {
    let h = host.trim().to_lowercase();
    let h = Host::parse(&h).map(|p| p.to_string()).unwrap_or(h);
    match h.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => h,
    }
}
