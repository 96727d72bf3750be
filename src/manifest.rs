//! Remote update manifest (Magisk `stable.json`) fetch and permissive decode.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// The one manifest component we list, and its display title.
const COMPONENT: &str = "magisk";
const TITLE: &str = "Magisk Stable";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    pub title: String,
    pub version: String,
    pub version_code: String,
    pub download_link: String,
    pub note: String,
}

/// Decode a manifest body. Only malformed JSON is an error; a missing or
/// non-object `magisk` key yields no records and missing fields become `""`.
pub fn decode(body: &str) -> Result<Vec<UpdateRecord>, serde_json::Error> {
    let json: Value = serde_json::from_str(body)?;

    let Some(component) = json.get(COMPONENT).and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    let field = |name: &str| -> String {
        match component.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    };

    Ok(vec![UpdateRecord {
        title: TITLE.to_string(),
        version: field("version"),
        version_code: field("versionCode"),
        download_link: field("link"),
        note: field("note"),
    }])
}

#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    url: String,
}

impl ManifestFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// One blocking GET. Any failure yields an empty list.
    pub fn fetch(&self, deadline: Option<Duration>) -> Vec<UpdateRecord> {
        match self.try_fetch(deadline) {
            Ok(records) => {
                info!(url = %self.url, count = records.len(), "fetched update manifest");
                records
            }
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(url = %self.url, %error, "manifest fetch failed");
                Vec::new()
            }
        }
    }

    fn try_fetch(&self, deadline: Option<Duration>) -> Result<Vec<UpdateRecord>> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = deadline {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building HTTP client")?;

        let body = client
            .get(&self.url)
            .send()
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()
            .with_context(|| format!("{} returned error status", self.url))?
            .text()
            .with_context(|| format!("reading body from {}", self.url))?;

        decode(&body).with_context(|| format!("parsing manifest from {}", self.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn decodes_primary_release() {
        let body = r#"{"magisk": {"version": "27.0", "versionCode": "27000", "link": "https://x", "note": ""}}"#;
        let records = decode(body).unwrap();
        assert_eq!(
            records,
            vec![UpdateRecord {
                title: "Magisk Stable".into(),
                version: "27.0".into(),
                version_code: "27000".into(),
                download_link: "https://x".into(),
                note: String::new(),
            }]
        );
    }

    #[test]
    fn missing_component_is_empty_not_error() {
        assert!(decode(r#"{"other": {"version": "1"}}"#).unwrap().is_empty());
        assert!(decode("[]").unwrap().is_empty());
    }

    #[test]
    fn absent_and_non_string_fields_are_permissive() {
        let body = r#"{
            "magisk": {"version": "27.0", "versionCode": 27000, "note": null},
            "stub": {"versionCode": "40", "link": "https://stub"}
        }"#;
        let records = decode(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Magisk Stable");
        assert_eq!(records[0].version_code, "27000");
        assert_eq!(records[0].download_link, "");
        assert_eq!(records[0].note, "");
    }

    #[test]
    fn other_components_alone_yield_nothing() {
        let body = r#"{"stub": {"versionCode": "40", "link": "https://stub"}}"#;
        assert!(decode(body).unwrap().is_empty());
    }

    #[test]
    fn non_object_primary_component_yields_nothing() {
        let records = decode(r#"{"magisk": "27.0", "stub": {"versionCode": "1"}}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(decode("{not json").is_err());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(UpdateRecord::default()).unwrap();
        assert!(json.get("versionCode").is_some());
        assert!(json.get("downloadLink").is_some());
    }

    /// Serve one canned HTTP response on a local port.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/stable.json", addr)
    }

    #[test]
    fn fetch_decodes_served_manifest() {
        let url = serve_once(
            "200 OK",
            r#"{"magisk": {"version": "27.0", "versionCode": "27000", "link": "https://x", "note": "https://n"}}"#,
        );
        let records = ManifestFetcher::new(url).fetch(Some(Duration::from_secs(5)));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].note, "https://n");
    }

    #[test]
    fn fetch_failures_collapse_to_empty() {
        let url = serve_once("500 Internal Server Error", "{}");
        assert!(ManifestFetcher::new(url)
            .fetch(Some(Duration::from_secs(5)))
            .is_empty());

        let url = serve_once("200 OK", "<html>");
        assert!(ManifestFetcher::new(url)
            .fetch(Some(Duration::from_secs(5)))
            .is_empty());

        assert!(ManifestFetcher::new("not a url")
            .fetch(Some(Duration::from_secs(1)))
            .is_empty());
    }
}
