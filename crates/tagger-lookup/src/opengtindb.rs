//! # OpenGTINDB Provider
//!
//! `GET {base}?ean={ean}&cmd=query&queryid={id}`
//!
//! The answer is plain text, one `key=value` per line, Latin-1 encoded:
//! ```text
//! error=0
//! ---
//! name=Boss
//! detailname=Textmarker Boss Original gelb
//! vendor=Stabilo
//! ---
//! ```
//! `error=1` means the barcode is unknown. Any other nonzero code is a
//! provider fault (bad query id, rate limit, ...).

use async_trait::async_trait;
use tracing::debug;

use crate::error::{LookupError, LookupResult};
use crate::provider::{non_empty, LookupProvider, RemoteProduct};

pub struct OpenGtinDb {
    client: reqwest::Client,
    base_url: String,
    query_id: String,
}

impl OpenGtinDb {
    pub const ID: &'static str = "opengtindb";

    pub fn new(client: reqwest::Client, base_url: &str, query_id: &str) -> Self {
        OpenGtinDb {
            client,
            base_url: base_url.to_string(),
            query_id: query_id.to_string(),
        }
    }
}

#[async_trait]
impl LookupProvider for OpenGtinDb {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn lookup(&self, ean: &str) -> LookupResult<Option<RemoteProduct>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("ean", ean), ("cmd", "query"), ("queryid", self.query_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body = decode_latin1(&response.bytes().await?);
        debug!(ean = %ean, bytes = body.len(), "OpenGTINDB answered");
        parse_response(&body)
    }
}

/// UTF-8 if it is valid UTF-8, otherwise every byte is a Latin-1 code point.
fn decode_latin1(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parses the text protocol. Only the first product block is used.
pub fn parse_response(body: &str) -> LookupResult<Option<RemoteProduct>> {
    let mut error_code: Option<&str> = None;
    let mut name = None;
    let mut detailname = None;
    let mut vendor = None;
    let mut blocks_seen = 0;

    for line in body.lines() {
        let line = line.trim();
        if line == "---" {
            blocks_seen += 1;
            if blocks_seen > 1 {
                break;
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match (key.trim(), blocks_seen) {
            ("error", 0) => error_code = Some(value.trim()),
            ("name", 1) => name = Some(value),
            ("detailname", 1) => detailname = Some(value),
            ("vendor", 1) => vendor = Some(value),
            _ => {}
        }
    }

    match error_code {
        Some("0") => {}
        Some("1") => return Ok(None),
        Some(code) => return Err(LookupError::Provider(format!("error={code}"))),
        None => return Err(LookupError::Malformed("missing error line".to_string())),
    }

    let Some(name) = non_empty(detailname).or_else(|| non_empty(name)) else {
        return Ok(None);
    };

    Ok(Some(RemoteProduct {
        name,
        brand: non_empty(vendor),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hit_prefers_detailname() {
        let body = "error=0\n---\nasin=\nname=Boss\ndetailname=Textmarker Boss Original gelb\nvendor=Stabilo\n---\n";
        let product = parse_response(body).unwrap().unwrap();
        assert_eq!(product.name, "Textmarker Boss Original gelb");
        assert_eq!(product.brand.as_deref(), Some("Stabilo"));
    }

    #[test]
    fn test_parse_falls_back_to_name() {
        let body = "error=0\n---\nname=Apfelsaft\ndetailname=\nvendor=\n---\n";
        let product = parse_response(body).unwrap().unwrap();
        assert_eq!(product.name, "Apfelsaft");
        assert_eq!(product.brand, None);
    }

    #[test]
    fn test_parse_misses_and_faults() {
        assert_eq!(parse_response("error=1\n").unwrap(), None);
        assert_eq!(parse_response("error=0\n---\nname=\n---\n").unwrap(), None);
        assert!(matches!(parse_response("error=5\n"), Err(LookupError::Provider(_))));
        assert!(matches!(parse_response("<html>"), Err(LookupError::Malformed(_))));
    }

    #[test]
    fn test_latin1_body() {
        let bytes = b"error=0\n---\nname=K\xe4se\n---\n";
        let product = parse_response(&decode_latin1(bytes)).unwrap().unwrap();
        assert_eq!(product.name, "Käse");
    }
}
