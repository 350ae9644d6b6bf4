//! Request signing for the three Azure REST surfaces the demos talk to.
//!
//! All three are HMAC-SHA256 based but differ in what gets signed:
//! Service Bus signs the resource URI and expiry (SAS token), Blob storage
//! signs a canonical form of the whole request (Shared Key) and Cosmos DB
//! signs verb, resource type, resource link and date (master key token).

use crate::utils::error::{Result, ShowcaseError};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| ShowcaseError::SigningError {
        message: format!("Invalid HMAC key: {}", e),
    })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn decode_key(key: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(key.trim())
        .map_err(|e| ShowcaseError::SigningError {
            message: format!("Account key is not valid base64: {}", e),
        })
}

pub fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn rfc1123_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Service Bus SAS token. The key is used as-is (UTF-8), not base64-decoded.
pub fn sas_token(resource_uri: &str, key_name: &str, key: &str, expiry: i64) -> Result<String> {
    let encoded_uri = url_encode(&resource_uri.to_lowercase());
    let string_to_sign = format!("{}\n{}", encoded_uri, expiry);
    let signature = STANDARD.encode(hmac_sha256(key.as_bytes(), string_to_sign.as_bytes())?);

    Ok(format!(
        "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
        encoded_uri,
        url_encode(&signature),
        expiry,
        key_name
    ))
}

/// Inputs to a Blob service Shared Key signature.
#[derive(Debug, Clone, Default)]
pub struct SharedKeyRequest<'a> {
    pub verb: &'a str,
    pub content_length: usize,
    pub content_type: &'a str,
    /// `x-ms-*` headers, any case.
    pub ms_headers: Vec<(&'a str, String)>,
    /// URL path as sent, starting with `/`.
    pub path: &'a str,
    pub query: Vec<(&'a str, &'a str)>,
}

impl SharedKeyRequest<'_> {
    pub fn string_to_sign(&self, account: &str) -> String {
        // Zero length is signed as an empty field.
        let content_length = if self.content_length == 0 {
            String::new()
        } else {
            self.content_length.to_string()
        };

        let standard_headers = [
            self.verb,
            "", // Content-Encoding
            "", // Content-Language
            content_length.as_str(),
            "", // Content-MD5
            self.content_type,
            "", // Date
            "", // If-Modified-Since
            "", // If-Match
            "", // If-None-Match
            "", // If-Unmodified-Since
            "", // Range
        ];

        let canonical_headers: BTreeMap<String, &str> = self
            .ms_headers
            .iter()
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim()))
            .collect();

        let mut out = standard_headers.join("\n");
        out.push('\n');
        for (name, value) in &canonical_headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }

        out.push('/');
        out.push_str(account);
        out.push_str(self.path);

        let canonical_query: BTreeMap<String, &str> = self
            .query
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), *value))
            .collect();
        for (name, value) in &canonical_query {
            out.push('\n');
            out.push_str(name);
            out.push(':');
            out.push_str(value);
        }

        out
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self, account: &str, account_key: &str) -> Result<String> {
        let key = decode_key(account_key)?;
        let signature = hmac_sha256(&key, self.string_to_sign(account).as_bytes())?;
        Ok(format!("SharedKey {}:{}", account, STANDARD.encode(signature)))
    }
}

/// Cosmos DB master key authorization, already URL-encoded for the header.
pub fn cosmos_master_token(
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
    master_key: &str,
) -> Result<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );
    let key = decode_key(master_key)?;
    let signature = STANDARD.encode(hmac_sha256(&key, payload.as_bytes())?);

    Ok(url_encode(&format!("type=master&ver=1.0&sig={}", signature)))
}
