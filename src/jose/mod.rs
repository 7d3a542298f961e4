//! # JOSE Tokens
//!
//! JWS (RFC 7515) and JWE (RFC 7516) with all three serializations.
//!
//! ## Serializations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         JOSE SERIALIZATIONS                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Compact      JWS: b64(protected).b64(payload).b64(signature)          │
//! │               JWE: b64(protected).b64(ek).b64(iv).b64(ct).b64(tag)     │
//! │               one signer / recipient, protected header only            │
//! │                                                                         │
//! │  Flat JSON    { "protected", "header", "payload", "signature" }        │
//! │               one signer / recipient, unprotected headers allowed      │
//! │                                                                         │
//! │  General JSON { "payload", "signatures": [ {...}, {...} ] }            │
//! │               { "protected", "recipients": [ {...} ], "iv", ... }      │
//! │               any number of signers / recipients                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parsing is strict: a document that fits none of the shapes is
//! [`Error::MalformedToken`](crate::Error::MalformedToken).

mod jwe;
mod jws;

pub use jwe::{JweRecipient, JweToken};
pub use jws::{JwsSignature, JwsToken};

use serde_json::{Map, Value};

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{Error, Result};

/// A JOSE header: a JSON object
pub type Header = Map<String, Value>;

/// Header parameter names
pub mod headers {
    /// Algorithm
    pub const ALG: &str = "alg";
    /// Content encryption
    pub const ENC: &str = "enc";
    /// Key id
    pub const KID: &str = "kid";
    /// Type
    pub const TYP: &str = "typ";
    /// Content type
    pub const CTY: &str = "cty";
    /// Unencoded payload option (RFC 7797)
    pub const B64: &str = "b64";
    /// Ephemeral public key
    pub const EPK: &str = "epk";
    /// Agreement PartyUInfo
    pub const APU: &str = "apu";
    /// Agreement PartyVInfo
    pub const APV: &str = "apv";
    /// PBES2 salt input
    pub const P2S: &str = "p2s";
    /// PBES2 iteration count
    pub const P2C: &str = "p2c";
}

/// Output shape of [`JwsToken::serialize`] and [`JweToken::serialize`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Dot-separated base64url parts
    Compact,
    /// Flattened JSON (one signature / recipient)
    FlatJson,
    /// General JSON (any number of signatures / recipients)
    GeneralJson,
}

/// Base64url-encode a header
fn encode_header(header: &Header) -> Result<String> {
    Ok(b64url_encode(serde_json::to_vec(header)?))
}

/// Decode a base64url protected header; the empty string is an empty header
fn decode_header(encoded: &str) -> Result<Header> {
    if encoded.is_empty() {
        return Ok(Header::new());
    }
    let bytes = decode_part(encoded, "protected header")?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedToken(format!("protected header is not a JSON object: {}", e)))
}

/// Decode one base64url token part
fn decode_part(encoded: &str, what: &str) -> Result<Vec<u8>> {
    b64url_decode(encoded).map_err(|_| Error::MalformedToken(format!("{} is not base64url", what)))
}

/// First string value of `name` across `headers`
fn header_str<'a>(headers: &[Option<&'a Header>], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .flatten()
        .find_map(|header| header.get(name).and_then(Value::as_str))
}

/// Fail when headers that are both present share a parameter name
fn check_disjoint(headers: &[Option<&Header>]) -> Result<()> {
    let present: Vec<&Header> = headers.iter().flatten().copied().collect();
    for (i, a) in present.iter().enumerate() {
        for b in &present[i + 1..] {
            if let Some(name) = a.keys().find(|name| b.contains_key(*name)) {
                return Err(Error::MalformedToken(format!(
                    "header parameter '{}' appears twice",
                    name
                )));
            }
        }
    }
    Ok(())
}
