//! JSON Web Signature.
//!
//! A token starts unsigned and gains one signature entry per
//! [`JwsToken::sign`] call. Every entry signs
//! `ASCII(b64(protected) '.' b64(payload))` with its own protected header.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    check_disjoint, decode_header, decode_part, encode_header, header_str, headers, Header,
    SerializationFormat,
};
use crate::crypto::algorithm::default_signing_algorithm;
use crate::crypto::CryptoEngine;
use crate::encoding::b64url_encode;
use crate::error::{Error, Result};
use crate::keys::{Key, KeyVersion};

/// One signature over the payload
#[derive(Clone, Debug, PartialEq)]
pub struct JwsSignature {
    /// Protected header exactly as encoded; the signing input uses this text
    protected_encoded: String,
    protected: Header,
    header: Option<Header>,
    signature: Vec<u8>,
}

impl JwsSignature {
    /// Integrity-protected header
    pub fn protected(&self) -> &Header {
        &self.protected
    }

    /// Unprotected header
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Raw signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// `kid` from the protected header, else the unprotected one
    pub fn kid(&self) -> Option<&str> {
        header_str(&[Some(&self.protected), self.header.as_ref()], headers::KID)
    }

    /// `alg` from the protected header, else the unprotected one
    pub fn alg(&self) -> Option<&str> {
        header_str(&[Some(&self.protected), self.header.as_ref()], headers::ALG)
    }

    fn signing_input(&self, payload_encoded: &str) -> Vec<u8> {
        format!("{}.{}", self.protected_encoded, payload_encoded).into_bytes()
    }
}

/// A payload with zero or more signatures
#[derive(Clone, Debug, PartialEq)]
pub struct JwsToken {
    payload: Vec<u8>,
    signatures: Vec<JwsSignature>,
}

#[derive(Serialize, Deserialize)]
struct FlatJws {
    payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    signature: String,
}

#[derive(Serialize, Deserialize)]
struct SignatureJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    signature: String,
}

#[derive(Serialize, Deserialize)]
struct GeneralJws {
    payload: String,
    signatures: Vec<SignatureJson>,
}

impl JwsToken {
    /// Unsigned token over `payload`
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            signatures: Vec::new(),
        }
    }

    /// The payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Signature entries in signing order
    pub fn signatures(&self) -> &[JwsSignature] {
        &self.signatures
    }

    /// Sign with the latest key under `reference` and append the entry
    ///
    /// The protected header holds `alg`, the key's `kid` and
    /// `extra_headers` (`typ`, `cty`, ...). An `alg` in `extra_headers`
    /// overrides the key's own.
    pub fn sign(
        &mut self,
        reference: &str,
        engine: &CryptoEngine,
        extra_headers: Option<Header>,
    ) -> Result<()> {
        let key = engine.signing_key(reference)?;
        self.sign_with_key(&key, engine, extra_headers)
    }

    /// Sign with an explicit private or secret key
    pub fn sign_with_key(
        &mut self,
        key: &Key,
        engine: &CryptoEngine,
        extra_headers: Option<Header>,
    ) -> Result<()> {
        let mut protected = extra_headers.unwrap_or_default();
        if protected.get(headers::B64) == Some(&Value::Bool(false)) {
            return Err(Error::UnsupportedOperation("Unencoded JWS payloads (b64: false)".into()));
        }

        let jwk = key.to_jwk();
        let alg = match protected.get(headers::ALG).and_then(Value::as_str) {
            Some(alg) => alg.to_string(),
            None => jwk
                .alg
                .clone()
                .or_else(|| default_signing_algorithm(&jwk).map(str::to_string))
                .ok_or(Error::NoAlgorithmSpecified)?,
        };
        protected.insert(headers::ALG.into(), Value::String(alg.clone()));
        if let Some(kid) = key.kid() {
            protected.insert(headers::KID.into(), Value::String(kid.to_string()));
        }

        let mut entry = JwsSignature {
            protected_encoded: encode_header(&protected)?,
            protected,
            header: None,
            signature: Vec::new(),
        };
        let input = entry.signing_input(&b64url_encode(&self.payload));
        entry.signature = engine.sign_with_key(&input, key, Some(&alg))?;

        tracing::debug!(
            "Added JWS signature {} ({} total)",
            alg,
            self.signatures.len() + 1
        );
        self.signatures.push(entry);
        Ok(())
    }

    /// Serialize in `format`
    ///
    /// Compact needs exactly one signature and no unprotected header;
    /// flattened JSON exactly one signature.
    pub fn serialize(&self, format: SerializationFormat) -> Result<String> {
        let payload = b64url_encode(&self.payload);
        match format {
            SerializationFormat::Compact => {
                let entry = self.single("Compact")?;
                if entry.header.is_some() {
                    return Err(Error::MalformedToken(
                        "Compact JWS cannot carry an unprotected header".into(),
                    ));
                }
                Ok(format!(
                    "{}.{}.{}",
                    entry.protected_encoded,
                    payload,
                    b64url_encode(&entry.signature)
                ))
            }
            SerializationFormat::FlatJson => {
                let entry = self.single("Flattened JSON")?;
                let flat = FlatJws {
                    payload,
                    protected: non_empty(&entry.protected_encoded),
                    header: entry.header.clone(),
                    signature: b64url_encode(&entry.signature),
                };
                Ok(serde_json::to_string(&flat)?)
            }
            SerializationFormat::GeneralJson => {
                let general = GeneralJws {
                    payload,
                    signatures: self
                        .signatures
                        .iter()
                        .map(|entry| SignatureJson {
                            protected: non_empty(&entry.protected_encoded),
                            header: entry.header.clone(),
                            signature: b64url_encode(&entry.signature),
                        })
                        .collect(),
                };
                Ok(serde_json::to_string(&general)?)
            }
        }
    }

    /// Parse any of the three serializations
    pub fn deserialize(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('{') {
            let value: Value = serde_json::from_str(text)
                .map_err(|e| Error::MalformedToken(format!("JWS JSON: {}", e)))?;
            return if value.get("signatures").is_some() {
                let general: GeneralJws = serde_json::from_value(value)
                    .map_err(|e| Error::MalformedToken(format!("General JWS: {}", e)))?;
                let signatures = general
                    .signatures
                    .into_iter()
                    .map(|s| entry(s.protected.unwrap_or_default(), s.header, &s.signature))
                    .collect::<Result<Vec<_>>>()?;
                Self::parsed(&general.payload, signatures)
            } else if value.get("signature").is_some() {
                let flat: FlatJws = serde_json::from_value(value)
                    .map_err(|e| Error::MalformedToken(format!("Flattened JWS: {}", e)))?;
                let signature = entry(flat.protected.unwrap_or_default(), flat.header, &flat.signature)?;
                Self::parsed(&flat.payload, vec![signature])
            } else {
                Err(Error::MalformedToken(
                    "JWS JSON has neither 'signature' nor 'signatures'".into(),
                ))
            };
        }

        let parts: Vec<&str> = text.split('.').collect();
        match parts.as_slice() {
            [protected, payload, signature] => {
                let signature = entry(protected.to_string(), None, signature)?;
                Self::parsed(payload, vec![signature])
            }
            _ => Err(Error::MalformedToken(format!(
                "Compact JWS has {} parts, expected 3",
                parts.len()
            ))),
        }
    }

    /// Verify every signature against `keys`
    ///
    /// A signature is valid when any key verifies it with the `alg` of its
    /// protected header. Keys are tried in order: the key at the same
    /// position (when there are as many keys as signatures), then keys with
    /// a matching `kid`, then the rest. The token is valid only when every
    /// signature verifies.
    pub fn verify(&self, engine: &CryptoEngine, keys: &[Key]) -> Result<()> {
        if self.signatures.is_empty() {
            tracing::warn!("Refusing to verify an unsigned JWS");
            return Err(Error::SignatureInvalid);
        }
        let payload = b64url_encode(&self.payload);
        let positional = keys.len() == self.signatures.len();

        for (index, entry) in self.signatures.iter().enumerate() {
            // an unprotected alg is not covered by the signature
            let alg = header_str(&[Some(&entry.protected)], headers::ALG).ok_or_else(|| {
                Error::MalformedToken(format!("signature {} has no protected alg", index))
            })?;

            let mut order: Vec<usize> = Vec::with_capacity(keys.len());
            if positional {
                order.push(index);
            }
            if let Some(kid) = entry.kid() {
                order.extend((0..keys.len()).filter(|&i| keys[i].kid() == Some(kid)));
            }
            order.extend(0..keys.len());
            let mut candidates: Vec<usize> = Vec::with_capacity(keys.len());
            for i in order {
                if !candidates.contains(&i) {
                    candidates.push(i);
                }
            }

            let input = entry.signing_input(&payload);
            let verified = candidates.iter().map(|&i| &keys[i]).any(|key| {
                match engine.verify_with_key(&input, &entry.signature, key, Some(alg)) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!("JWS signature {} not verified by {:?}: {}", index, key.kid(), e);
                        false
                    }
                }
            });
            if !verified {
                tracing::warn!("JWS signature {} ({}) did not verify", index, alg);
                return Err(Error::SignatureInvalid);
            }
        }
        Ok(())
    }

    fn single(&self, format: &str) -> Result<&JwsSignature> {
        match self.signatures.as_slice() {
            [entry] => Ok(entry),
            other => Err(Error::MalformedToken(format!(
                "{} serialization needs exactly one signature, token has {}",
                format,
                other.len()
            ))),
        }
    }

    fn parsed(payload: &str, signatures: Vec<JwsSignature>) -> Result<Self> {
        Ok(Self {
            payload: decode_part(payload, "payload")?,
            signatures,
        })
    }
}

fn entry(protected_encoded: String, header: Option<Header>, signature: &str) -> Result<JwsSignature> {
    let protected = decode_header(&protected_encoded)?;
    check_disjoint(&[Some(&protected), header.as_ref()])?;
    Ok(JwsSignature {
        protected_encoded,
        protected,
        header,
        signature: decode_part(signature, "signature")?,
    })
}

fn non_empty(encoded: &str) -> Option<String> {
    (!encoded.is_empty()).then(|| encoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::keys::{KeyType, SecretKey};
    use crate::keystore::InMemoryKeyStore;

    fn engine_with_keys() -> CryptoEngine {
        let engine = CryptoEngine::new(Arc::new(InMemoryKeyStore::new()));
        engine.generate_key_pair("alice", KeyType::Ec).unwrap();
        engine.generate_key_pair("bob", KeyType::Okp).unwrap();
        engine
    }

    fn public(engine: &CryptoEngine, reference: &str) -> Key {
        Key::Public(engine.key_store().get_public_key(reference).unwrap().latest().clone())
    }

    #[test]
    fn test_compact_round_trip() {
        let engine = engine_with_keys();
        let mut token = JwsToken::new(b"{\"iss\":\"did:example:alice\"}".to_vec());
        token.sign("alice", &engine, None).unwrap();

        let compact = token.serialize(SerializationFormat::Compact).unwrap();
        assert_eq!(compact.split('.').count(), 3);

        let parsed = JwsToken::deserialize(&compact).unwrap();
        assert_eq!(parsed, token);
        assert_eq!(parsed.signatures()[0].alg(), Some("ES256K"));
        parsed.verify(&engine, &[public(&engine, "alice")]).unwrap();
    }

    #[test]
    fn test_flat_and_general_shapes() {
        let engine = engine_with_keys();
        let mut token = JwsToken::new(b"payload".to_vec());
        token.sign("alice", &engine, None).unwrap();

        let flat = token.serialize(SerializationFormat::FlatJson).unwrap();
        assert!(!flat.contains("\"signatures\""));
        assert!(flat.contains("\"signature\""));
        assert_eq!(JwsToken::deserialize(&flat).unwrap(), token);

        let general = token.serialize(SerializationFormat::GeneralJson).unwrap();
        assert!(general.contains("\"signatures\""));
        assert_eq!(JwsToken::deserialize(&general).unwrap(), token);
    }

    #[test]
    fn test_multiple_signatures_all_required() {
        let engine = engine_with_keys();
        let mut token = JwsToken::new(b"two signers".to_vec());
        token.sign("alice", &engine, None).unwrap();
        token.sign("bob", &engine, None).unwrap();

        assert!(token.serialize(SerializationFormat::Compact).is_err());
        assert!(token.serialize(SerializationFormat::FlatJson).is_err());

        let parsed = JwsToken::deserialize(&token.serialize(SerializationFormat::GeneralJson).unwrap()).unwrap();
        assert_eq!(parsed.signatures()[1].alg(), Some("EdDSA"));

        // positional
        parsed
            .verify(&engine, &[public(&engine, "alice"), public(&engine, "bob")])
            .unwrap();
        // by kid, with an extra key in the list
        let stranger = engine.generate_key_pair("carol", KeyType::Ec).unwrap();
        parsed
            .verify(
                &engine,
                &[Key::Public(stranger), public(&engine, "bob"), public(&engine, "alice")],
            )
            .unwrap();
        // same count, reversed order
        parsed
            .verify(&engine, &[public(&engine, "bob"), public(&engine, "alice")])
            .unwrap();
        // one signer missing
        assert!(matches!(
            parsed.verify(&engine, &[public(&engine, "alice")]),
            Err(Error::SignatureInvalid)
        ));
    }

    #[test]
    fn test_extra_headers_protected() {
        let engine = engine_with_keys();
        let mut token = JwsToken::new(b"x".to_vec());
        let extra = json!({"typ": "JWT", "cty": "vc+ld+json"}).as_object().cloned();
        token.sign("alice", &engine, extra).unwrap();

        let entry = &token.signatures()[0];
        assert_eq!(entry.protected()["typ"], "JWT");
        assert!(entry.kid().is_some());
    }

    #[test]
    fn test_unencoded_payload_rejected() {
        let engine = engine_with_keys();
        let extra = json!({"b64": false}).as_object().cloned();
        assert!(matches!(
            JwsToken::new(b"x".to_vec()).sign("alice", &engine, extra),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_mac_signed_token() {
        let engine = engine_with_keys();
        let secret = Key::Secret(SecretKey::from_bytes(vec![3u8; 32]));
        let mut token = JwsToken::new(b"mac".to_vec());
        token.sign_with_key(&secret, &engine, None).unwrap();

        assert_eq!(token.signatures()[0].alg(), Some("HS256"));
        token.verify(&engine, &[secret]).unwrap();
    }

    #[test]
    fn test_malformed_inputs() {
        for text in ["a.b", "a.b.c.d", "{\"payload\":\"eA\"}", "{not json", "!!.eA.eA"] {
            assert!(
                matches!(JwsToken::deserialize(text), Err(Error::MalformedToken(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_equal_key_count_without_kids_any_order() {
        let engine = engine_with_keys();
        let alice = Key::Public(
            engine.key_store().get_public_key("alice").unwrap().latest().clone(),
        );
        let secret = Key::Secret(SecretKey::from_bytes(vec![7u8; 32]));
        let mut token = JwsToken::new(b"mixed".to_vec());
        token.sign("alice", &engine, None).unwrap();
        token.sign_with_key(&secret, &engine, None).unwrap();
        assert!(token.signatures()[1].kid().is_none());

        token.verify(&engine, &[secret.clone(), alice.clone()]).unwrap();
        token.verify(&engine, &[alice, secret]).unwrap();
    }

    #[test]
    fn test_unprotected_alg_not_trusted() {
        let engine = engine_with_keys();
        let mut token = JwsToken::new(b"x".to_vec());
        token.sign("alice", &engine, None).unwrap();

        let entry = &mut token.signatures[0];
        let alg = entry.protected.remove(headers::ALG).unwrap();
        entry.protected_encoded = encode_header(&entry.protected).unwrap();
        let mut header = Header::new();
        header.insert(headers::ALG.into(), alg);
        entry.header = Some(header);
        assert_eq!(entry.alg(), Some("ES256K"));

        assert!(matches!(
            token.verify(&engine, &[public(&engine, "alice")]),
            Err(Error::MalformedToken(_))
        ));
    }

    #[test]
    fn test_unsigned_token_does_not_verify() {
        let engine = engine_with_keys();
        let token = JwsToken::new(b"x".to_vec());
        assert!(token.verify(&engine, &[public(&engine, "alice")]).is_err());
        assert!(token.serialize(SerializationFormat::GeneralJson).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_tampering_detected(payload in proptest::collection::vec(any::<u8>(), 1..64), flip in any::<prop::sample::Index>()) {
            let engine = engine_with_keys();
            let mut token = JwsToken::new(payload.clone());
            token.sign("alice", &engine, None).unwrap();
            let key = public(&engine, "alice");
            token.verify(&engine, std::slice::from_ref(&key)).unwrap();

            let mut tampered = payload;
            let i = flip.index(tampered.len());
            tampered[i] ^= 0x01;
            let mut forged = token.clone();
            forged.payload = tampered;
            prop_assert!(forged.verify(&engine, std::slice::from_ref(&key)).is_err());

            let mut forged = token.clone();
            let sig_len = forged.signatures[0].signature.len();
            forged.signatures[0].signature[flip.index(sig_len)] ^= 0x80;
            prop_assert!(forged.verify(&engine, std::slice::from_ref(&key)).is_err());
        }
    }
}
