//! JSON Web Encryption.
//!
//! ## Key Management by Recipient
//!
//! | Recipient key | `alg` | Header parameters |
//! |---------------|-------|-------------------|
//! | EC secp256k1 (public or private) | ECDH-ES+A256KW | `epk`, optional `apu` / `apv` |
//! | OKP X25519 | ECDH-ES+A256KW | `epk`, optional `apu` / `apv` |
//! | RSA | RSA-OAEP-256 | |
//! | `oct` (password) | PBES2-HS512+A256KW | `p2s`, `p2c` |
//!
//! Content is encrypted with A256GCM by default (`enc` from the engine
//! configuration or the caller's header). The AAD is
//! `ASCII(b64(protected))`, or `ASCII(b64(protected) '.' b64(aad))` when
//! JSON-level AAD is present.
//!
//! ECDH-ES derives the key-encryption key with the Concat KDF of
//! RFC 7518 §4.6.2 (SHA-256, `AlgorithmID = alg`).
//!
//! Decryption never reports why it failed: a wrong key, a corrupted
//! ciphertext and a tag mismatch all yield `Ok(None)`.

use std::borrow::Cow;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use super::{
    check_disjoint, decode_header, decode_part, encode_header, header_str, headers, Header,
    SerializationFormat,
};
use crate::crypto::algorithm::{curves, names, params, Algorithm};
use crate::crypto::CryptoEngine;
use crate::encoding::b64url_encode;
use crate::error::{Error, Result};
use crate::keys::{Jwk, Key, KeyVersion, PrivateKey, PublicKey, PublicKeyMaterial, SecretKey};

/// AES-GCM IV size
const IV_SIZE: usize = 12;

/// AES-GCM tag size
const TAG_SIZE: usize = 16;

/// Output block of the Concat KDF hash (SHA-256)
const KDF_HASH_SIZE: usize = 32;

/// One recipient's wrapped content-encryption key
#[derive(Clone, Debug, PartialEq)]
pub struct JweRecipient {
    header: Option<Header>,
    encrypted_key: Vec<u8>,
}

impl JweRecipient {
    /// Per-recipient unprotected header
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Wrapped CEK (empty for direct key agreement)
    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }
}

/// An encrypted payload for one or more recipients
#[derive(Clone, Debug, PartialEq)]
pub struct JweToken {
    protected_encoded: String,
    protected: Header,
    unprotected: Option<Header>,
    recipients: Vec<JweRecipient>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    aad: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct RecipientJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
}

/// Flattened and general JSON share every member but the recipient list
#[derive(Serialize, Deserialize)]
struct JweJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unprotected: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipients: Option<Vec<RecipientJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
    iv: String,
    ciphertext: String,
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aad: Option<String>,
}

impl JweToken {
    /// Encrypt `plaintext` for one recipient
    ///
    /// Every header parameter goes into the protected header, so the
    /// result serializes in all three formats. `header_overrides` may set
    /// `enc`, `typ`, `cty`, `apu` / `apv` and other extra parameters.
    pub fn encrypt(
        engine: &CryptoEngine,
        plaintext: &[u8],
        recipient: &Key,
        header_overrides: Option<Header>,
    ) -> Result<Self> {
        let mut protected = header_overrides.unwrap_or_default();
        let enc = content_encryption(engine, &protected)?;
        let cek = random_key(&enc)?;

        let (params, encrypted_key) = wrap_key(engine, recipient, &cek, &protected)?;
        protected.extend(params);
        protected.insert(headers::ENC.into(), Value::String(enc.clone()));

        let recipients = vec![JweRecipient {
            header: None,
            encrypted_key,
        }];
        Self::seal(engine, protected, recipients, &cek, &enc, plaintext, None)
    }

    /// Encrypt `plaintext` once for several recipients (general JSON)
    ///
    /// The protected header carries `enc` and `header_overrides`; each
    /// recipient's `alg`, `kid` and key-management parameters go into its
    /// own unprotected header.
    pub fn encrypt_for_recipients(
        engine: &CryptoEngine,
        plaintext: &[u8],
        recipients: &[Key],
        header_overrides: Option<Header>,
        aad: Option<&[u8]>,
    ) -> Result<Self> {
        if recipients.is_empty() {
            return Err(Error::UnsupportedKeyForEncryption("no recipients".into()));
        }
        let mut protected = header_overrides.unwrap_or_default();
        let enc = content_encryption(engine, &protected)?;
        protected.insert(headers::ENC.into(), Value::String(enc.clone()));
        let cek = random_key(&enc)?;

        let wrapped = recipients
            .iter()
            .map(|recipient| {
                let (header, encrypted_key) = wrap_key(engine, recipient, &cek, &protected)?;
                Ok(JweRecipient {
                    header: Some(header),
                    encrypted_key,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::seal(engine, protected, wrapped, &cek, &enc, plaintext, aad)
    }

    fn seal(
        engine: &CryptoEngine,
        protected: Header,
        recipients: Vec<JweRecipient>,
        cek: &[u8],
        enc: &str,
        plaintext: &[u8],
        aad: Option<&[u8]>,
    ) -> Result<Self> {
        let mut iv = vec![0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let mut token = Self {
            protected_encoded: encode_header(&protected)?,
            protected,
            unprotected: None,
            recipients,
            iv,
            ciphertext: Vec::new(),
            tag: Vec::new(),
            aad: aad.map(<[u8]>::to_vec),
        };

        let algorithm = token.content_algorithm(enc);
        let cek = Key::Secret(SecretKey::from_bytes(cek.to_vec()));
        let mut sealed = engine.encrypt(&algorithm, &cek, plaintext)?;
        if sealed.len() < TAG_SIZE {
            return Err(Error::EncryptionFailed("AEAD output shorter than its tag".into()));
        }
        token.tag = sealed.split_off(sealed.len() - TAG_SIZE);
        token.ciphertext = sealed;

        tracing::debug!(
            "Encrypted {} bytes with {} for {} recipient(s)",
            plaintext.len(),
            enc,
            token.recipients.len()
        );
        Ok(token)
    }

    /// Integrity-protected header
    pub fn protected(&self) -> &Header {
        &self.protected
    }

    /// Shared unprotected header
    pub fn unprotected(&self) -> Option<&Header> {
        self.unprotected.as_ref()
    }

    /// Recipients in order
    pub fn recipients(&self) -> &[JweRecipient] {
        &self.recipients
    }

    /// Ciphertext without the tag
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// JSON-level additional authenticated data
    pub fn aad(&self) -> Option<&[u8]> {
        self.aad.as_deref()
    }

    /// Decrypt with `key`, or with the key-store key named by each
    /// recipient's `kid` when `key` is `None`
    ///
    /// Recipients are tried in order; `Ok(None)` when none decrypts.
    pub fn decrypt(&self, engine: &CryptoEngine, key: Option<&Key>) -> Result<Option<Vec<u8>>> {
        let shared = [Some(&self.protected), self.unprotected.as_ref()];
        let enc = header_str(&shared, headers::ENC)
            .ok_or_else(|| Error::MalformedToken("JWE has no enc".into()))?;

        for (index, recipient) in self.recipients.iter().enumerate() {
            let layers = [Some(&self.protected), self.unprotected.as_ref(), recipient.header.as_ref()];
            let alg = header_str(&layers, headers::ALG)
                .ok_or_else(|| Error::MalformedToken(format!("JWE recipient {} has no alg", index)))?;

            let key: Cow<'_, Key> = match key {
                Some(key) => Cow::Borrowed(key),
                None => match header_str(&layers, headers::KID) {
                    Some(kid) => match engine.key_store().get_key_by_id(kid)? {
                        Some(found) => Cow::Owned(found),
                        None => continue,
                    },
                    None => continue,
                },
            };

            let opened = unwrap_key(engine, &layers, alg, enc, &key, &recipient.encrypted_key)
                .and_then(|cek| {
                    let cek = Key::Secret(SecretKey::from_bytes(cek.to_vec()));
                    let mut sealed = self.ciphertext.clone();
                    sealed.extend_from_slice(&self.tag);
                    engine.decrypt(&self.content_algorithm(enc), &cek, &sealed)
                });
            match opened {
                Ok(plaintext) => return Ok(Some(plaintext)),
                Err(e) => tracing::debug!("JWE recipient {} ({}) not decrypted: {}", index, alg, e),
            }
        }

        tracing::warn!("No JWE recipient could be decrypted");
        Ok(None)
    }

    /// Serialize in `format`
    ///
    /// Compact needs one recipient, no unprotected headers and no AAD;
    /// flattened JSON needs one recipient.
    pub fn serialize(&self, format: SerializationFormat) -> Result<String> {
        let iv = b64url_encode(&self.iv);
        let ciphertext = b64url_encode(&self.ciphertext);
        let tag = b64url_encode(&self.tag);
        let aad = self.aad.as_ref().map(b64url_encode);

        match format {
            SerializationFormat::Compact => {
                let recipient = self.single("Compact")?;
                if self.unprotected.is_some() || recipient.header.is_some() || self.aad.is_some() {
                    return Err(Error::MalformedToken(
                        "Compact JWE cannot carry unprotected headers or AAD".into(),
                    ));
                }
                Ok(format!(
                    "{}.{}.{}.{}.{}",
                    self.protected_encoded,
                    b64url_encode(&recipient.encrypted_key),
                    iv,
                    ciphertext,
                    tag
                ))
            }
            SerializationFormat::FlatJson => {
                let recipient = self.single("Flattened JSON")?;
                let json = JweJson {
                    protected: Some(self.protected_encoded.clone()),
                    unprotected: self.unprotected.clone(),
                    recipients: None,
                    header: recipient.header.clone(),
                    encrypted_key: encrypted_key_json(recipient),
                    iv,
                    ciphertext,
                    tag,
                    aad,
                };
                Ok(serde_json::to_string(&json)?)
            }
            SerializationFormat::GeneralJson => {
                let json = JweJson {
                    protected: Some(self.protected_encoded.clone()),
                    unprotected: self.unprotected.clone(),
                    recipients: Some(
                        self.recipients
                            .iter()
                            .map(|recipient| RecipientJson {
                                header: recipient.header.clone(),
                                encrypted_key: encrypted_key_json(recipient),
                            })
                            .collect(),
                    ),
                    header: None,
                    encrypted_key: None,
                    iv,
                    ciphertext,
                    tag,
                    aad,
                };
                Ok(serde_json::to_string(&json)?)
            }
        }
    }

    /// Parse any of the three serializations
    pub fn deserialize(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('{') {
            let json: JweJson = serde_json::from_str(text)
                .map_err(|e| Error::MalformedToken(format!("JWE JSON: {}", e)))?;
            return Self::from_json(json);
        }

        let parts: Vec<&str> = text.split('.').collect();
        match parts.as_slice() {
            [protected, encrypted_key, iv, ciphertext, tag] => {
                let recipient = JweRecipient {
                    header: None,
                    encrypted_key: decode_part(encrypted_key, "encrypted_key")?,
                };
                Self::parsed(protected.to_string(), None, vec![recipient], iv, ciphertext, tag, None)
            }
            _ => Err(Error::MalformedToken(format!(
                "Compact JWE has {} parts, expected 5",
                parts.len()
            ))),
        }
    }

    fn from_json(json: JweJson) -> Result<Self> {
        let recipients = match json.recipients {
            Some(list) => {
                if json.header.is_some() || json.encrypted_key.is_some() {
                    return Err(Error::MalformedToken(
                        "General JWE mixes 'recipients' with flattened members".into(),
                    ));
                }
                list.into_iter()
                    .map(|r| recipient_from_json(r.header, r.encrypted_key))
                    .collect::<Result<Vec<_>>>()?
            }
            None => vec![recipient_from_json(json.header, json.encrypted_key)?],
        };
        if recipients.is_empty() {
            return Err(Error::MalformedToken("JWE has no recipients".into()));
        }
        let aad = json
            .aad
            .as_deref()
            .map(|aad| decode_part(aad, "aad"))
            .transpose()?;
        Self::parsed(
            json.protected.unwrap_or_default(),
            json.unprotected,
            recipients,
            &json.iv,
            &json.ciphertext,
            &json.tag,
            aad,
        )
    }

    fn parsed(
        protected_encoded: String,
        unprotected: Option<Header>,
        recipients: Vec<JweRecipient>,
        iv: &str,
        ciphertext: &str,
        tag: &str,
        aad: Option<Vec<u8>>,
    ) -> Result<Self> {
        let protected = decode_header(&protected_encoded)?;
        for recipient in &recipients {
            check_disjoint(&[Some(&protected), unprotected.as_ref(), recipient.header.as_ref()])?;
        }
        Ok(Self {
            protected_encoded,
            protected,
            unprotected,
            recipients,
            iv: decode_part(iv, "iv")?,
            ciphertext: decode_part(ciphertext, "ciphertext")?,
            tag: decode_part(tag, "tag")?,
            aad,
        })
    }

    fn single(&self, format: &str) -> Result<&JweRecipient> {
        match self.recipients.as_slice() {
            [recipient] => Ok(recipient),
            other => Err(Error::MalformedToken(format!(
                "{} serialization needs exactly one recipient, token has {}",
                format,
                other.len()
            ))),
        }
    }

    /// Content algorithm with the IV and the JOSE AAD as parameters
    fn content_algorithm(&self, enc: &str) -> Algorithm {
        let mut aad = self.protected_encoded.clone();
        if let Some(extra) = &self.aad {
            aad.push('.');
            aad.push_str(&b64url_encode(extra));
        }
        Algorithm::new(enc)
            .with_param(params::IV, b64url_encode(&self.iv))
            .with_param(params::ADDITIONAL_DATA, b64url_encode(aad.as_bytes()))
    }
}

fn recipient_from_json(header: Option<Header>, encrypted_key: Option<String>) -> Result<JweRecipient> {
    let encrypted_key = match encrypted_key {
        Some(encoded) => decode_part(&encoded, "encrypted_key")?,
        None => Vec::new(),
    };
    Ok(JweRecipient {
        header,
        encrypted_key,
    })
}

fn encrypted_key_json(recipient: &JweRecipient) -> Option<String> {
    (!recipient.encrypted_key.is_empty()).then(|| b64url_encode(&recipient.encrypted_key))
}

// ============================================================================
// KEY MANAGEMENT
// ============================================================================

/// `enc` from the caller's header, else the configured default
fn content_encryption(engine: &CryptoEngine, header: &Header) -> Result<String> {
    Ok(header
        .get(headers::ENC)
        .and_then(Value::as_str)
        .unwrap_or(&engine.config().jwe.content_encryption)
        .to_string())
}

fn content_key_len(enc: &str) -> Result<usize> {
    match enc {
        names::A128GCM => Ok(16),
        names::A256GCM => Ok(32),
        other => Err(Error::UnsupportedOperation(format!("Content encryption {}", other))),
    }
}

fn random_key(enc: &str) -> Result<Zeroizing<Vec<u8>>> {
    let mut cek = Zeroizing::new(vec![0u8; content_key_len(enc)?]);
    OsRng.fill_bytes(&mut cek);
    Ok(cek)
}

fn key_wrap_len(alg: &str) -> Result<usize> {
    match alg {
        names::ECDH_ES_A128KW => Ok(16),
        names::ECDH_ES_A256KW => Ok(32),
        other => Err(Error::UnsupportedOperation(format!("Key agreement {}", other))),
    }
}

fn key_wrap_alg(alg: &str) -> &'static str {
    if alg == names::ECDH_ES_A128KW {
        names::A128KW
    } else {
        names::A256KW
    }
}

/// Pick the key-management algorithm for `recipient` and wrap `cek`
///
/// Returns the recipient's header parameters and the wrapped key.
fn wrap_key(
    engine: &CryptoEngine,
    recipient: &Key,
    cek: &[u8],
    context: &Header,
) -> Result<(Header, Vec<u8>)> {
    let mut header = Header::new();
    if let Some(kid) = recipient.kid() {
        header.insert(headers::KID.into(), Value::String(kid.to_string()));
    }

    let encrypted_key = match recipient {
        Key::Secret(password) => {
            let pbes2 = &engine.config().pbes2;
            let mut salt = vec![0u8; pbes2.salt_len];
            OsRng.fill_bytes(&mut salt);
            let p2s = b64url_encode(&salt);

            let algorithm = Algorithm::new(names::PBES2_HS512_A256KW)
                .with_param(params::SALT, p2s.as_str())
                .with_param(params::ITERATIONS, u64::from(pbes2.iterations));
            header.insert(headers::ALG.into(), Value::String(algorithm.name.clone()));
            header.insert(headers::P2S.into(), Value::String(p2s));
            header.insert(headers::P2C.into(), Value::from(pbes2.iterations));
            engine.encrypt(&algorithm, &Key::Secret(password.clone()), cek)?
        }
        Key::Public(public) => wrap_for_public(engine, public, cek, context, &mut header)?,
        Key::Private(private) => {
            wrap_for_public(engine, &private.public_key(), cek, context, &mut header)?
        }
    };
    Ok((header, encrypted_key))
}

fn wrap_for_public(
    engine: &CryptoEngine,
    recipient: &PublicKey,
    cek: &[u8],
    context: &Header,
    header: &mut Header,
) -> Result<Vec<u8>> {
    let curve = match &recipient.material {
        PublicKeyMaterial::Rsa { .. } => {
            header.insert(headers::ALG.into(), Value::String(names::RSA_OAEP_256.into()));
            let algorithm = Algorithm::new(names::RSA_OAEP_256);
            return engine.encrypt(&algorithm, &Key::Public(recipient.clone()), cek);
        }
        PublicKeyMaterial::Ec { crv, .. } if curves::is_secp256k1(crv) => curves::SECP256K1,
        PublicKeyMaterial::Okp { crv, .. } if crv == curves::X25519 => curves::X25519,
        PublicKeyMaterial::Ec { crv, .. } | PublicKeyMaterial::Okp { crv, .. } => {
            return Err(Error::UnsupportedKeyForEncryption(format!(
                "{} key on {}",
                recipient.kty(),
                crv
            )))
        }
    };

    let alg = names::ECDH_ES_A256KW;
    let ephemeral = engine.generate_ephemeral_key(curve)?;
    let shared = Zeroizing::new(engine.derive_bits(&Algorithm::new(names::ECDH_ES), &ephemeral, recipient)?);
    let (apu, apv) = party_info(&[Some(context)])?;
    let kek = concat_kdf(engine, &shared, alg, key_wrap_len(alg)?, &apu, &apv)?;

    let mut epk = ephemeral.public_key().to_jwk();
    epk.kid = None;
    epk.alg = None;
    epk.key_ops = None;
    header.insert(headers::ALG.into(), Value::String(alg.into()));
    header.insert(headers::EPK.into(), serde_json::to_value(&epk)?);

    let kek = Key::Secret(SecretKey::from_bytes(kek.to_vec()));
    engine.encrypt(&Algorithm::new(key_wrap_alg(alg)), &kek, cek)
}

/// Recover the CEK for one recipient
fn unwrap_key(
    engine: &CryptoEngine,
    layers: &[Option<&Header>],
    alg: &str,
    enc: &str,
    key: &Key,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cek = match alg {
        names::ECDH_ES | names::ECDH_ES_A128KW | names::ECDH_ES_A256KW => {
            let private = match key {
                Key::Private(private) => private,
                _ => return Err(Error::InvalidKey(format!("{} needs a private key", alg))),
            };
            let epk = header_value(layers, headers::EPK)
                .ok_or_else(|| Error::MalformedToken(format!("{} header has no epk", alg)))?;
            let epk: Jwk = serde_json::from_value(epk.clone())
                .map_err(|e| Error::MalformedToken(format!("epk: {}", e)))?;
            let epk = PublicKey::from_jwk(&epk)?;

            let shared = Zeroizing::new(engine.derive_bits(&Algorithm::new(names::ECDH_ES), private, &epk)?);
            let (apu, apv) = party_info(layers)?;
            if alg == names::ECDH_ES {
                // direct agreement: the derived key is the CEK
                return concat_kdf(engine, &shared, enc, content_key_len(enc)?, &apu, &apv);
            }
            let kek = concat_kdf(engine, &shared, alg, key_wrap_len(alg)?, &apu, &apv)?;
            let kek = Key::Secret(SecretKey::from_bytes(kek.to_vec()));
            engine.decrypt(&Algorithm::new(key_wrap_alg(alg)), &kek, encrypted_key)?
        }
        names::PBES2_HS256_A128KW | names::PBES2_HS512_A256KW => {
            let p2s = header_value(layers, headers::P2S)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::MalformedToken("PBES2 header has no p2s".into()))?;
            let p2c = header_value(layers, headers::P2C)
                .and_then(Value::as_u64)
                .ok_or_else(|| Error::MalformedToken("PBES2 header has no p2c".into()))?;
            let max_iterations = engine.config().pbes2.max_iterations;
            if p2c > u64::from(max_iterations) {
                return Err(Error::DecryptionFailed(format!(
                    "p2c {} exceeds the limit of {}",
                    p2c, max_iterations
                )));
            }
            let algorithm = Algorithm::new(alg)
                .with_param(params::SALT, p2s)
                .with_param(params::ITERATIONS, p2c);
            engine.decrypt(&algorithm, key, encrypted_key)?
        }
        _ => engine.decrypt(&Algorithm::new(alg), key, encrypted_key)?,
    };
    Ok(Zeroizing::new(cek))
}

fn header_value<'a>(layers: &[Option<&'a Header>], name: &str) -> Option<&'a Value> {
    layers.iter().flatten().find_map(|header| header.get(name))
}

/// Decoded `apu` / `apv`, empty when absent
fn party_info(layers: &[Option<&Header>]) -> Result<(Vec<u8>, Vec<u8>)> {
    let decode = |name: &str| match header_str(layers, name) {
        Some(encoded) => decode_part(encoded, name),
        None => Ok(Vec::new()),
    };
    Ok((decode(headers::APU)?, decode(headers::APV)?))
}

/// Concat KDF (NIST SP 800-56A, RFC 7518 §4.6.2) with SHA-256
///
/// `OtherInfo = len‖AlgorithmID ‖ len‖apu ‖ len‖apv ‖ keydatalen`, lengths as
/// 32-bit big-endian.
fn concat_kdf(
    engine: &CryptoEngine,
    shared_secret: &[u8],
    algorithm_id: &str,
    key_len: usize,
    apu: &[u8],
    apv: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let mut other_info = Vec::new();
    for field in [algorithm_id.as_bytes(), apu, apv] {
        other_info.extend_from_slice(&(field.len() as u32).to_be_bytes());
        other_info.extend_from_slice(field);
    }
    other_info.extend_from_slice(&((key_len * 8) as u32).to_be_bytes());

    let rounds = (key_len + KDF_HASH_SIZE - 1) / KDF_HASH_SIZE;
    let mut derived = Zeroizing::new(Vec::with_capacity(rounds * KDF_HASH_SIZE));
    for counter in 1..=rounds as u32 {
        let mut input = Zeroizing::new(Vec::with_capacity(4 + shared_secret.len() + other_info.len()));
        input.extend_from_slice(&counter.to_be_bytes());
        input.extend_from_slice(shared_secret);
        input.extend_from_slice(&other_info);
        derived.extend_from_slice(&engine.digest(names::SHA256, &input)?);
    }
    derived.truncate(key_len);
    Ok(derived)
}
