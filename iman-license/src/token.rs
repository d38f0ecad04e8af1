//! License token encoding and decoding.
//!
//! Tokens use the format `base64(secret_hash ":" payload_json) "-" checksum`:
//!
//! - `secret_hash`: SHA-256 hex digest of the master secret used at issuance
//! - `payload_json`: the [`LicensePayload`] as a JSON object
//! - `checksum`: first [`CHECKSUM_LEN`] hex characters of the MD5 digest of the
//!   base64 body
//!
//! Decoding never checks the secret hash. It is carried through in
//! [`DecodedToken`] for callers that want it.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::NaiveDateTime;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{LicenseError, LicenseResult};

/// Number of hex characters in the token checksum.
pub const CHECKSUM_LEN: usize = 8;

/// Extra payload key holding the administrator secret.
pub const EXTRA_SECRET: &str = "secret";
/// Extra payload key holding the site (institution) name.
pub const EXTRA_SITE: &str = "school";
/// Extra payload key holding the per-issue nonce.
pub const EXTRA_NONCE: &str = "random";

/// Payload field names that extra keys may not reuse.
pub const RESERVED_KEYS: [&str; 4] = ["hwid", "type", "created", "expiry"];

const SECRET_SEPARATOR: char = ':';
const CHECKSUM_SEPARATOR: char = '-';

/// License tier.
///
/// Serialized with the wire names used by existing tokens. Unknown names
/// decode as [`LicenseTier::Free`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LicenseTier {
    /// Unlicensed or unrecognized.
    Free,
    /// Limited-time evaluation.
    Trial,
    /// Paid single-machine license.
    Professional,
    /// Administrator license, able to issue other licenses.
    Admin,
    /// Site license for an institution, never expires.
    Site,
}

impl LicenseTier {
    /// Returns the name stored in token payloads.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Trial => "TRIAL",
            Self::Professional => "PRO",
            Self::Admin => "ADMIN",
            Self::Site => "SCHOOL",
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Trial => "Trial",
            Self::Professional => "Professional",
            Self::Admin => "Administrator",
            Self::Site => "Site",
        }
    }

    /// Returns the validity period used when issuing this tier, or None for free.
    #[must_use]
    pub fn default_duration_days(&self) -> Option<i64> {
        match self {
            Self::Free => None,
            Self::Trial => Some(30),
            Self::Professional => Some(365),
            Self::Admin | Self::Site => Some(3650),
        }
    }

    /// Returns true if validation enforces the expiry date for this tier.
    #[must_use]
    pub fn checks_expiry(&self) -> bool {
        !matches!(self, Self::Admin | Self::Site)
    }

    fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "FREE" => Some(Self::Free),
            "TRIAL" => Some(Self::Trial),
            "PRO" | "PROFESSIONAL" => Some(Self::Professional),
            "ADMIN" | "ADMINISTRATOR" => Some(Self::Admin),
            "SCHOOL" | "SITE" => Some(Self::Site),
            _ => None,
        }
    }
}

impl From<String> for LicenseTier {
    fn from(name: String) -> Self {
        Self::parse_name(&name).unwrap_or(Self::Free)
    }
}

impl From<LicenseTier> for String {
    fn from(tier: LicenseTier) -> Self {
        tier.wire_name().to_string()
    }
}

impl FromStr for LicenseTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s).ok_or_else(|| format!("unknown license tier: {s}"))
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// The decoded license payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// Fingerprint of the machine the license is bound to.
    #[serde(rename = "hwid")]
    pub hardware_id: String,
    /// License tier.
    #[serde(rename = "type")]
    pub tier: LicenseTier,
    /// Issue time (local, naive).
    #[serde(rename = "created")]
    pub created_at: NaiveDateTime,
    /// Expiry time (local, naive).
    #[serde(rename = "expiry", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDateTime>,
    /// Any other keys, such as the site name or administrator secret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl LicensePayload {
    /// Creates a payload without extra keys.
    #[must_use]
    pub fn new(
        hardware_id: impl Into<String>,
        tier: LicenseTier,
        created_at: NaiveDateTime,
        expires_at: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            hardware_id: hardware_id.into(),
            tier,
            created_at,
            expires_at,
            extra: BTreeMap::new(),
        }
    }

    /// Adds an extra key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the administrator secret, if present.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.extra.get(EXTRA_SECRET).map(String::as_str)
    }

    /// Returns the site name, if present.
    #[must_use]
    pub fn site_name(&self) -> Option<&str> {
        self.extra.get(EXTRA_SITE).map(String::as_str)
    }

    /// Returns true if the payload has an expiry strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }
}

/// An encoded license token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseToken(String);

impl LicenseToken {
    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Decodes this token.
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(&self) -> LicenseResult<DecodedToken> {
        decode(&self.0)
    }
}

impl fmt::Display for LicenseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LicenseToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A structurally valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    /// The decoded payload.
    pub payload: LicensePayload,
    /// SHA-256 hex digest of the master secret embedded at issuance.
    pub secret_hash: String,
}

/// Returns the SHA-256 hex digest of `secret`.
#[must_use]
pub fn secret_hash(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Returns the checksum of a base64 token body.
#[must_use]
pub fn checksum(body: &str) -> String {
    let mut digest = hex::encode(Md5::digest(body.as_bytes()));
    digest.truncate(CHECKSUM_LEN);
    digest
}

/// Encodes `payload` into a token, embedding the hash of `master_secret`.
///
/// # Errors
///
/// Returns [`LicenseError::ReservedExtraKey`] if an extra key shadows a
/// payload field, or an error if the payload cannot be serialized.
pub fn encode(payload: &LicensePayload, master_secret: &str) -> LicenseResult<LicenseToken> {
    if let Some(key) = payload.extra.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
        return Err(LicenseError::ReservedExtraKey(key.clone()));
    }
    let json = serde_json::to_string(payload)?;
    let body = BASE64.encode(format!("{}{SECRET_SEPARATOR}{json}", secret_hash(master_secret)));
    let sum = checksum(&body);
    Ok(LicenseToken(format!("{body}{CHECKSUM_SEPARATOR}{sum}")))
}

/// Decodes a token.
///
/// Surrounding whitespace is ignored. The checksum is verified before the body
/// is base64-decoded.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedToken`] if the token has no checksum
/// separator, is not valid base64, lacks the secret separator, or carries an
/// unparseable payload. Returns [`LicenseError::TamperedToken`] if the
/// checksum does not match.
pub fn decode(token: &str) -> LicenseResult<DecodedToken> {
    let token = token.trim();
    let (body, sum) = token
        .rsplit_once(CHECKSUM_SEPARATOR)
        .ok_or_else(|| LicenseError::MalformedToken("missing checksum".into()))?;

    if checksum(body) != sum {
        return Err(LicenseError::TamperedToken);
    }

    let raw = BASE64
        .decode(body)
        .map_err(|e| LicenseError::MalformedToken(format!("invalid base64: {e}")))?;
    let text = String::from_utf8(raw)
        .map_err(|_| LicenseError::MalformedToken("body is not UTF-8".into()))?;
    let (hash, json) = text
        .split_once(SECRET_SEPARATOR)
        .ok_or_else(|| LicenseError::MalformedToken("missing secret separator".into()))?;
    let payload: LicensePayload = serde_json::from_str(json)
        .map_err(|e| LicenseError::MalformedToken(format!("invalid payload: {e}")))?;

    Ok(DecodedToken {
        payload,
        secret_hash: hash.to_string(),
    })
}
