//! Licensing for Iman Accounting.
//!
//! This crate handles:
//! - Hardware fingerprinting for machine binding
//! - Encoding and decoding of license tokens
//! - Validation of tokens against the current machine and clock
//! - Persistence of activated tokens in fixed slot files
//! - Issuance of new tokens by administrators
//!
//! # Token Format
//!
//! Tokens are formatted as `base64(secret_hash ":" payload_json) "-" checksum`.
//! The checksum is the first 8 hex characters of the MD5 digest of the base64
//! body and only detects corruption. The secret hash is a SHA-256 hex digest of
//! a symmetric secret shipped with the application.
//!
//! # Security
//!
//! Both secrets are embedded in the binary, so anyone holding it can mint valid
//! tokens. The checksum is not a signature. This scheme exists for compatibility
//! with tokens already issued to customers.

mod device;
mod error;
mod issuer;
mod store;
mod token;
mod validator;

pub use device::{FINGERPRINT_LEN, HardwareFingerprint, HardwareProbe, SystemProbe, parse_mac};
pub use error::{LicenseError, LicenseResult};
pub use issuer::{LicenseIssuer, issue_timestamp, issued_file_name, write_issued};
pub use store::{LicenseSlot, LicenseState, LicenseStore};
pub use token::{
    CHECKSUM_LEN, DecodedToken, EXTRA_NONCE, EXTRA_SECRET, EXTRA_SITE, LicensePayload,
    LicenseTier, LicenseToken, RESERVED_KEYS, checksum, decode, encode, secret_hash,
};
pub use validator::{ADMIN_SECRET, APPLICATION_SECRET, LicenseSecrets, LicenseValidator, Verdict};
