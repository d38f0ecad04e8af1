//! Error types for the licensing module.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::token::LicenseTier;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Token is not structurally a license token.
    #[error("invalid license format: {0}")]
    MalformedToken(String),

    /// Checksum does not match the token body.
    #[error("license token is corrupted or has been modified")]
    TamperedToken,

    /// Token was issued for another machine.
    #[error("license is not valid for this machine")]
    HardwareMismatch,

    /// Administrator token carries the wrong secret.
    #[error("invalid administrator license")]
    SecretMismatch,

    /// License has expired.
    #[error("license expired on {}", .0.format("%Y/%m/%d"))]
    Expired(NaiveDateTime),

    /// Standard tier token without an expiry date.
    #[error("license has no expiry date")]
    MissingExpiry,

    /// Tier cannot be issued through the requested path.
    #[error("tier {0} cannot be issued as a user license")]
    UnsupportedTier(LicenseTier),

    /// Validity period is not a positive, representable number of days.
    #[error("invalid license duration: {0} days")]
    InvalidDuration(i64),

    /// Extra key collides with a payload field.
    #[error("extra key '{0}' is reserved")]
    ReservedExtraKey(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
