//! Issuance of license tokens for other machines.

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{LicenseError, LicenseResult};
use crate::token::{EXTRA_NONCE, EXTRA_SECRET, EXTRA_SITE, LicensePayload, LicenseTier, LicenseToken, encode};
use crate::validator::LicenseSecrets;

/// Validity period for user tiers without a default.
const USER_FALLBACK_DAYS: i64 = 30;

/// Mints tokens with the configured secrets.
#[derive(Debug, Clone, Default)]
pub struct LicenseIssuer {
    secrets: LicenseSecrets,
}

impl LicenseIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(secrets: LicenseSecrets) -> Self {
        Self { secrets }
    }

    /// Encodes an arbitrary payload with the master secret for its tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn issue(&self, payload: &LicensePayload) -> LicenseResult<LicenseToken> {
        encode(payload, self.secrets.master_secret_for(payload.tier))
    }

    /// Issues a site license for an institution.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn issue_site(&self, hardware_id: &str, site_name: &str) -> LicenseResult<LicenseToken> {
        let payload = Self::payload(hardware_id, LicenseTier::Site, LicenseTier::Site.default_duration_days())?
            .with_extra(EXTRA_SITE, site_name);
        self.issue(&payload)
    }

    /// Issues an administrator license.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn issue_admin(&self, hardware_id: &str) -> LicenseResult<LicenseToken> {
        let payload = Self::payload(hardware_id, LicenseTier::Admin, LicenseTier::Admin.default_duration_days())?
            .with_extra(EXTRA_SECRET, self.secrets.admin.clone());
        self.issue(&payload)
    }

    /// Issues a free, trial or professional license valid for `days` days,
    /// or the tier's default period when `days` is None.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::UnsupportedTier`] for administrator and site
    /// tiers, which have their own issuance paths, and
    /// [`LicenseError::InvalidDuration`] if `days` is not positive or the
    /// expiry date cannot be represented.
    pub fn issue_user(&self, hardware_id: &str, tier: LicenseTier, days: Option<i64>) -> LicenseResult<LicenseToken> {
        if matches!(tier, LicenseTier::Admin | LicenseTier::Site) {
            return Err(LicenseError::UnsupportedTier(tier));
        }
        let days = days.or(tier.default_duration_days()).unwrap_or(USER_FALLBACK_DAYS);
        let payload = Self::payload(hardware_id, tier, Some(days))?
            .with_extra(EXTRA_NONCE, format!("{:08x}", rand::random::<u32>()));
        self.issue(&payload)
    }

    fn payload(hardware_id: &str, tier: LicenseTier, days: Option<i64>) -> LicenseResult<LicensePayload> {
        let created = issue_timestamp();
        let expires = days.map(|d| expiry_after(created, d)).transpose()?;
        Ok(LicensePayload::new(hardware_id, tier, created, expires))
    }
}

fn expiry_after(created: NaiveDateTime, days: i64) -> LicenseResult<NaiveDateTime> {
    if days <= 0 {
        return Err(LicenseError::InvalidDuration(days));
    }
    TimeDelta::try_days(days)
        .and_then(|delta| created.checked_add_signed(delta))
        .ok_or(LicenseError::InvalidDuration(days))
}

/// Returns the local time truncated to microseconds.
#[must_use]
pub fn issue_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.with_nanosecond(micros).unwrap_or(now)
}

/// Returns the export file name for a license issued to `hardware_id`.
#[must_use]
pub fn issued_file_name(hardware_id: &str) -> String {
    let prefix: String = hardware_id.chars().take(8).collect();
    format!("license_{prefix}.lic")
}

/// Writes an issued token to `dir` for delivery to its machine.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_issued(dir: &Path, hardware_id: &str, token: &LicenseToken) -> LicenseResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(issued_file_name(hardware_id));
    fs::write(&path, token.as_str())?;
    info!(path = %path.display(), "Issued license written");
    Ok(path)
}
