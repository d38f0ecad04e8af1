//! Validation of license tokens against this machine and the clock.

use chrono::{Local, NaiveDateTime};

use crate::device::HardwareFingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::token::{LicensePayload, LicenseTier, decode};

/// Master secret for all non-administrator tokens.
pub const APPLICATION_SECRET: &str = "ایمان حسابداری";

/// Master secret for administrator tokens, also stored in their payload.
pub const ADMIN_SECRET: &str = "Iman@Admin@2024#SuperSecret";

/// The pair of symmetric secrets shared by issuer and validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseSecrets {
    /// Secret hashed into every non-administrator token.
    pub application: String,
    /// Secret hashed into administrator tokens and compared on validation.
    pub admin: String,
}

impl Default for LicenseSecrets {
    fn default() -> Self {
        Self {
            application: APPLICATION_SECRET.to_string(),
            admin: ADMIN_SECRET.to_string(),
        }
    }
}

impl LicenseSecrets {
    /// Returns the master secret embedded when issuing `tier`.
    #[must_use]
    pub fn master_secret_for(&self, tier: LicenseTier) -> &str {
        match tier {
            LicenseTier::Admin => &self.admin,
            _ => &self.application,
        }
    }
}

/// Outcome of validating a token.
#[derive(Debug)]
pub enum Verdict {
    /// Token is valid for this machine at the validation time.
    Accepted {
        /// Effective tier.
        tier: LicenseTier,
        /// The decoded payload.
        payload: LicensePayload,
    },
    /// Token was rejected.
    Rejected(LicenseError),
}

impl Verdict {
    /// Returns true if the token was accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Returns the effective tier, which is free for a rejected token.
    #[must_use]
    pub fn tier(&self) -> LicenseTier {
        match self {
            Self::Accepted { tier, .. } => *tier,
            Self::Rejected(_) => LicenseTier::Free,
        }
    }

    /// Returns a message suitable for showing to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Accepted { tier: LicenseTier::Site, payload } => match payload.site_name() {
                Some(site) if !site.is_empty() => format!("site license activated for {site}"),
                _ => "site license activated".to_string(),
            },
            Self::Accepted { tier: LicenseTier::Admin, .. } => "administrator license activated".to_string(),
            Self::Accepted { tier, .. } => format!("{} license activated", tier.label().to_lowercase()),
            Self::Rejected(err) => err.to_string(),
        }
    }

    /// Converts the verdict into a result.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason.
    pub fn into_result(self) -> LicenseResult<(LicenseTier, LicensePayload)> {
        match self {
            Self::Accepted { tier, payload } => Ok((tier, payload)),
            Self::Rejected(err) => Err(err),
        }
    }
}

/// Validates tokens for one machine.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    fingerprint: HardwareFingerprint,
    secrets: LicenseSecrets,
}

impl LicenseValidator {
    /// Creates a validator bound to `fingerprint`.
    #[must_use]
    pub fn new(fingerprint: HardwareFingerprint, secrets: LicenseSecrets) -> Self {
        Self { fingerprint, secrets }
    }

    /// Creates a validator for the current machine with the built-in secrets.
    #[must_use]
    pub fn for_current_machine() -> Self {
        Self::new(HardwareFingerprint::generate(), LicenseSecrets::default())
    }

    /// Returns the fingerprint this validator binds to.
    #[must_use]
    pub fn fingerprint(&self) -> &HardwareFingerprint {
        &self.fingerprint
    }

    /// Returns the secrets in use.
    #[must_use]
    pub fn secrets(&self) -> &LicenseSecrets {
        &self.secrets
    }

    /// Validates `token` against the local clock.
    #[must_use]
    pub fn validate(&self, token: &str) -> Verdict {
        self.validate_at(token, Local::now().naive_local())
    }

    /// Validates `token` as of `now`.
    ///
    /// Rules apply in order: structure and checksum, machine binding, then
    /// tier-specific checks. Administrator tokens must carry the administrator
    /// secret and never expire. Site tokens never expire. Every other tier must
    /// carry an expiry no earlier than `now`.
    #[must_use]
    pub fn validate_at(&self, token: &str, now: NaiveDateTime) -> Verdict {
        match self.check(token, now) {
            Ok((tier, payload)) => Verdict::Accepted { tier, payload },
            Err(err) => Verdict::Rejected(err),
        }
    }

    fn check(&self, token: &str, now: NaiveDateTime) -> LicenseResult<(LicenseTier, LicensePayload)> {
        let payload = decode(token)?.payload;

        if !self.fingerprint.matches(&payload.hardware_id) {
            return Err(LicenseError::HardwareMismatch);
        }

        let tier = payload.tier;
        match tier {
            LicenseTier::Admin => {
                if payload.secret() != Some(self.secrets.admin.as_str()) {
                    return Err(LicenseError::SecretMismatch);
                }
            }
            LicenseTier::Site => {}
            _ => match payload.expires_at {
                None => return Err(LicenseError::MissingExpiry),
                Some(expiry) if expiry < now => return Err(LicenseError::Expired(expiry)),
                Some(_) => {}
            },
        }

        Ok((tier, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{EXTRA_SITE, encode};
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn validator() -> LicenseValidator {
        LicenseValidator::new(HardwareFingerprint::from_id("machine-a"), LicenseSecrets::default())
    }

    #[test]
    fn master_secret_selection() {
        let secrets = LicenseSecrets::default();
        assert_eq!(secrets.master_secret_for(LicenseTier::Admin), ADMIN_SECRET);
        assert_eq!(secrets.master_secret_for(LicenseTier::Site), APPLICATION_SECRET);
    }

    #[test]
    fn standard_tier_without_expiry_is_rejected() {
        let payload = LicensePayload::new("machine-a", LicenseTier::Professional, now(), None);
        let token = encode(&payload, APPLICATION_SECRET).unwrap();
        let verdict = validator().validate_at(token.as_str(), now());
        assert!(matches!(verdict, Verdict::Rejected(LicenseError::MissingExpiry)));
        assert_eq!(verdict.tier(), LicenseTier::Free);
    }

    #[test]
    fn site_message_names_the_site() {
        let payload = LicensePayload::new("machine-a", LicenseTier::Site, now(), Some(now() - Duration::days(1)))
            .with_extra(EXTRA_SITE, "Farabi High");
        let token = encode(&payload, APPLICATION_SECRET).unwrap();
        let verdict = validator().validate_at(token.as_str(), now());
        assert!(verdict.is_accepted());
        assert_eq!(verdict.message(), "site license activated for Farabi High");
    }

    #[test]
    fn rejection_message_is_error_text() {
        let verdict = validator().validate_at("garbage", now());
        assert!(verdict.message().contains("invalid license format"));
    }
}
