//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use iman_license::{
    APPLICATION_SECRET, EXTRA_SECRET, EXTRA_SITE, HardwareFingerprint, LicensePayload, LicenseSecrets,
    LicenseTier, LicenseValidator, encode,
};

pub const MACHINE: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";
pub const OTHER_MACHINE: &str = "ffffffffffffffffffffffffffffffff";

/// Fixed reference clock for deterministic expiry checks.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 20)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn validator() -> LicenseValidator {
    LicenseValidator::new(HardwareFingerprint::from_id(MACHINE), LicenseSecrets::default())
}

/// Payload for `MACHINE` created a day before `now()` and expiring after `days`.
pub fn payload(tier: LicenseTier, days: i64) -> LicensePayload {
    LicensePayload::new(
        MACHINE,
        tier,
        now() - Duration::days(1),
        Some(now() + Duration::days(days)),
    )
}

/// Encodes a standard-tier token with the application secret.
pub fn standard_token(tier: LicenseTier, days: i64) -> String {
    encode(&payload(tier, days), APPLICATION_SECRET).unwrap().into_string()
}

pub fn admin_token(secret: &str) -> String {
    let payload = payload(LicenseTier::Admin, 3650).with_extra(EXTRA_SECRET, secret);
    encode(&payload, secret).unwrap().into_string()
}

pub fn site_token(days: i64) -> String {
    let payload = payload(LicenseTier::Site, days).with_extra(EXTRA_SITE, "Test School");
    encode(&payload, APPLICATION_SECRET).unwrap().into_string()
}
