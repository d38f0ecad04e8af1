//! Persistence of activated tokens.
//!
//! Each activated token lives in one of three slot files inside the license
//! directory. Startup probes the slots in a fixed priority order and adopts the
//! first one that validates.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::LicenseResult;
use crate::token::LicenseTier;
use crate::validator::{LicenseValidator, Verdict};

/// A persisted token location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseSlot {
    /// Site license.
    Site,
    /// Administrator license.
    Admin,
    /// Any other tier.
    Standard,
}

impl LicenseSlot {
    /// Slots in the order they are probed at startup.
    pub const PRIORITY: [Self; 3] = [Self::Site, Self::Admin, Self::Standard];

    /// Returns the slot file name.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Site => "site.lic",
            Self::Admin => "admin.lic",
            Self::Standard => "license.lic",
        }
    }

    /// Returns the slot an accepted token of `tier` is written to.
    #[must_use]
    pub fn for_tier(tier: LicenseTier) -> Self {
        match tier {
            LicenseTier::Site => Self::Site,
            LicenseTier::Admin => Self::Admin,
            _ => Self::Standard,
        }
    }
}

/// The license state of the running application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseState {
    /// Effective tier.
    pub tier: LicenseTier,
    /// True for administrator licenses.
    pub is_admin: bool,
    /// True for site licenses.
    pub is_site: bool,
    /// The active token, if any.
    pub token: Option<String>,
    /// Fingerprint of this machine.
    pub hardware_id: String,
    /// Slot the active token was loaded from or written to.
    pub slot: Option<LicenseSlot>,
}

impl LicenseState {
    /// Free state for the given machine.
    #[must_use]
    pub fn free(hardware_id: impl Into<String>) -> Self {
        Self {
            tier: LicenseTier::Free,
            is_admin: false,
            is_site: false,
            token: None,
            hardware_id: hardware_id.into(),
            slot: None,
        }
    }

    fn accepted(tier: LicenseTier, token: &str, hardware_id: &str, slot: LicenseSlot) -> Self {
        Self {
            tier,
            is_admin: tier == LicenseTier::Admin,
            is_site: tier == LicenseTier::Site,
            token: Some(token.to_string()),
            hardware_id: hardware_id.to_string(),
            slot: Some(slot),
        }
    }

    /// Returns true if no license is active.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.tier == LicenseTier::Free
    }

    /// Returns true if this state may issue licenses for other machines.
    #[must_use]
    pub fn can_issue_licenses(&self) -> bool {
        self.is_admin
    }

    /// Returns true for administrator or site licenses.
    #[must_use]
    pub fn has_unlimited_access(&self) -> bool {
        self.is_admin || self.is_site
    }
}

/// Reads and writes slot files in a license directory.
#[derive(Debug, Clone)]
pub struct LicenseStore {
    dir: PathBuf,
    validator: LicenseValidator,
}

impl LicenseStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, validator: LicenseValidator) -> Self {
        Self {
            dir: dir.into(),
            validator,
        }
    }

    /// Returns the license directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the validator.
    #[must_use]
    pub fn validator(&self) -> &LicenseValidator {
        &self.validator
    }

    /// Returns the path of a slot file.
    #[must_use]
    pub fn slot_path(&self, slot: LicenseSlot) -> PathBuf {
        self.dir.join(slot.file_name())
    }

    /// Reads the token stored in `slot`, or None if the slot file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot file exists but cannot be read.
    pub fn read_slot(&self, slot: LicenseSlot) -> LicenseResult<Option<String>> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Determines the license state at startup.
    #[must_use]
    pub fn load(&self) -> LicenseState {
        self.load_at(Local::now().naive_local())
    }

    /// Determines the license state as of `now`.
    ///
    /// Slots are probed in [`LicenseSlot::PRIORITY`] order. The first slot whose
    /// token validates wins. Missing, unreadable or rejected slots are skipped.
    /// If no slot validates, the state is free. Slot files are never modified.
    #[must_use]
    pub fn load_at(&self, now: NaiveDateTime) -> LicenseState {
        let hardware_id = self.validator.fingerprint().id();

        for slot in LicenseSlot::PRIORITY {
            let token = match self.read_slot(slot) {
                Ok(Some(token)) => token,
                Ok(None) => continue,
                Err(e) => {
                    warn!(slot = slot.file_name(), error = %e, "License slot unreadable, skipping");
                    continue;
                }
            };

            match self.validator.validate_at(&token, now) {
                Verdict::Accepted { tier, .. } => {
                    info!(slot = slot.file_name(), tier = %tier, "License loaded");
                    return LicenseState::accepted(tier, &token, hardware_id, slot);
                }
                Verdict::Rejected(e) => {
                    warn!(slot = slot.file_name(), error = %e, "Stored license rejected");
                }
            }
        }

        debug!("No valid license found, running as free tier");
        LicenseState::free(hardware_id)
    }

    /// Validates `token` and, if accepted, writes it to its slot.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason, or an I/O error if the slot cannot be
    /// written. Nothing is written for a rejected token.
    pub fn activate(&self, token: &str) -> LicenseResult<LicenseState> {
        self.activate_at(token, Local::now().naive_local())
    }

    /// Activates `token` as of `now`.
    ///
    /// # Errors
    ///
    /// See [`LicenseStore::activate`].
    pub fn activate_at(&self, token: &str, now: NaiveDateTime) -> LicenseResult<LicenseState> {
        let token = token.trim();
        let (tier, _) = self.validator.validate_at(token, now).into_result()?;
        let slot = LicenseSlot::for_tier(tier);

        fs::create_dir_all(&self.dir)?;
        fs::write(self.slot_path(slot), token)?;
        info!(slot = slot.file_name(), tier = %tier, "License activated");

        Ok(LicenseState::accepted(tier, token, self.validator.fingerprint().id(), slot))
    }
}
