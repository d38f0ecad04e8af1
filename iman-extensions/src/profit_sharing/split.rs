//! Splitting a profit (or loss) between partners by whole percentages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    pub percent: u32,
}

impl Partner {
    pub fn new(name: impl Into<String>, percent: u32) -> Self {
        Self {
            name: name.into(),
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerShare {
    pub name: String,
    pub percent: u32,
    /// Share in rials.
    pub share: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSplit {
    /// Amount being split, in rials. Negative for a loss.
    pub total_profit: i64,
    pub partners: Vec<PartnerShare>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("no partners defined")]
    NoPartners,

    #[error("partner #{0} has no name")]
    UnnamedPartner(usize),

    #[error("partner '{name}' has percent {percent}, expected 1 to 100")]
    PercentOutOfRange { name: String, percent: u32 },

    #[error("partner percents must add up to 100, got {0}")]
    PercentTotal(u32),
}

/// Splits `total_profit` between `partners`.
///
/// Each share is `total_profit * percent / 100` rounded toward negative
/// infinity, so shares of an uneven amount may not add back up to the total.
pub fn split(total_profit: i64, partners: &[Partner]) -> Result<ProfitSplit, SplitError> {
    if partners.is_empty() {
        return Err(SplitError::NoPartners);
    }

    for (i, partner) in partners.iter().enumerate() {
        if partner.name.trim().is_empty() {
            return Err(SplitError::UnnamedPartner(i + 1));
        }
        if !(1..=100).contains(&partner.percent) {
            return Err(SplitError::PercentOutOfRange {
                name: partner.name.clone(),
                percent: partner.percent,
            });
        }
    }

    let total_percent: u32 = partners.iter().map(|p| p.percent).sum();
    if total_percent != 100 {
        return Err(SplitError::PercentTotal(total_percent));
    }

    let partners = partners
        .iter()
        .map(|p| PartnerShare {
            name: p.name.clone(),
            percent: p.percent,
            share: share_of(total_profit, p.percent),
        })
        .collect();

    Ok(ProfitSplit {
        total_profit,
        partners,
    })
}

fn share_of(total: i64, percent: u32) -> i64 {
    // |share| <= |total| because percent <= 100, so the narrowing cannot overflow.
    (i128::from(total) * i128::from(percent)).div_euclid(100) as i64
}

/// Sample split shown when no figures are supplied.
pub fn sample_split() -> ProfitSplit {
    let partners = [
        Partner::new("Partner one", 40),
        Partner::new("Partner two", 35),
        Partner::new("Partner three", 25),
    ];
    ProfitSplit {
        total_profit: 10_000_000,
        partners: partners
            .iter()
            .map(|p| PartnerShare {
                name: p.name.clone(),
                percent: p.percent,
                share: share_of(10_000_000, p.percent),
            })
            .collect(),
    }
}

/// Renders a plain-text report for `split` dated `date`.
pub fn render_report(split: &ProfitSplit, date: NaiveDate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Profit sharing report");
    let _ = writeln!(out, "=====================");
    let _ = writeln!(out, "Date: {}", date.format("%Y/%m/%d"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Total profit: {} rials", group_thousands(split.total_profit));
    let _ = writeln!(out);
    let _ = writeln!(out, "Partners:");
    for (i, partner) in split.partners.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}: {} rials ({}%)",
            i + 1,
            partner.name,
            group_thousands(partner.share),
            partner.percent
        );
    }
    out
}

/// Formats `value` with comma thousands separators.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
