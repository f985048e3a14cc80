//! Trade Fee Schedule
//!
//! Fees are basis points of the gross trade amount. The total fee and each
//! recipient's fee are truncated independently, so `creator + admin` can be
//! smaller than `total`. The remainder is not paid to anyone: on a buy it is
//! excluded from the reserve increment, on a sell it is withheld from the
//! seller. In both cases it stays in the exchange's currency balance.

use serde::{Deserialize, Serialize};

use lib_types::{Amount, Bps, BPS_DENOMINATOR};

use crate::errors::{ExchangeError, ExchangeResult};

/// Default total fee (0.08%)
pub const DEFAULT_TOTAL_FEE_BPS: Bps = 8;
/// Default creator share (0.05%)
pub const DEFAULT_CREATOR_FEE_BPS: Bps = 5;
/// Default admin share (0.03%)
pub const DEFAULT_ADMIN_FEE_BPS: Bps = 3;

/// Fee rates applied to every buy and sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fee withheld from the gross amount
    pub total_bps: Bps,
    /// Portion paid to the creator
    pub creator_bps: Bps,
    /// Portion paid to the admin
    pub admin_bps: Bps,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            total_bps: DEFAULT_TOTAL_FEE_BPS,
            creator_bps: DEFAULT_CREATOR_FEE_BPS,
            admin_bps: DEFAULT_ADMIN_FEE_BPS,
        }
    }
}

impl FeeSchedule {
    /// Check `creator + admin <= total <= 100%`
    pub fn validate(&self) -> ExchangeResult<()> {
        if Amount::from(self.total_bps) > BPS_DENOMINATOR {
            return Err(ExchangeError::InvalidParameters(format!(
                "total fee {} bps exceeds 100%",
                self.total_bps
            )));
        }
        let shares = u32::from(self.creator_bps) + u32::from(self.admin_bps);
        if shares > u32::from(self.total_bps) {
            return Err(ExchangeError::InvalidParameters(format!(
                "creator ({}) + admin ({}) bps exceed total fee {} bps",
                self.creator_bps, self.admin_bps, self.total_bps
            )));
        }
        Ok(())
    }

    /// Split a gross trade amount into its fees
    ///
    /// Rejects schedules that fail [`FeeSchedule::validate`], so every
    /// returned split has `creator + admin <= total <= gross`.
    pub fn split(&self, gross: Amount) -> ExchangeResult<FeeSplit> {
        self.validate()?;
        Ok(FeeSplit {
            gross,
            total: bps_of(gross, self.total_bps)?,
            creator: bps_of(gross, self.creator_bps)?,
            admin: bps_of(gross, self.admin_bps)?,
        })
    }
}

/// Fees computed for one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Gross trade amount the fees were computed from
    pub gross: Amount,
    /// Total fee withheld
    pub total: Amount,
    /// Paid to the creator
    pub creator: Amount,
    /// Paid to the admin
    pub admin: Amount,
}

impl FeeSplit {
    /// Gross amount after the total fee
    pub fn net(&self) -> Amount {
        self.gross - self.total
    }

    /// Truncation remainder: withheld but paid to no one
    pub fn remainder(&self) -> Amount {
        self.total - self.creator - self.admin
    }

    /// Currency that actually leaves the exchange as fees
    pub fn paid_out(&self) -> Amount {
        self.creator + self.admin
    }
}

fn bps_of(amount: Amount, bps: Bps) -> ExchangeResult<Amount> {
    amount
        .checked_mul(Amount::from(bps))
        .map(|v| v / BPS_DENOMINATOR)
        .ok_or(ExchangeError::Overflow)
}
