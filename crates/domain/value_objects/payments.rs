use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// USDC carries six decimal places on chain.
pub const USDC_DECIMALS: u32 = 6;

/// Progression of one payment attempt. `Failed` is recoverable only by a
/// fresh attempt; nothing can be cancelled after submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPhase {
    Idle,
    Processing,
    Confirming,
    Succeeded,
    Failed,
}

impl PaymentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPhase::Idle => "idle",
            PaymentPhase::Processing => "processing",
            PaymentPhase::Confirming => "confirming",
            PaymentPhase::Succeeded => "succeeded",
            PaymentPhase::Failed => "failed",
        }
    }
}

impl Display for PaymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayInvoiceModel {
    pub payer_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfirmationDto {
    pub invoice_number: String,
    pub transaction_hash: String,
    pub amount: f64,
    /// False when the on-chain transfer succeeded but the status write did
    /// not; the payer is not failed for that (see the payment use case).
    pub marked_paid: bool,
}

/// Converts a USDC amount into base units (amount x 10^6), rounded to the
/// nearest unit to absorb binary float representation error.
pub fn usdc_base_units(amount: f64) -> u128 {
    (amount * 10f64.powi(USDC_DECIMALS as i32)).round() as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_whole_and_fractional_amounts() {
        assert_eq!(usdc_base_units(1.0), 1_000_000);
        assert_eq!(usdc_base_units(12.34), 12_340_000);
        assert_eq!(usdc_base_units(0.000001), 1);
    }

    #[test]
    fn rounds_instead_of_truncating_float_noise() {
        // 0.1 is not exactly representable; truncation would lose a unit.
        assert_eq!(usdc_base_units(0.1), 100_000);
        assert_eq!(usdc_base_units(0.29), 290_000);
    }
}
