use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Submission failures, classified only to pick guidance text for the payer.
/// Classification never changes control flow: every kind is terminal for the
/// attempt and retryable from scratch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFailureKind {
    UserRejected,
    InsufficientFunds,
    InsufficientGas,
    NonceConflict,
    Network,
    WrongChain,
    MissingAllowance,
    Unknown,
}

impl PaymentFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFailureKind::UserRejected => "user_rejected",
            PaymentFailureKind::InsufficientFunds => "insufficient_funds",
            PaymentFailureKind::InsufficientGas => "insufficient_gas",
            PaymentFailureKind::NonceConflict => "nonce_conflict",
            PaymentFailureKind::Network => "network",
            PaymentFailureKind::WrongChain => "wrong_chain",
            PaymentFailureKind::MissingAllowance => "missing_allowance",
            PaymentFailureKind::Unknown => "unknown",
        }
    }

    /// User-facing guidance shown on the payment page for this failure.
    pub fn guidance(&self) -> &'static str {
        match self {
            PaymentFailureKind::UserRejected => "You have denied the payment request.",
            PaymentFailureKind::InsufficientFunds => {
                "Insufficient funds in your wallet to complete this payment."
            }
            PaymentFailureKind::InsufficientGas => {
                "Not enough ETH to cover gas fees for this transaction."
            }
            PaymentFailureKind::NonceConflict => {
                "Transaction error: Please reset your wallet or try again."
            }
            PaymentFailureKind::Network => {
                "Network connection issue. Please check your internet connection."
            }
            PaymentFailureKind::WrongChain => {
                "You're connected to the wrong network. Please switch to the correct network."
            }
            PaymentFailureKind::MissingAllowance => {
                "You need to approve USDC spending before making this payment."
            }
            PaymentFailureKind::Unknown => "Payment failed. Please try again later.",
        }
    }

    /// True when the failure is something the payer can fix on their side,
    /// as opposed to an upstream node problem.
    pub fn is_payer_side(&self) -> bool {
        !matches!(
            self,
            PaymentFailureKind::Network | PaymentFailureKind::Unknown
        )
    }
}

impl Display for PaymentFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw submission error message onto the guidance taxonomy.
/// Wallet and node errors carry no stable codes, so this sniffs message
/// content the same way the payment page must.
pub fn classify_submission_error(message: &str) -> PaymentFailureKind {
    let msg = message.to_ascii_lowercase();

    if msg.contains("user rejected") || msg.contains("user denied") {
        PaymentFailureKind::UserRejected
    } else if msg.contains("insufficient funds") || msg.contains("transfer amount exceeds balance")
    {
        PaymentFailureKind::InsufficientFunds
    } else if msg.contains("gas") {
        PaymentFailureKind::InsufficientGas
    } else if msg.contains("nonce") {
        PaymentFailureKind::NonceConflict
    } else if msg.contains("allowance") || msg.contains("approve") {
        PaymentFailureKind::MissingAllowance
    } else if msg.contains("wrong chain") || msg.contains("chain id") {
        PaymentFailureKind::WrongChain
    } else if msg.contains("network") || msg.contains("disconnected") || msg.contains("timed out")
    {
        PaymentFailureKind::Network
    } else {
        PaymentFailureKind::Unknown
    }
}
