use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use crates::{
    chain::evm_client::{EvmRpcClient, TxReceipt, normalize_address},
    domain::{
        entities::invoices::InvoiceEntity,
        repositories::invoices::InvoiceRepository,
        value_objects::{
            enums::{
                invoice_statuses::InvoiceStatus,
                payment_failures::{PaymentFailureKind, classify_submission_error},
            },
            payments::{PayInvoiceModel, PaymentConfirmationDto, PaymentPhase, usdc_base_units},
        },
    },
    observability::alerts::{AlertEvent, OpsAlerts},
};
use thiserror::Error;
use tracing::{error, info, warn};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ChainGateway: Send + Sync {
    async fn submit_transfer(
        &self,
        from: &str,
        to: &str,
        amount_base_units: u128,
    ) -> AnyResult<String>;

    async fn await_receipt(&self, transaction_hash: &str) -> AnyResult<TxReceipt>;

    async fn token_balance(&self, account: &str) -> AnyResult<f64>;
}

#[async_trait]
impl ChainGateway for EvmRpcClient {
    async fn submit_transfer(
        &self,
        from: &str,
        to: &str,
        amount_base_units: u128,
    ) -> AnyResult<String> {
        self.submit_transfer(from, to, amount_base_units).await
    }

    async fn await_receipt(&self, transaction_hash: &str) -> AnyResult<TxReceipt> {
        self.await_receipt(transaction_hash).await
    }

    async fn token_balance(&self, account: &str) -> AnyResult<f64> {
        self.token_balance(account).await
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send + Sync {
    fn notify(&self, summary: &str, fields: BTreeMap<String, String>);
}

impl AlertSink for OpsAlerts {
    fn notify(&self, summary: &str, fields: BTreeMap<String, String>) {
        self.try_notify(AlertEvent {
            summary: summary.to_string(),
            fields,
        });
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invoice not found. Please check the URL and try again.")]
    InvoiceNotFound,
    #[error("This invoice has already been paid.")]
    AlreadyPaid,
    #[error("Payer address must be a valid account address.")]
    InvalidPayerAddress,
    #[error("{}", .0.guidance())]
    Submission(PaymentFailureKind),
    #[error("Transaction failed on the blockchain. Please try again.")]
    Reverted { transaction_hash: String },
    #[error(
        "Failed to confirm transaction. Your payment may have gone through; please check your wallet for status."
    )]
    Confirmation { transaction_hash: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::InvoiceNotFound => StatusCode::NOT_FOUND,
            PaymentError::AlreadyPaid => StatusCode::CONFLICT,
            PaymentError::InvalidPayerAddress => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::Submission(kind) => {
                if kind.is_payer_side() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            PaymentError::Reverted { .. } | PaymentError::Confirmation { .. } => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

/// Drives one payment attempt through
/// `idle -> processing -> confirming -> {succeeded | failed}` as a sequential
/// pipeline with a typed outcome at each stage.
///
/// The transfer and the paid-status write are not atomic. When the write
/// fails after an on-chain success the payer still gets a success response;
/// the gap is logged and pushed to the ops alert sink so an operator can
/// reconcile the invoice by hand.
pub struct PaymentUseCase<R, C, A>
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ChainGateway + Send + Sync + 'static,
    A: AlertSink + Send + Sync + 'static,
{
    invoice_repo: Arc<R>,
    chain_gateway: Arc<C>,
    alerts: Arc<A>,
}

impl<R, C, A> PaymentUseCase<R, C, A>
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ChainGateway + Send + Sync + 'static,
    A: AlertSink + Send + Sync + 'static,
{
    pub fn new(invoice_repo: Arc<R>, chain_gateway: Arc<C>, alerts: Arc<A>) -> Self {
        Self {
            invoice_repo,
            chain_gateway,
            alerts,
        }
    }

    pub async fn pay_invoice(
        &self,
        invoice_number: &str,
        model: PayInvoiceModel,
    ) -> UseCaseResult<PaymentConfirmationDto> {
        info!(
            invoice_number,
            phase = %PaymentPhase::Idle,
            "payments: payment requested"
        );

        let invoice = self
            .invoice_repo
            .find_by_invoice_number(invoice_number)
            .await
            .map_err(|err| {
                error!(
                    invoice_number,
                    db_error = ?err,
                    "payments: failed to load invoice"
                );
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(invoice_number, "payments: invoice not found");
                PaymentError::InvoiceNotFound
            })?;

        if InvoiceStatus::from_str(&invoice.status) == Some(InvoiceStatus::Paid) {
            warn!(invoice_number, "payments: invoice already paid");
            return Err(PaymentError::AlreadyPaid);
        }

        if normalize_address(&model.payer_address).is_err() {
            warn!(
                invoice_number,
                payer_address = %model.payer_address,
                "payments: malformed payer address"
            );
            return Err(PaymentError::InvalidPayerAddress);
        }

        let amount_base_units = usdc_base_units(invoice.amount);

        info!(
            invoice_number,
            phase = %PaymentPhase::Processing,
            amount = invoice.amount,
            amount_base_units,
            merchant_address = %invoice.merchant_address,
            "payments: submitting token transfer"
        );

        let transaction_hash = self
            .chain_gateway
            .submit_transfer(
                &model.payer_address,
                &invoice.merchant_address,
                amount_base_units,
            )
            .await
            .map_err(|err| {
                let kind = classify_submission_error(&err.to_string());
                warn!(
                    invoice_number,
                    phase = %PaymentPhase::Failed,
                    failure_kind = %kind,
                    error = ?err,
                    "payments: submission failed"
                );
                PaymentError::Submission(kind)
            })?;

        info!(
            invoice_number,
            phase = %PaymentPhase::Confirming,
            transaction_hash = %transaction_hash,
            "payments: transfer submitted, awaiting receipt"
        );

        let receipt = match self.chain_gateway.await_receipt(&transaction_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                // Funds may already have moved; this is not a submission failure.
                error!(
                    invoice_number,
                    phase = %PaymentPhase::Failed,
                    transaction_hash = %transaction_hash,
                    error = ?err,
                    "payments: receipt await failed after submission"
                );
                return Err(PaymentError::Confirmation { transaction_hash });
            }
        };

        if !receipt.succeeded {
            warn!(
                invoice_number,
                phase = %PaymentPhase::Failed,
                transaction_hash = %transaction_hash,
                "payments: transaction reverted on chain"
            );
            return Err(PaymentError::Reverted { transaction_hash });
        }

        let marked_paid = self.mark_paid(&invoice, &transaction_hash).await;

        info!(
            invoice_number,
            phase = %PaymentPhase::Succeeded,
            transaction_hash = %transaction_hash,
            marked_paid,
            "payments: payment confirmed"
        );

        Ok(PaymentConfirmationDto {
            invoice_number: invoice.invoice_number,
            transaction_hash,
            amount: invoice.amount,
            marked_paid,
        })
    }

    pub async fn payer_balance(&self, account: &str) -> UseCaseResult<f64> {
        if normalize_address(account).is_err() {
            return Err(PaymentError::InvalidPayerAddress);
        }

        self.chain_gateway
            .token_balance(account)
            .await
            .map_err(|err| {
                error!(account, error = ?err, "payments: balance lookup failed");
                PaymentError::Internal(err)
            })
    }

    /// Best-effort status write after an on-chain success. The row is looked
    /// up again by number because the payment page only knows the number and
    /// the earlier read may be stale. Never fails the payer.
    async fn mark_paid(&self, invoice: &InvoiceEntity, transaction_hash: &str) -> bool {
        let current = match self
            .invoice_repo
            .find_by_invoice_number(&invoice.invoice_number)
            .await
        {
            Ok(Some(current)) => current,
            Ok(None) => {
                error!(
                    invoice_number = %invoice.invoice_number,
                    transaction_hash,
                    "payments: could not find invoice to update"
                );
                self.alert_unrecorded_payment(
                    &invoice.invoice_number,
                    transaction_hash,
                    "invoice lookup returned no row",
                );
                return false;
            }
            Err(err) => {
                error!(
                    invoice_number = %invoice.invoice_number,
                    transaction_hash,
                    db_error = ?err,
                    "payments: invoice lookup failed before status update"
                );
                self.alert_unrecorded_payment(
                    &invoice.invoice_number,
                    transaction_hash,
                    "invoice lookup failed",
                );
                return false;
            }
        };

        match self
            .invoice_repo
            .mark_invoice_paid(current.id, Utc::now(), transaction_hash)
            .await
        {
            Ok(()) => {
                info!(
                    invoice_number = %invoice.invoice_number,
                    transaction_hash,
                    "payments: invoice status updated to paid"
                );
                true
            }
            Err(err) => {
                error!(
                    invoice_number = %invoice.invoice_number,
                    transaction_hash,
                    db_error = ?err,
                    "payments: failed to mark invoice paid after confirmed transfer"
                );
                self.alert_unrecorded_payment(
                    &invoice.invoice_number,
                    transaction_hash,
                    "status update write failed",
                );
                false
            }
        }
    }

    fn alert_unrecorded_payment(&self, invoice_number: &str, transaction_hash: &str, reason: &str) {
        self.alerts.notify(
            "On-chain payment confirmed but invoice was not marked paid",
            BTreeMap::from([
                ("invoice_number".to_string(), invoice_number.to_string()),
                ("transaction_hash".to_string(), transaction_hash.to_string()),
                ("reason".to_string(), reason.to_string()),
            ]),
        );
    }
}
