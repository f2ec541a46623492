use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::invoices::InvoiceEntity;
use crate::domain::value_objects::enums::invoice_statuses::{
    DisplayStatus, InvoiceStatus, display_status,
};

fn default_currency() -> String {
    "USDC".to_string()
}

/// Create form payload. The amount arrives in whatever currency the merchant
/// typed; it is converted to USDC before anything is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceModel {
    pub customer_name: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub due_date: NaiveDate,
    pub merchant_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListFilter {
    pub search: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDto {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    pub status: DisplayStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub merchant_id: Uuid,
    pub merchant_name: String,
    pub merchant_address: String,
    pub transaction_hash: Option<String>,
    pub payment_link: String,
    pub created_at: DateTime<Utc>,
}

impl InvoiceDto {
    pub fn from_entity(entity: InvoiceEntity, today: NaiveDate, pay_base_url: &str) -> Self {
        let stored =
            InvoiceStatus::from_str(&entity.status).unwrap_or(InvoiceStatus::Pending);

        Self {
            payment_link: payment_link(pay_base_url, &entity.invoice_number),
            status: display_status(stored, entity.due_date, today),
            id: entity.id,
            invoice_number: entity.invoice_number,
            customer_name: entity.customer_name,
            amount: entity.amount,
            due_date: entity.due_date,
            paid_at: entity.paid_at,
            merchant_id: entity.merchant_id,
            merchant_name: entity.merchant_name,
            merchant_address: entity.merchant_address,
            transaction_hash: entity.transaction_hash,
            created_at: entity.created_at,
        }
    }
}

/// Derived, never stored: the public payment URL is keyed by the
/// human-readable invoice number, not the storage id.
pub fn payment_link(pay_base_url: &str, invoice_number: &str) -> String {
    format!(
        "{}/pay/{}",
        pay_base_url.trim_end_matches('/'),
        invoice_number
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummaryDto {
    pub recent_paid: Vec<InvoiceDto>,
    pub open_invoices: Vec<InvoiceDto>,
    pub outstanding_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_link_embeds_the_invoice_number() {
        assert_eq!(
            payment_link("https://payne.example", "INV-0042"),
            "https://payne.example/pay/INV-0042"
        );
        assert_eq!(
            payment_link("https://payne.example/", "INV-0042"),
            "https://payne.example/pay/INV-0042"
        );
    }
}
