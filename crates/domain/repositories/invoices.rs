use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::invoices::{InsertInvoiceEntity, InvoiceEntity};

#[async_trait]
#[automock]
pub trait InvoiceRepository {
    async fn create_invoice(&self, invoice: InsertInvoiceEntity) -> Result<Uuid>;

    /// The single most recently created invoice, used for sequential numbering.
    async fn find_latest_created(&self) -> Result<Option<InvoiceEntity>>;

    async fn find_by_invoice_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<InvoiceEntity>>;

    async fn list_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<InvoiceEntity>>;

    async fn list_all(&self) -> Result<Vec<InvoiceEntity>>;

    async fn list_paid_by_merchant(
        &self,
        merchant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<InvoiceEntity>>;

    async fn list_pending_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<InvoiceEntity>>;

    async fn mark_invoice_paid(
        &self,
        invoice_id: Uuid,
        paid_at: DateTime<Utc>,
        transaction_hash: &str,
    ) -> Result<()>;
}
