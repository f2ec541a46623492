use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPool, schema::invoices},
};
use domain::{
    entities::invoices::{InsertInvoiceEntity, InvoiceEntity},
    repositories::invoices::InvoiceRepository,
    value_objects::enums::invoice_statuses::InvoiceStatus,
};

pub struct InvoicePostgres {
    db_pool: Arc<PgPool>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn create_invoice(&self, invoice: InsertInvoiceEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice_id = insert_into(invoices::table)
            .values(&invoice)
            .returning(invoices::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(invoice_id)
    }

    async fn find_latest_created(&self) -> Result<Option<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice = invoices::table
            .order(invoices::created_at.desc())
            .first::<InvoiceEntity>(&mut conn)
            .optional()?;

        Ok(invoice)
    }

    async fn find_by_invoice_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice = invoices::table
            .filter(invoices::invoice_number.eq(invoice_number))
            .first::<InvoiceEntity>(&mut conn)
            .optional()?;

        Ok(invoice)
    }

    async fn list_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .filter(invoices::merchant_id.eq(merchant_id))
            .order(invoices::created_at.desc())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_all(&self) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .order(invoices::created_at.desc())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_paid_by_merchant(
        &self,
        merchant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .filter(invoices::merchant_id.eq(merchant_id))
            .filter(invoices::status.eq(InvoiceStatus::Paid.to_string()))
            .order(invoices::paid_at.desc())
            .limit(limit)
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_pending_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .filter(invoices::merchant_id.eq(merchant_id))
            .filter(invoices::status.eq(InvoiceStatus::Pending.to_string()))
            .order(invoices::due_date.asc())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_invoice_paid(
        &self,
        invoice_id: Uuid,
        paid_at: DateTime<Utc>,
        transaction_hash: &str,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(invoices::table.filter(invoices::id.eq(invoice_id)))
            .set((
                invoices::status.eq(InvoiceStatus::Paid.to_string()),
                invoices::paid_at.eq(Some(paid_at)),
                invoices::transaction_hash.eq(Some(transaction_hash)),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
