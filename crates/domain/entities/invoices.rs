use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::invoices;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoices)]
pub struct InvoiceEntity {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub merchant_id: Uuid,
    pub merchant_name: String,
    pub merchant_address: String,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub invoice_number: String,
    pub customer_name: String,
    pub amount: f64,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub merchant_id: Uuid,
    pub merchant_name: String,
    pub merchant_address: String,
    pub transaction_hash: Option<String>,
}
