use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use crates::domain::{
    repositories::invoices::InvoiceRepository,
    value_objects::analytics::{AnalyticsReport, RangePreset, aggregate, resolve_range},
};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("custom range requires both start and end dates")]
    InvalidRange,
    #[error("unknown range preset: {0}")]
    UnknownPreset(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AnalyticsError::InvalidRange | AnalyticsError::UnknownPreset(_) => {
                StatusCode::BAD_REQUEST
            }
            AnalyticsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AnalyticsError>;

pub struct AnalyticsUseCase<R>
where
    R: InvoiceRepository + Send + Sync + 'static,
{
    invoice_repo: Arc<R>,
}

impl<R> AnalyticsUseCase<R>
where
    R: InvoiceRepository + Send + Sync + 'static,
{
    pub fn new(invoice_repo: Arc<R>) -> Self {
        Self { invoice_repo }
    }

    pub async fn report(
        &self,
        preset: &str,
        custom_start: Option<NaiveDate>,
        custom_end: Option<NaiveDate>,
    ) -> UseCaseResult<AnalyticsReport> {
        let preset = RangePreset::from_str(preset)
            .ok_or_else(|| AnalyticsError::UnknownPreset(preset.to_string()))?;

        let now = Utc::now();
        let range = resolve_range(preset, custom_start, custom_end, now)
            .ok_or(AnalyticsError::InvalidRange)?;

        let invoices = self.invoice_repo.list_all().await.map_err(|err| {
            error!(db_error = ?err, "analytics: failed to load invoices");
            AnalyticsError::Internal(err)
        })?;

        info!(
            invoice_count = invoices.len(),
            range_start = %range.start,
            range_end = %range.end,
            "analytics: aggregating invoices"
        );

        Ok(aggregate(&invoices, range, now.date_naive()))
    }
}
