use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use crates::{
    chain::evm_client::normalize_address,
    domain::{
        entities::invoices::{InsertInvoiceEntity, InvoiceEntity},
        repositories::invoices::InvoiceRepository,
        value_objects::{
            enums::invoice_statuses::{DisplayStatus, InvoiceStatus},
            invoices::{
                CreateInvoiceModel, DashboardSummaryDto, InvoiceDto, InvoiceListFilter,
            },
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::rates::{RateError, RateGateway, RateUseCase};

/// Dashboard widgets show this many most recent paid invoices.
const RECENT_PAID_LIMIT: i64 = 5;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("{0}")]
    Validation(String),
    #[error("Invoice not found. Please check the URL and try again.")]
    NotFound,
    #[error("exchange rates are currently unavailable")]
    RatesUnavailable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl InvoiceError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            InvoiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            InvoiceError::NotFound => StatusCode::NOT_FOUND,
            InvoiceError::RatesUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            InvoiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RateError> for InvoiceError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::Unavailable => InvoiceError::RatesUnavailable,
            RateError::Internal(inner) => InvoiceError::Internal(inner),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, InvoiceError>;

/// The authenticated merchant on whose behalf an invoice is created.
#[derive(Debug, Clone)]
pub struct MerchantContext {
    pub merchant_id: Uuid,
    pub display_name: String,
}

pub struct InvoiceUseCase<R, G>
where
    R: InvoiceRepository + Send + Sync + 'static,
    G: RateGateway + Send + Sync + 'static,
{
    invoice_repo: Arc<R>,
    rates: Arc<RateUseCase<G>>,
    pay_base_url: String,
}

impl<R, G> InvoiceUseCase<R, G>
where
    R: InvoiceRepository + Send + Sync + 'static,
    G: RateGateway + Send + Sync + 'static,
{
    pub fn new(invoice_repo: Arc<R>, rates: Arc<RateUseCase<G>>, pay_base_url: String) -> Self {
        Self {
            invoice_repo,
            rates,
            pay_base_url,
        }
    }

    /// Produces the next sequential invoice number from the most recently
    /// created record. Lookup failures and non-conforming predecessors fall
    /// back to a timestamp-derived number: availability is preferred over a
    /// strict sequence, at a small collision risk under concurrent creation.
    pub async fn next_invoice_number(&self) -> String {
        match self.invoice_repo.find_latest_created().await {
            Ok(None) => format_invoice_number(1),
            Ok(Some(latest)) => match parse_invoice_sequence(&latest.invoice_number) {
                Some(sequence) => format_invoice_number(sequence + 1),
                None => {
                    warn!(
                        latest_invoice_number = %latest.invoice_number,
                        "invoices: latest number is non-conforming, using timestamp fallback"
                    );
                    timestamp_invoice_number(Utc::now())
                }
            },
            Err(err) => {
                warn!(
                    db_error = ?err,
                    "invoices: latest lookup failed, using timestamp fallback"
                );
                timestamp_invoice_number(Utc::now())
            }
        }
    }

    pub async fn create_invoice(
        &self,
        merchant: MerchantContext,
        model: CreateInvoiceModel,
    ) -> UseCaseResult<InvoiceDto> {
        validate_create_model(&model)?;

        let amount_usdc = self
            .rates
            .convert_to_usdc(model.amount, &model.currency)
            .await
            .map_err(|err| {
                warn!(
                    merchant_id = %merchant.merchant_id,
                    currency = %model.currency,
                    error = %err,
                    "invoices: amount conversion failed, aborting creation"
                );
                InvoiceError::from(err)
            })?;

        let invoice_number = self.next_invoice_number().await;
        let now = Utc::now();
        let due_date = start_of_day(model.due_date);

        let entity = InsertInvoiceEntity {
            invoice_number: invoice_number.clone(),
            customer_name: model.customer_name.trim().to_string(),
            amount: amount_usdc,
            due_date,
            status: InvoiceStatus::Pending.to_string(),
            paid_at: None,
            merchant_id: merchant.merchant_id,
            merchant_name: merchant.display_name.clone(),
            merchant_address: model.merchant_address.clone(),
            transaction_hash: None,
        };

        let invoice_id = self
            .invoice_repo
            .create_invoice(entity.clone())
            .await
            .map_err(|err| {
                error!(
                    merchant_id = %merchant.merchant_id,
                    invoice_number = %invoice_number,
                    db_error = ?err,
                    "invoices: failed to persist invoice"
                );
                InvoiceError::Internal(err)
            })?;

        info!(
            merchant_id = %merchant.merchant_id,
            invoice_number = %invoice_number,
            amount_usdc,
            "invoices: invoice created"
        );

        let created = InvoiceEntity {
            id: invoice_id,
            invoice_number: entity.invoice_number,
            customer_name: entity.customer_name,
            amount: entity.amount,
            due_date: entity.due_date,
            status: entity.status,
            paid_at: entity.paid_at,
            merchant_id: entity.merchant_id,
            merchant_name: entity.merchant_name,
            merchant_address: entity.merchant_address,
            transaction_hash: entity.transaction_hash,
            created_at: now,
        };

        Ok(InvoiceDto::from_entity(
            created,
            now.date_naive(),
            &self.pay_base_url,
        ))
    }

    /// The list is always scoped to the calling merchant; filters are
    /// applied after status derivation so `overdue` matches derived rows.
    pub async fn list_invoices(
        &self,
        merchant_id: Uuid,
        filter: InvoiceListFilter,
    ) -> UseCaseResult<Vec<InvoiceDto>> {
        let status_filter = parse_status_filter(filter.status.as_deref())?;

        let invoices = self
            .invoice_repo
            .list_by_merchant(merchant_id)
            .await
            .map_err(|err| {
                error!(
                    %merchant_id,
                    db_error = ?err,
                    "invoices: failed to list invoices"
                );
                InvoiceError::Internal(err)
            })?;

        let today = Utc::now().date_naive();
        let mut dtos: Vec<InvoiceDto> = invoices
            .into_iter()
            .map(|entity| InvoiceDto::from_entity(entity, today, &self.pay_base_url))
            .collect();

        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let needle = search.to_lowercase();
            dtos.retain(|dto| {
                dto.invoice_number.to_lowercase().contains(&needle)
                    || dto.customer_name.to_lowercase().contains(&needle)
            });
        }

        if let Some(due_date) = filter.due_date {
            dtos.retain(|dto| dto.due_date.date_naive() == due_date);
        }

        if let Some(status) = status_filter {
            dtos.retain(|dto| dto.status == status);
        }

        info!(
            %merchant_id,
            invoice_count = dtos.len(),
            "invoices: listed invoices"
        );

        Ok(dtos)
    }

    pub async fn get_by_number(&self, invoice_number: &str) -> UseCaseResult<InvoiceDto> {
        let invoice = self
            .invoice_repo
            .find_by_invoice_number(invoice_number)
            .await
            .map_err(|err| {
                error!(
                    invoice_number,
                    db_error = ?err,
                    "invoices: failed to fetch invoice by number"
                );
                InvoiceError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(invoice_number, "invoices: invoice not found");
                InvoiceError::NotFound
            })?;

        Ok(InvoiceDto::from_entity(
            invoice,
            Utc::now().date_naive(),
            &self.pay_base_url,
        ))
    }

    /// Recent paid invoices plus all open ones for the dashboard, with the
    /// outstanding total awaiting payment.
    pub async fn dashboard_summary(&self, merchant_id: Uuid) -> UseCaseResult<DashboardSummaryDto> {
        let recent_paid = self
            .invoice_repo
            .list_paid_by_merchant(merchant_id, RECENT_PAID_LIMIT)
            .await
            .map_err(|err| {
                error!(
                    %merchant_id,
                    db_error = ?err,
                    "invoices: failed to load recent paid invoices"
                );
                InvoiceError::Internal(err)
            })?;

        let open = self
            .invoice_repo
            .list_pending_by_merchant(merchant_id)
            .await
            .map_err(|err| {
                error!(
                    %merchant_id,
                    db_error = ?err,
                    "invoices: failed to load open invoices"
                );
                InvoiceError::Internal(err)
            })?;

        let outstanding_amount = open.iter().map(|invoice| invoice.amount).sum();
        let today = Utc::now().date_naive();

        Ok(DashboardSummaryDto {
            recent_paid: recent_paid
                .into_iter()
                .map(|entity| InvoiceDto::from_entity(entity, today, &self.pay_base_url))
                .collect(),
            open_invoices: open
                .into_iter()
                .map(|entity| InvoiceDto::from_entity(entity, today, &self.pay_base_url))
                .collect(),
            outstanding_amount,
        })
    }
}

fn validate_create_model(model: &CreateInvoiceModel) -> UseCaseResult<()> {
    if model.customer_name.trim().is_empty() {
        return Err(InvoiceError::Validation(
            "Customer name is required".to_string(),
        ));
    }

    if !model.amount.is_finite() || model.amount <= 0.0 {
        return Err(InvoiceError::Validation(
            "Amount must be a valid positive number".to_string(),
        ));
    }

    if normalize_address(&model.merchant_address).is_err() {
        return Err(InvoiceError::Validation(
            "Merchant address must be a valid account address".to_string(),
        ));
    }

    Ok(())
}

fn parse_status_filter(raw: Option<&str>) -> UseCaseResult<Option<DisplayStatus>> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => DisplayStatus::from_str(value).map(Some).ok_or_else(|| {
            InvoiceError::Validation(format!("Unknown status filter: {value}"))
        }),
    }
}

fn parse_invoice_sequence(value: &str) -> Option<u64> {
    value.strip_prefix("INV-")?.parse().ok()
}

fn format_invoice_number(sequence: u64) -> String {
    format!("INV-{sequence:04}")
}

/// Last eight digits of the unix-millis clock. Not guaranteed unique, which
/// is accepted in exchange for staying available while storage is down.
fn timestamp_invoice_number(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("INV-{tail}")
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::invoices::MockInvoiceRepository;
    use crates::rates::rate_cache::RateCache;
    use std::collections::HashMap;

    use crate::usecases::rates::MockRateGateway;

    const MERCHANT_ADDRESS: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

    fn sample_entity(invoice_number: &str, created_at: DateTime<Utc>) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            invoice_number: invoice_number.to_string(),
            customer_name: "Customer".to_string(),
            amount: 25.0,
            due_date: created_at,
            status: "pending".to_string(),
            paid_at: None,
            merchant_id: Uuid::new_v4(),
            merchant_name: "Merchant".to_string(),
            merchant_address: MERCHANT_ADDRESS.to_string(),
            transaction_hash: None,
            created_at,
        }
    }

    fn rates_with_table() -> Arc<RateUseCase<MockRateGateway>> {
        let mut gateway = MockRateGateway::new();
        gateway.expect_fetch_fiat_rates().returning(|| {
            Box::pin(async {
                Ok(HashMap::from([
                    ("USD".to_string(), 1.0),
                    ("UGX".to_string(), 3750.0),
                ]))
            })
        });
        gateway
            .expect_fetch_usdc_rate()
            .returning(|| Box::pin(async { Ok(1.0) }));
        Arc::new(RateUseCase::new(Arc::new(gateway), Arc::new(RateCache::new())))
    }

    fn rates_unavailable() -> Arc<RateUseCase<MockRateGateway>> {
        let mut gateway = MockRateGateway::new();
        gateway
            .expect_fetch_fiat_rates()
            .returning(|| Box::pin(async { Err(anyhow::anyhow!("upstream down")) }));
        gateway
            .expect_fetch_usdc_rate()
            .returning(|| Box::pin(async { Ok(1.0) }));
        Arc::new(RateUseCase::new(Arc::new(gateway), Arc::new(RateCache::new())))
    }

    fn usecase(
        repo: MockInvoiceRepository,
        rates: Arc<RateUseCase<MockRateGateway>>,
    ) -> InvoiceUseCase<MockInvoiceRepository, MockRateGateway> {
        InvoiceUseCase::new(Arc::new(repo), rates, "https://payne.example".to_string())
    }

    fn sample_merchant() -> MerchantContext {
        MerchantContext {
            merchant_id: Uuid::new_v4(),
            display_name: "Kampala Coffee Works".to_string(),
        }
    }

    fn create_model(amount: f64, currency: &str) -> CreateInvoiceModel {
        CreateInvoiceModel {
            customer_name: "Acme Ltd".to_string(),
            amount,
            currency: currency.to_string(),
            due_date: NaiveDate::from_ymd_opt(2099, 7, 1).unwrap(),
            merchant_address: MERCHANT_ADDRESS.to_string(),
        }
    }

    #[tokio::test]
    async fn increments_the_latest_invoice_number() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created().returning(|| {
            Box::pin(async { Ok(Some(sample_entity("INV-0041", Utc::now()))) })
        });

        let usecase = usecase(repo, rates_with_table());

        assert_eq!(usecase.next_invoice_number().await, "INV-0042");
    }

    #[tokio::test]
    async fn starts_at_one_for_an_empty_store() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created()
            .returning(|| Box::pin(async { Ok(None) }));

        let usecase = usecase(repo, rates_with_table());

        assert_eq!(usecase.next_invoice_number().await, "INV-0001");
    }

    #[tokio::test]
    async fn widens_past_four_digits() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created().returning(|| {
            Box::pin(async { Ok(Some(sample_entity("INV-9999", Utc::now()))) })
        });

        let usecase = usecase(repo, rates_with_table());

        assert_eq!(usecase.next_invoice_number().await, "INV-10000");
    }

    #[tokio::test]
    async fn non_conforming_latest_number_falls_back_to_timestamp() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created().returning(|| {
            Box::pin(async { Ok(Some(sample_entity("DRAFT-7", Utc::now()))) })
        });

        let usecase = usecase(repo, rates_with_table());

        let number = usecase.next_invoice_number().await;
        let digits = number.strip_prefix("INV-").unwrap();
        assert_eq!(digits.len(), 8);
        assert!(digits.bytes().all(|b| b.is_ascii_digit()));
    }

    #[tokio::test]
    async fn storage_failure_falls_back_to_timestamp() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created()
            .returning(|| Box::pin(async { Err(anyhow::anyhow!("storage unavailable")) }));

        let usecase = usecase(repo, rates_with_table());

        let number = usecase.next_invoice_number().await;
        assert!(number.starts_with("INV-"));
        assert_eq!(number.len(), "INV-".len() + 8);
    }

    #[tokio::test]
    async fn creates_a_pending_invoice_with_converted_amount() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created()
            .returning(|| Box::pin(async { Ok(None) }));
        repo.expect_create_invoice()
            .withf(|entity| {
                entity.invoice_number == "INV-0001"
                    && entity.status == "pending"
                    && entity.paid_at.is_none()
                    && entity.transaction_hash.is_none()
                    && (entity.amount - 2.0).abs() < 1e-9
            })
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let usecase = usecase(repo, rates_with_table());

        // 7500 UGX at 3750 UGX/USD and 1 USD/USDC is 2 USDC.
        let dto = usecase
            .create_invoice(sample_merchant(), create_model(7500.0, "UGX"))
            .await
            .unwrap();

        assert_eq!(dto.invoice_number, "INV-0001");
        assert_eq!(dto.status, DisplayStatus::Pending);
        assert_eq!(dto.payment_link, "https://payne.example/pay/INV-0001");
    }

    #[tokio::test]
    async fn usdc_amounts_are_stored_verbatim() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_latest_created()
            .returning(|| Box::pin(async { Ok(None) }));
        repo.expect_create_invoice()
            .withf(|entity| entity.amount == 42.5)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        // No rate fetch may happen for a USDC amount.
        let usecase = usecase(
            repo,
            Arc::new(RateUseCase::new(
                Arc::new(MockRateGateway::new()),
                Arc::new(RateCache::new()),
            )),
        );

        usecase
            .create_invoice(sample_merchant(), create_model(42.5, "USDC"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_invalid_drafts() {
        let usecase = usecase(MockInvoiceRepository::new(), rates_with_table());

        let mut model = create_model(10.0, "USDC");
        model.customer_name = "   ".to_string();
        let err = usecase
            .create_invoice(sample_merchant(), model)
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(_)));

        let err = usecase
            .create_invoice(sample_merchant(), create_model(-5.0, "USDC"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(_)));

        let mut model = create_model(10.0, "USDC");
        model.merchant_address = "not-an-address".to_string();
        let err = usecase
            .create_invoice(sample_merchant(), model)
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(_)));
    }

    #[tokio::test]
    async fn creation_aborts_when_rates_are_unavailable() {
        let usecase = usecase(MockInvoiceRepository::new(), rates_unavailable());

        let err = usecase
            .create_invoice(sample_merchant(), create_model(7500.0, "UGX"))
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::RatesUnavailable));
    }

    #[tokio::test]
    async fn list_derives_overdue_and_filters_by_status() {
        let merchant_id = Uuid::new_v4();

        let mut repo = MockInvoiceRepository::new();
        repo.expect_list_by_merchant()
            .withf(move |id| *id == merchant_id)
            .returning(|_| {
                Box::pin(async {
                    let mut overdue = sample_entity("INV-0001", Utc::now());
                    overdue.due_date = Utc::now() - chrono::Duration::days(3);

                    let pending = sample_entity("INV-0002", Utc::now());

                    let mut paid = sample_entity("INV-0003", Utc::now());
                    paid.status = "paid".to_string();
                    paid.paid_at = Some(Utc::now());

                    Ok(vec![overdue, pending, paid])
                })
            });

        let usecase = usecase(repo, rates_with_table());

        let overdue_only = usecase
            .list_invoices(
                merchant_id,
                InvoiceListFilter {
                    status: Some("overdue".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(overdue_only.len(), 1);
        assert_eq!(overdue_only[0].invoice_number, "INV-0001");
        assert_eq!(overdue_only[0].status, DisplayStatus::Overdue);
    }

    #[tokio::test]
    async fn list_searches_number_and_customer() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_list_by_merchant().returning(|_| {
            Box::pin(async {
                let mut first = sample_entity("INV-0001", Utc::now());
                first.customer_name = "Acme Ltd".to_string();
                let second = sample_entity("INV-0002", Utc::now());
                Ok(vec![first, second])
            })
        });

        let usecase = usecase(repo, rates_with_table());

        let matches = usecase
            .list_invoices(
                Uuid::new_v4(),
                InvoiceListFilter {
                    search: Some("acme".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].customer_name, "Acme Ltd");
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_list_by_merchant()
            .returning(|_| Box::pin(async { Ok(vec![]) }));

        let usecase = usecase(repo, rates_with_table());

        let err = usecase
            .list_invoices(
                Uuid::new_v4(),
                InvoiceListFilter {
                    status: Some("archived".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InvoiceError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_invoice_is_a_distinct_not_found() {
        let mut repo = MockInvoiceRepository::new();
        repo.expect_find_by_invoice_number()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(repo, rates_with_table());

        let err = usecase.get_by_number("INV-9999").await.unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dashboard_sums_outstanding_amounts() {
        let merchant_id = Uuid::new_v4();

        let mut repo = MockInvoiceRepository::new();
        repo.expect_list_paid_by_merchant().returning(|_, _| {
            Box::pin(async {
                let mut paid = sample_entity("INV-0003", Utc::now());
                paid.status = "paid".to_string();
                paid.paid_at = Some(Utc::now());
                Ok(vec![paid])
            })
        });
        repo.expect_list_pending_by_merchant().returning(|_| {
            Box::pin(async {
                let mut first = sample_entity("INV-0001", Utc::now());
                first.amount = 30.0;
                let mut second = sample_entity("INV-0002", Utc::now());
                second.amount = 12.5;
                Ok(vec![first, second])
            })
        });

        let usecase = usecase(repo, rates_with_table());

        let summary = usecase.dashboard_summary(merchant_id).await.unwrap();

        assert_eq!(summary.recent_paid.len(), 1);
        assert_eq!(summary.open_invoices.len(), 2);
        assert_eq!(summary.outstanding_amount, 42.5);
    }
}
