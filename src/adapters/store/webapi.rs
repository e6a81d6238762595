//! Record store client over the OData Web API
//!
//! Reads use FetchXML queries with the paging annotations switched on.
//! Writes go through `$batch` with continue-on-error, single creates through
//! a plain POST and compensating deletes through DELETE.

use super::models::{
    entity_id_from_uri, error_message, records_from_rows, QueryResponse, PAGE_METADATA_PREFERENCE,
};
use super::multipart::{build_batch_body, parse_batch_response};
use super::traits::{ItemOutcome, RawPage, RecordStore};
use crate::config::{RetryConfig, SecretString, StoreConfig};
use crate::core::paging::PageRequest;
use crate::domain::{
    EngineError, EntityName, Payload, PendingOperation, RecordId, RecordRef, Result, StoreError,
};
use crate::log_retry_attempt;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// HTTP client for the record store
///
/// # Example
///
/// ```no_run
/// use grantflow::adapters::store::WebApiStore;
/// use grantflow::config::{secret_string, StoreConfig};
///
/// let config = StoreConfig {
///     base_url: "https://funding.example.com".to_string(),
///     access_token: Some(secret_string("token".to_string())),
///     ..Default::default()
/// };
/// let store = WebApiStore::new(&config, false).expect("valid store config");
/// ```
pub struct WebApiStore {
    client: Client,
    api_root: String,
    api_path: String,
    access_token: Option<SecretString>,
    retry: RetryConfig,
    dry_run: bool,
}

impl WebApiStore {
    /// Build a client from configuration
    ///
    /// In dry-run mode reads go to the store as usual but writes are only
    /// logged, and creates answer with freshly generated identifiers.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the base URL is invalid or the HTTP client
    /// can't be built.
    pub fn new(config: &StoreConfig, dry_run: bool) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            EngineError::Configuration(format!("Invalid store.base_url '{}': {e}", config.base_url))
        })?;

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification disabled for the record store");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| {
            EngineError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        let api_path = format!("/{}", config.api_path.trim_matches('/'));
        let api_root = format!("{}{api_path}", base.as_str().trim_end_matches('/'));

        Ok(Self {
            client,
            api_root,
            api_path,
            access_token: config.access_token.clone(),
            retry: config.retry.clone(),
            dry_run,
        })
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("OData-Version", "4.0")
            .header("OData-MaxVersion", "4.0")
            .header("Accept", "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Retry a request with exponential backoff
    ///
    /// The first attempt is followed by at most `max_retries` retries. Only
    /// errors for which `retryable` returns true are retried; anything else,
    /// or the last attempt's error, is returned as is.
    async fn retry_request<F, T, Fut>(&self, retryable: fn(&StoreError) -> bool, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    let can_retry = matches!(&e, EngineError::Store(se) if retryable(se));
                    if !can_retry || attempt > max_retries {
                        return Err(e);
                    }

                    let delay_ms = self.retry.delay_for_attempt(attempt);
                    log_retry_attempt!(attempt, max_retries, e);
                    tracing::debug!(delay_ms = delay_ms, "Backing off");

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(e.to_string())
            } else {
                StoreError::ConnectionFailed(e.to_string())
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::from_status(status, error_message(status, &body)).into())
    }
}

/// Failures worth retrying for idempotent requests
fn transient(error: &StoreError) -> bool {
    error.is_transient()
}

/// Failures worth retrying for writes: only outright rejections, where the
/// store is known not to have applied anything
fn rejected_before_apply(error: &StoreError) -> bool {
    matches!(error, StoreError::Throttled(_))
}

#[async_trait]
impl RecordStore for WebApiStore {
    async fn query_page(&self, request: &PageRequest) -> Result<RawPage> {
        let url = self.url(&format!("/{}", request.entity));

        tracing::debug!(
            entity = %request.entity,
            page = request.page,
            page_size = request.page_size,
            "Querying page"
        );

        let response: QueryResponse = self
            .retry_request(transient, || async {
                let builder = self
                    .client
                    .get(&url)
                    .query(&[("fetchXml", request.query.as_str())])
                    .header("Prefer", PAGE_METADATA_PREFERENCE);
                let resp = self.send(builder).await?;
                resp.json::<QueryResponse>()
                    .await
                    .map_err(|e| StoreError::InvalidResponse(e.to_string()).into())
            })
            .await?;

        let items = records_from_rows(&request.entity, &request.id_field, response.value)?;
        Ok(RawPage {
            items,
            more_records: response.more_records,
            raw_token: response.paging_cookie,
        })
    }

    async fn execute_batch(&self, operations: &[PendingOperation]) -> Result<Vec<ItemOutcome>> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        if self.dry_run {
            tracing::info!(operations = operations.len(), "Dry run: batch not sent");
            return Ok(operations
                .iter()
                .map(|op| {
                    if op.is_create() {
                        ItemOutcome::created(RecordId::generate())
                    } else {
                        ItemOutcome::ok()
                    }
                })
                .collect());
        }

        let boundary = format!("batch_{}", Uuid::new_v4());
        let body = build_batch_body(&boundary, &self.api_path, operations)?;
        let url = self.url("/$batch");

        let (content_type, text) = self
            .retry_request(rejected_before_apply, || async {
                let builder = self
                    .client
                    .post(&url)
                    .header(
                        "Content-Type",
                        format!("multipart/mixed; boundary={boundary}"),
                    )
                    .header("Prefer", "odata.continue-on-error")
                    .body(body.clone());
                let resp = self.send(builder).await?;
                let content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let text = resp
                    .text()
                    .await
                    .map_err(|e| EngineError::from(StoreError::InvalidResponse(e.to_string())))?;
                Ok((content_type, text))
            })
            .await?;

        parse_batch_response(&content_type, &text, operations.len())
    }

    async fn create(&self, entity: &EntityName, payload: &Payload) -> Result<RecordRef> {
        if self.dry_run {
            let reference = RecordRef::new(entity.clone(), RecordId::generate());
            tracing::info!(record = %reference, "Dry run: record not created");
            return Ok(reference);
        }

        let url = self.url(&format!("/{entity}"));
        let response = self
            .retry_request(rejected_before_apply, || async {
                self.send(self.client.post(&url).json(payload)).await
            })
            .await?;

        let id = response
            .headers()
            .get("OData-EntityId")
            .and_then(|v| v.to_str().ok())
            .and_then(entity_id_from_uri)
            .ok_or_else(|| {
                StoreError::InvalidResponse(format!(
                    "Create of {entity} returned no OData-EntityId header"
                ))
            })?;

        let reference = RecordRef::new(entity.clone(), id);
        tracing::debug!(record = %reference, "Record created");
        Ok(reference)
    }

    async fn delete(&self, target: &RecordRef) -> Result<()> {
        if self.dry_run {
            tracing::info!(record = %target, "Dry run: record not deleted");
            return Ok(());
        }

        let url = self.url(&target.resource_path());
        let result = self
            .retry_request(transient, || async {
                self.send(self.client.delete(&url)).await
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(EngineError::Store(StoreError::NotFound(_))) => {
                tracing::debug!(record = %target, "Record already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        if self.dry_run {
            format!("{} (dry run)", self.api_root)
        } else {
            self.api_root.clone()
        }
    }
}

impl std::fmt::Debug for WebApiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiStore")
            .field("api_root", &self.api_root)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
