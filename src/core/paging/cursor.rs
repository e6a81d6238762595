//! Cursor-driven paged reads

use super::page::{ContinuationToken, ResultPage};
use super::query::{PageRequest, RecordQuery};
use super::token::TokenDecoder;
use crate::adapters::store::{RawPage, RecordStore};
use crate::core::provider::Cancellation;
use crate::domain::{EngineError, Record, Result};

/// Reads every page of a query into memory
///
/// Pages are fetched strictly one after another. A failure on any page
/// aborts the whole read and discards what was accumulated so far. Two
/// guards stop a runaway cursor: a hard page bound, and a check that the
/// decoded token actually changes from one page to the next.
pub struct CursorReader<'a> {
    store: &'a dyn RecordStore,
    decoder: &'a dyn TokenDecoder,
    page_size: usize,
    max_pages: usize,
    cancel: Cancellation,
}

impl<'a> CursorReader<'a> {
    /// Creates a new reader
    pub fn new(
        store: &'a dyn RecordStore,
        decoder: &'a dyn TokenDecoder,
        page_size: usize,
        max_pages: usize,
    ) -> Self {
        Self {
            store,
            decoder,
            page_size,
            max_pages,
            cancel: Cancellation::none(),
        }
    }

    /// Honour a cancellation signal between pages
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Read all records the query returns, in server order
    ///
    /// # Errors
    ///
    /// Returns `Retrieval` when a page fails, a token can't be decoded, the
    /// token stops changing or the page bound is hit. Returns `Cancelled`
    /// when the signal fires between pages.
    pub async fn read_all(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = Vec::new();
        let mut token: Option<ContinuationToken> = None;
        let mut page = 1usize;

        loop {
            if page > self.max_pages {
                return Err(EngineError::Retrieval(format!(
                    "Read of {} exceeded {} pages; continuation token never ran out",
                    query.entity, self.max_pages
                )));
            }

            self.cancel.check(&format!("reading {} page {page}", query.entity))?;

            let result = self.fetch_page(query, page, token.as_ref()).await?;
            let (items, next) = result.into_parts();

            tracing::debug!(
                entity = %query.entity,
                page = page,
                items = items.len(),
                has_more = next.is_some(),
                "Page read"
            );

            records.extend(items);

            match next {
                None => break,
                Some(next) => {
                    if token.as_ref() == Some(&next) {
                        return Err(EngineError::Retrieval(format!(
                            "Continuation token for {} did not change after page {page}",
                            query.entity
                        )));
                    }
                    token = Some(next);
                    page += 1;
                }
            }
        }

        tracing::info!(
            entity = %query.entity,
            pages = page,
            records = records.len(),
            "Read complete"
        );

        Ok(records)
    }

    async fn fetch_page(
        &self,
        query: &RecordQuery,
        page: usize,
        token: Option<&ContinuationToken>,
    ) -> Result<ResultPage> {
        let text = query.template.render(page, self.page_size, token)?;
        let request = PageRequest {
            entity: query.entity.clone(),
            id_field: query.id_field.clone(),
            query: text,
            page,
            page_size: self.page_size,
        };

        let raw = self.store.query_page(&request).await.map_err(|e| match e {
            EngineError::Cancelled(_) | EngineError::Retrieval(_) => e,
            other => EngineError::Retrieval(format!(
                "Query for {} failed on page {page}: {other}",
                query.entity
            )),
        })?;

        self.decode_page(query, page, raw)
    }

    fn decode_page(&self, query: &RecordQuery, page: usize, raw: RawPage) -> Result<ResultPage> {
        if !raw.more_records {
            return Ok(ResultPage::last(raw.items));
        }

        let raw_token = raw.raw_token.as_deref().ok_or_else(|| {
            EngineError::Retrieval(format!(
                "Store reported more {} records after page {page} but sent no continuation token",
                query.entity
            ))
        })?;

        let token = self.decoder.decode(raw_token).map_err(|e| {
            EngineError::Retrieval(format!(
                "Could not decode continuation token for {} after page {page}: {e}",
                query.entity
            ))
        })?;

        Ok(ResultPage::with_more(raw.items, token))
    }
}
