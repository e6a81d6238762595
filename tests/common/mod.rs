//! Shared fixtures for integration tests
//!
//! [`MockStore`] is an in-memory [`RecordStore`] with scripted query pages,
//! injectable batch and create failures, and call recording.

#![allow(dead_code)]

use async_trait::async_trait;
use grantflow::adapters::store::{ItemOutcome, RawPage, RecordStore};
use grantflow::config::{BatchConfig, PagingConfig};
use grantflow::core::paging::{PageRequest, PassthroughDecoder};
use grantflow::core::provider::Engine;
use grantflow::domain::{
    EngineError, EntityName, Payload, PendingOperation, Record, RecordId, RecordRef, Result,
    StoreError,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// One scripted answer to a page query
#[derive(Debug, Clone)]
pub enum PageStep {
    Page(RawPage),
    Fail(String),
}

/// Scripted in-memory record store
///
/// Pages are scripted per entity and served in order; the last step of a
/// script repeats forever. Entities without a script answer with one empty
/// final page.
#[derive(Default)]
pub struct MockStore {
    pages: Mutex<HashMap<String, VecDeque<PageStep>>>,
    queries: Mutex<Vec<PageRequest>>,

    batch_calls: Mutex<Vec<Vec<PendingOperation>>>,
    items_seen: AtomicUsize,
    failing_items: Mutex<HashSet<usize>>,
    failing_entities: Mutex<HashSet<String>>,
    transport_failures: Mutex<HashSet<usize>>,
    cancel_after_batch: Mutex<Option<(usize, watch::Sender<bool>)>>,

    creates: Mutex<Vec<(RecordRef, Payload)>>,
    fail_create: AtomicBool,

    deletes: Mutex<Vec<RecordRef>>,
    fail_delete: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the pages returned for `entity`
    pub fn with_pages(self, entity: &str, steps: Vec<PageStep>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(entity.to_string(), steps.into());
        self
    }

    /// Fail the batch items at these global positions (0-based, counted
    /// across every batch call)
    pub fn failing_items(self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.failing_items.lock().unwrap().extend(positions);
        self
    }

    /// Fail every batch item touching `entity`
    pub fn failing_entity(self, entity: &str) -> Self {
        self.failing_entities.lock().unwrap().insert(entity.to_string());
        self
    }

    /// Fail the whole transport call with this number (1-based)
    pub fn failing_batch_call(self, call: usize) -> Self {
        self.transport_failures.lock().unwrap().insert(call);
        self
    }

    /// Fire `sender` once batch call `call` (1-based) has returned
    pub fn cancel_after_batch(self, call: usize, sender: watch::Sender<bool>) -> Self {
        *self.cancel_after_batch.lock().unwrap() = Some((call, sender));
        self
    }

    /// Make single creates fail
    pub fn failing_create(self) -> Self {
        self.fail_create.store(true, Ordering::SeqCst);
        self
    }

    /// Make deletes fail
    pub fn failing_delete(self) -> Self {
        self.fail_delete.store(true, Ordering::SeqCst);
        self
    }

    pub fn queries(&self) -> Vec<PageRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queries_for(&self, entity: &str) -> Vec<PageRequest> {
        self.queries()
            .into_iter()
            .filter(|q| q.entity.as_str() == entity)
            .collect()
    }

    pub fn batch_call_count(&self) -> usize {
        self.batch_calls.lock().unwrap().len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn batched(&self) -> Vec<PendingOperation> {
        self.batch_calls.lock().unwrap().concat()
    }

    pub fn creates(&self) -> Vec<(RecordRef, Payload)> {
        self.creates.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<RecordRef> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MockStore {
    async fn query_page(&self, request: &PageRequest) -> Result<RawPage> {
        self.queries.lock().unwrap().push(request.clone());

        let step = {
            let mut pages = self.pages.lock().unwrap();
            match pages.get_mut(request.entity.as_str()) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().cloned(),
                None => None,
            }
        };

        match step {
            Some(PageStep::Page(page)) => Ok(page),
            Some(PageStep::Fail(message)) => Err(StoreError::ServerError {
                status: 500,
                message,
            }
            .into()),
            None => Ok(RawPage::last(Vec::new())),
        }
    }

    async fn execute_batch(&self, operations: &[PendingOperation]) -> Result<Vec<ItemOutcome>> {
        let call = {
            let mut calls = self.batch_calls.lock().unwrap();
            calls.push(operations.to_vec());
            calls.len()
        };
        let first = self.items_seen.fetch_add(operations.len(), Ordering::SeqCst);

        let result = if self.transport_failures.lock().unwrap().contains(&call) {
            Err(EngineError::Store(StoreError::ConnectionFailed(
                "connection reset by peer".to_string(),
            )))
        } else {
            let failing = self.failing_items.lock().unwrap().clone();
            let failing_entities = self.failing_entities.lock().unwrap().clone();
            Ok(operations
                .iter()
                .enumerate()
                .map(|(i, op)| {
                    if failing.contains(&(first + i))
                        || failing_entities.contains(op.entity().as_str())
                    {
                        ItemOutcome::failed(format!("Rejected item {}", first + i))
                    } else if op.is_create() {
                        ItemOutcome::created(RecordId::generate())
                    } else {
                        ItemOutcome::ok()
                    }
                })
                .collect())
        };

        if let Some((after, sender)) = self.cancel_after_batch.lock().unwrap().as_ref() {
            if *after == call {
                let _ = sender.send(true);
            }
        }

        result
    }

    async fn create(&self, entity: &EntityName, payload: &Payload) -> Result<RecordRef> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::ClientError {
                status: 400,
                message: "Duplicate name".to_string(),
            }
            .into());
        }
        let reference = RecordRef::new(entity.clone(), RecordId::generate());
        self.creates
            .lock()
            .unwrap()
            .push((reference.clone(), payload.clone()));
        Ok(reference)
    }

    async fn delete(&self, target: &RecordRef) -> Result<()> {
        self.deletes.lock().unwrap().push(target.clone());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::ServerError {
                status: 503,
                message: "unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "mock store".to_string()
    }
}

/// Engine over a mock store with small pages and passthrough tokens
pub fn engine(store: &Arc<MockStore>) -> Engine {
    engine_with(store, 2, 100, 1000)
}

pub fn engine_with(
    store: &Arc<MockStore>,
    page_size: usize,
    max_pages: usize,
    chunk_size: usize,
) -> Engine {
    Engine::new(
        store.clone(),
        Arc::new(PassthroughDecoder),
        &PagingConfig {
            page_size,
            max_pages,
        },
        &BatchConfig { chunk_size },
    )
    .unwrap()
}

pub fn entity(name: &str) -> EntityName {
    EntityName::new(name).unwrap()
}

/// A record with a fresh id stored under `id_field`
pub fn record(entity_name: &str, id_field: &str, fields: Value) -> Record {
    let id = RecordId::generate();
    let mut fields = fields.as_object().cloned().unwrap_or_default();
    fields.insert(id_field.to_string(), Value::String(id.to_string()));
    Record::new(entity(entity_name), id, fields)
}

/// `n` creates of `entity_name` with an ordinal field
pub fn creates(entity_name: &str, n: usize) -> Vec<PendingOperation> {
    (0..n)
        .map(|i| {
            let mut payload = Payload::new();
            payload.insert("ordinal".to_string(), Value::from(i));
            PendingOperation::create(entity(entity_name), payload)
        })
        .collect()
}
