//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - In-memory stand-ins for the persistent store and resolution service
//! - TestContext wiring them into an import orchestrator and router

#![allow(dead_code)]

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use review_import_backend::config::ImportConfig;
use review_import_backend::services::import::ImportOrchestrator;
use review_import_backend::services::resolution::{
    ItemResolutionAdapter, ItemResolutionService, ResolutionCache, ResolutionError,
};
use review_import_backend::services::store::{PersistentStore, StoreError};
use review_import_backend::{build_router, AppState};
use review_import_core::scheduler::fsrs::Fsrs;
use review_import_core::{
    CanonicalItem, CardState, ExistingCard, ItemType, Rating, Scheduler, SchedulerError,
    Transition, UpsertRecord,
};

/// Store keeping records in memory.
#[derive(Default)]
pub struct InMemoryStore {
    cards: Mutex<HashMap<(Uuid, String, ItemType), ExistingCard>>,
    writes: Mutex<Vec<Vec<UpsertRecord>>>,
    /// Lookups touching any of these keys fail.
    fail_prefetch_keys: HashSet<String>,
    fail_writes: bool,
    pub prefetch_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_prefetch_for(mut self, key: &str) -> Self {
        self.fail_prefetch_keys.insert(key.to_string());
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn insert(&self, user_id: Uuid, card: ExistingCard) {
        self.cards
            .lock()
            .unwrap()
            .insert((user_id, card.key.clone(), card.item_type), card);
    }

    /// Batches passed to `batch_upsert`, oldest first.
    pub fn writes(&self) -> Vec<Vec<UpsertRecord>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn stored(&self, user_id: Uuid, key: &str, item_type: ItemType) -> Option<ExistingCard> {
        self.cards
            .lock()
            .unwrap()
            .get(&(user_id, key.to_string(), item_type))
            .cloned()
    }
}

#[async_trait]
impl PersistentStore for InMemoryStore {
    async fn get_existing(&self, user_id: Uuid, keys: &[String]) -> Result<Vec<ExistingCard>, StoreError> {
        self.prefetch_calls.fetch_add(1, Ordering::SeqCst);
        if keys.iter().any(|k| self.fail_prefetch_keys.contains(k)) {
            return Err(StoreError::Backend("prefetch unavailable".to_string()));
        }
        let cards = self.cards.lock().unwrap();
        Ok(cards
            .iter()
            .filter(|((user, key, _), _)| *user == user_id && keys.contains(key))
            .map(|(_, card)| card.clone())
            .collect())
    }

    async fn batch_upsert(&self, user_id: Uuid, records: &[UpsertRecord]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.writes.lock().unwrap().push(records.to_vec());
        for record in records {
            self.insert(
                user_id,
                ExistingCard {
                    key: record.key.clone(),
                    item_type: record.item_type,
                    card: record.card.clone(),
                    mode: record.mode,
                    lesson_id: record.lesson_id.clone(),
                    history: record.history.clone(),
                },
            );
        }
        Ok(())
    }
}

/// Resolution service backed by a fixed table.
#[derive(Default)]
pub struct StaticResolver {
    table: HashMap<String, Vec<CanonicalItem>>,
    /// Batches containing any of these terms fail.
    fail_terms: HashSet<String>,
    pub calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, term: &str, key: &str, item_type: ItemType) -> Self {
        self.table
            .entry(term.to_string())
            .or_default()
            .push(CanonicalItem::new(key, item_type));
        self
    }

    pub fn failing_on(mut self, term: &str) -> Self {
        self.fail_terms.insert(term.to_string());
        self
    }
}

#[async_trait]
impl ItemResolutionService for StaticResolver {
    async fn resolve(
        &self,
        terms: &[String],
    ) -> Result<HashMap<String, Vec<CanonicalItem>>, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if terms.iter().any(|t| self.fail_terms.contains(t)) {
            return Err(ResolutionError::Backend("lookup service unreachable".to_string()));
        }
        Ok(terms
            .iter()
            .filter_map(|t| self.table.get(t).map(|items| (t.clone(), items.clone())))
            .collect())
    }
}

/// FSRS that fails every rated review at one of the given instants.
pub struct FailingScheduler {
    inner: Fsrs,
    fail_at: HashSet<DateTime<Utc>>,
}

impl FailingScheduler {
    pub fn at(instants: &[DateTime<Utc>]) -> Self {
        Self {
            inner: Fsrs::default(),
            fail_at: instants.iter().copied().collect(),
        }
    }
}

impl Scheduler for FailingScheduler {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn new_card(&self, created_at: DateTime<Utc>) -> CardState {
        self.inner.new_card(created_at)
    }

    fn next(&self, card: &CardState, now: DateTime<Utc>, rating: Rating) -> Result<Transition, SchedulerError> {
        if self.fail_at.contains(&now) {
            return Err(SchedulerError::NonFiniteOutput { field: "stability" });
        }
        self.inner.next(card, now, rating)
    }

    fn forget(&self, card: &CardState, now: DateTime<Utc>, reset_count: bool) -> Result<Transition, SchedulerError> {
        self.inner.forget(card, now, reset_count)
    }
}

/// FSRS whose rated reviews always come back due at `MAX_UTC`.
pub struct SaturatingScheduler(pub Fsrs);

impl Scheduler for SaturatingScheduler {
    fn name(&self) -> &'static str {
        "saturating"
    }

    fn new_card(&self, created_at: DateTime<Utc>) -> CardState {
        self.0.new_card(created_at)
    }

    fn next(&self, card: &CardState, now: DateTime<Utc>, rating: Rating) -> Result<Transition, SchedulerError> {
        let mut transition = self.0.next(card, now, rating)?;
        transition.card.due = DateTime::<Utc>::MAX_UTC;
        Ok(transition)
    }

    fn forget(&self, card: &CardState, now: DateTime<Utc>, reset_count: bool) -> Result<Transition, SchedulerError> {
        self.0.forget(card, now, reset_count)
    }
}

/// Test context wiring fakes into the pipeline.
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub resolver: Arc<StaticResolver>,
    pub importer: Arc<ImportOrchestrator>,
}

impl TestContext {
    pub fn new(store: InMemoryStore, resolver: StaticResolver) -> Self {
        Self::with_config(store, resolver, ImportConfig::default())
    }

    pub fn with_config(store: InMemoryStore, resolver: StaticResolver, config: ImportConfig) -> Self {
        Self::build(store, resolver, Arc::new(Fsrs::default()), config)
    }

    pub fn with_scheduler(
        store: InMemoryStore,
        resolver: StaticResolver,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::build(store, resolver, scheduler, ImportConfig::default())
    }

    fn build(
        store: InMemoryStore,
        resolver: StaticResolver,
        scheduler: Arc<dyn Scheduler>,
        config: ImportConfig,
    ) -> Self {
        let store = Arc::new(store);
        let resolver = Arc::new(resolver);
        let adapter = Arc::new(ItemResolutionAdapter::new(
            resolver.clone(),
            Arc::new(ResolutionCache::new()),
            config.resolution_batch_size,
            config.max_concurrency,
        ));
        let importer = Arc::new(ImportOrchestrator::new(
            store.clone(),
            adapter,
            scheduler,
            &config,
        ));

        Self {
            store,
            resolver,
            importer,
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        build_router(AppState {
            importer: self.importer.clone(),
        })
    }
}
