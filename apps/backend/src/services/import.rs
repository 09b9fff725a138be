//! End-to-end review import: resolve, prefetch, replay, dedupe, persist.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use review_import_core::{
    dedupe, merge_reviews, simulate, CanonicalItem, ExistingCard, ExportError, ItemType,
    NormalizedCard, ReviewMode, Scheduler, UpsertRecord,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::services::batch::BatchProcessor;
use crate::services::resolution::ItemResolutionAdapter;
use crate::services::store::{PersistentStore, StoreError};

/// Terminal import failures. Each variant names the stage that failed.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid export: {0}")]
    Export(#[from] ExportError),

    #[error("processing source type `{source_type}` failed: {message}")]
    Processing { source_type: String, message: String },

    #[error("persisting records failed: {0}")]
    Persistence(#[source] StoreError),
}

impl ImportError {
    /// Whether the caller's input was rejected before any processing.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Export(_))
    }
}

/// Counters for one source type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStats {
    /// Records produced, after deduplication within the source type.
    pub processed: usize,
    /// Never-forget cards kept out of the store.
    pub skipped: usize,
    pub duplicates_removed: usize,
    /// Cards whose replay was cut short by a scheduler failure.
    pub failed: usize,
    /// Cards whose search term resolved to nothing.
    pub unresolved: usize,
    pub duration_ms: u64,
}

/// Result of a successful import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub success: bool,
    /// Records handed to the store.
    pub processed_count: usize,
    pub duplicates_removed: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub duration_ms: u64,
    pub by_source: BTreeMap<String, SourceStats>,
}

/// Read-only state shared by every chunk of a run.
struct ReplayContext {
    scheduler: Arc<dyn Scheduler>,
    resolved: HashMap<String, Vec<CanonicalItem>>,
    existing: HashMap<(String, ItemType), ExistingCard>,
    now: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ChunkOutcome {
    records: Vec<UpsertRecord>,
    skipped: usize,
    failed: usize,
    unresolved: usize,
}

struct SourceOutcome {
    source_type: String,
    records: Vec<UpsertRecord>,
    stats: SourceStats,
}

/// Wires resolution, replay and persistence into one pipeline.
pub struct ImportOrchestrator {
    store: Arc<dyn PersistentStore>,
    resolver: Arc<ItemResolutionAdapter>,
    scheduler: Arc<dyn Scheduler>,
    chunks: BatchProcessor,
    prefetch: BatchProcessor,
}

impl ImportOrchestrator {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        resolver: Arc<ItemResolutionAdapter>,
        scheduler: Arc<dyn Scheduler>,
        config: &ImportConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            scheduler,
            chunks: BatchProcessor::new(config.chunk_size, config.max_concurrency),
            prefetch: BatchProcessor::new(config.prefetch_chunk_size, config.max_concurrency),
        }
    }

    pub fn resolver(&self) -> &Arc<ItemResolutionAdapter> {
        &self.resolver
    }

    /// Import normalized cards for `user_id`.
    ///
    /// Authentication is the caller's responsibility.
    pub async fn import(
        &self,
        user_id: Uuid,
        source: &str,
        cards: Vec<NormalizedCard>,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        validate(source, &cards)?;

        tracing::info!(%user_id, source, cards = cards.len(), "starting review import");

        let terms = unique_terms(&cards);
        let resolved = self.resolver.resolve_batch(&terms).await;
        let existing = self.prefetch_existing(user_id, &resolved).await;

        let context = Arc::new(ReplayContext {
            scheduler: Arc::clone(&self.scheduler),
            resolved,
            existing,
            now: Utc::now(),
        });

        let mut groups: BTreeMap<String, Vec<NormalizedCard>> = BTreeMap::new();
        for card in cards {
            groups.entry(card.source.clone()).or_default().push(card);
        }

        // Every source type runs to completion; any failure fails the run.
        let outcomes = join_all(
            groups
                .into_iter()
                .map(|(source_type, cards)| self.process_source(source_type, cards, Arc::clone(&context))),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        let mut by_source = BTreeMap::new();
        let mut records = Vec::new();
        for outcome in outcomes {
            records.extend(outcome.records);
            by_source.insert(outcome.source_type, outcome.stats);
        }

        let deduped = dedupe(records);
        if deduped.discarded > 0 {
            tracing::info!(discarded = deduped.discarded, "removed cross-source duplicates");
        }

        if !deduped.kept.is_empty() {
            self.store
                .batch_upsert(user_id, &deduped.kept)
                .await
                .map_err(ImportError::Persistence)?;
        }

        let summary = ImportSummary {
            success: true,
            processed_count: deduped.kept.len(),
            duplicates_removed: deduped.discarded
                + by_source.values().map(|s| s.duplicates_removed).sum::<usize>(),
            skipped_count: by_source.values().map(|s| s.skipped).sum(),
            failed_count: by_source.values().map(|s| s.failed).sum(),
            duration_ms: started.elapsed().as_millis() as u64,
            by_source,
        };

        tracing::info!(
            %user_id,
            source,
            processed = summary.processed_count,
            duplicates = summary.duplicates_removed,
            skipped = summary.skipped_count,
            failed = summary.failed_count,
            duration_ms = summary.duration_ms,
            "review import finished"
        );
        Ok(summary)
    }

    /// Best-effort lookup of stored cards for every resolved key.
    async fn prefetch_existing(
        &self,
        user_id: Uuid,
        resolved: &HashMap<String, Vec<CanonicalItem>>,
    ) -> HashMap<(String, ItemType), ExistingCard> {
        let keys: Vec<String> = resolved
            .values()
            .flatten()
            .map(|item| item.key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let found = self
            .prefetch
            .run_resilient(keys, "existing-cards", |_, chunk| async move {
                self.store.get_existing(user_id, &chunk).await
            })
            .await;

        found
            .into_iter()
            .flatten()
            .map(|card| ((card.key.clone(), card.item_type), card))
            .collect()
    }

    async fn process_source(
        &self,
        source_type: String,
        cards: Vec<NormalizedCard>,
        context: Arc<ReplayContext>,
    ) -> Result<SourceOutcome, ImportError> {
        let started = Instant::now();
        let source_ref = &source_type;

        let chunks = self
            .chunks
            .run_fail_fast(cards, |index, chunk| {
                let context = Arc::clone(&context);
                async move {
                    tokio::task::spawn_blocking(move || replay_chunk(&context, chunk))
                        .await
                        .map_err(|e| ImportError::Processing {
                            source_type: source_ref.clone(),
                            message: format!("chunk {index}: {e}"),
                        })
                }
            })
            .await?;

        let mut stats = SourceStats::default();
        let mut records = Vec::new();
        for chunk in chunks {
            stats.skipped += chunk.skipped;
            stats.failed += chunk.failed;
            stats.unresolved += chunk.unresolved;
            records.extend(chunk.records);
        }

        let deduped = dedupe(records);
        stats.processed = deduped.kept.len();
        stats.duplicates_removed = deduped.discarded;
        stats.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            source_type = %source_type,
            processed = stats.processed,
            skipped = stats.skipped,
            duplicates = stats.duplicates_removed,
            unresolved = stats.unresolved,
            failed = stats.failed,
            "processed source type"
        );

        Ok(SourceOutcome {
            source_type,
            records: deduped.kept,
            stats,
        })
    }
}

fn validate(source: &str, cards: &[NormalizedCard]) -> Result<(), ImportError> {
    if source.trim().is_empty() {
        return Err(ImportError::InvalidInput("source must not be empty".to_string()));
    }
    for (index, card) in cards.iter().enumerate() {
        if card.search_term.trim().is_empty() {
            return Err(ImportError::InvalidInput(format!(
                "card {index} has an empty search term"
            )));
        }
        if card.source.trim().is_empty() {
            return Err(ImportError::InvalidInput(format!(
                "card {index} has an empty source type"
            )));
        }
    }
    Ok(())
}

fn unique_terms(cards: &[NormalizedCard]) -> Vec<String> {
    let mut seen = HashSet::new();
    cards
        .iter()
        .filter(|card| seen.insert(card.search_term.as_str()))
        .map(|card| card.search_term.clone())
        .collect()
}

fn replay_chunk(context: &ReplayContext, cards: Vec<NormalizedCard>) -> ChunkOutcome {
    let mut outcome = ChunkOutcome::default();

    for card in cards {
        let items = context
            .resolved
            .get(&card.search_term)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if items.is_empty() {
            tracing::debug!(term = %card.search_term, "search term did not resolve");
            outcome.unresolved += 1;
            continue;
        }

        for item in items {
            replay_item(context, &card, item, &mut outcome);
        }
    }

    outcome
}

fn replay_item(
    context: &ReplayContext,
    card: &NormalizedCard,
    item: &CanonicalItem,
    outcome: &mut ChunkOutcome,
) {
    let existing = context.existing.get(&(item.key.clone(), item.item_type));
    let history = merge_reviews(
        existing.map(|e| e.history.as_slice()).unwrap_or_default(),
        &card.reviews,
    );
    // Nothing to replay: the stored card and its logs stay as they are.
    if history.is_empty() {
        tracing::debug!(key = %item.key, item_type = item.item_type.as_str(), "no reviews to replay");
        return;
    }
    let initial = existing
        .map(|e| e.card.clone())
        .unwrap_or_else(|| context.scheduler.new_card(context.now));

    let simulated = match simulate(context.scheduler.as_ref(), &initial, &history) {
        Ok(simulated) => simulated,
        Err(e) => {
            tracing::warn!(key = %item.key, item_type = item.item_type.as_str(), error = %e, "replay aborted, keeping partial state");
            outcome.failed += 1;
            e.partial
        }
    };

    if simulated.card.is_never_forget() {
        outcome.skipped += 1;
        return;
    }

    let mut final_card = simulated.card;
    if !is_valid_due(final_card.due) {
        tracing::warn!(key = %item.key, due = %final_card.due, "invalid due date, rescheduling to now");
        final_card.due = context.now;
    }

    outcome.records.push(UpsertRecord {
        key: item.key.clone(),
        item_type: item.item_type,
        card: final_card,
        mode: existing
            .map(|e| e.mode)
            .unwrap_or_else(|| default_mode(item.item_type, &card.search_term)),
        logs: simulated.logs,
        lesson_id: existing.and_then(|e| e.lesson_id.clone()),
        history,
    });
}

/// Due dates must fall in the unix era and below the `MAX_UTC` saturation
/// point. Anything else, pre-1970 instants included, is rescheduled to the
/// start of the run.
fn is_valid_due(due: DateTime<Utc>) -> bool {
    due.timestamp() >= 0 && due < DateTime::<Utc>::MAX_UTC
}

/// Kana-only vocabulary is studied in kana mode.
fn default_mode(item_type: ItemType, search_term: &str) -> ReviewMode {
    if item_type == ItemType::Vocabulary && is_kana(search_term) {
        ReviewMode::Kana
    } else {
        ReviewMode::Readings
    }
}

fn is_kana(term: &str) -> bool {
    !term.is_empty() && term.chars().all(|c| matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}'))
}
