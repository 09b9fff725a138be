//! PostgreSQL database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::resolution::{ItemResolutionService, ResolutionError};
use crate::services::store::{PersistentStore, StoreError};

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    // === Card Repository ===

    /// Get stored cards for a user by item key
    pub async fn get_cards_by_keys(
        &self,
        user_id: Uuid,
        keys: &[String],
    ) -> std::result::Result<Vec<DbSrsCard>, sqlx::Error> {
        sqlx::query_as::<_, DbSrsCard>(
            r#"
            SELECT user_id, item_key, item_type, mode, lesson_id, stability, difficulty,
                   due, last_review, state, elapsed_days, scheduled_days, reps, lapses
            FROM srs_cards
            WHERE user_id = $1 AND item_key = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(keys)
        .fetch_all(&self.pool)
        .await
    }

    /// Get stored review history for a user by item key, oldest first
    pub async fn get_history_by_keys(
        &self,
        user_id: Uuid,
        keys: &[String],
    ) -> std::result::Result<Vec<DbReviewHistory>, sqlx::Error> {
        sqlx::query_as::<_, DbReviewHistory>(
            r#"
            SELECT item_key, item_type, reviewed_at, grade, source
            FROM srs_review_history
            WHERE user_id = $1 AND item_key = ANY($2)
            ORDER BY item_key, item_type, position
            "#,
        )
        .bind(user_id)
        .bind(keys)
        .fetch_all(&self.pool)
        .await
    }

    /// Upsert one record, replacing its history and logs
    async fn upsert_record(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        record: &UpsertRecord,
    ) -> std::result::Result<(), sqlx::Error> {
        let item_type = record.item_type.as_str();
        let card = &record.card;

        sqlx::query(
            r#"
            INSERT INTO srs_cards (user_id, item_key, item_type, mode, lesson_id, stability,
                                   difficulty, due, last_review, state, elapsed_days,
                                   scheduled_days, reps, lapses)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (user_id, item_key, item_type) DO UPDATE SET
                mode = EXCLUDED.mode,
                lesson_id = EXCLUDED.lesson_id,
                stability = EXCLUDED.stability,
                difficulty = EXCLUDED.difficulty,
                due = EXCLUDED.due,
                last_review = EXCLUDED.last_review,
                state = EXCLUDED.state,
                elapsed_days = EXCLUDED.elapsed_days,
                scheduled_days = EXCLUDED.scheduled_days,
                reps = EXCLUDED.reps,
                lapses = EXCLUDED.lapses,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&record.key)
        .bind(item_type)
        .bind(record.mode.as_str())
        .bind(&record.lesson_id)
        .bind(card.stability)
        .bind(card.difficulty)
        .bind(card.due)
        .bind(card.last_review)
        .bind(card.state.as_str())
        .bind(card.elapsed_days)
        .bind(card.scheduled_days)
        .bind(card.reps as i32)
        .bind(card.lapses as i32)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "DELETE FROM srs_review_history WHERE user_id = $1 AND item_key = $2 AND item_type = $3",
        )
        .bind(user_id)
        .bind(&record.key)
        .bind(item_type)
        .execute(&mut **tx)
        .await?;

        for (position, event) in record.history.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO srs_review_history (user_id, item_key, item_type, position,
                                                reviewed_at, grade, source)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(user_id)
            .bind(&record.key)
            .bind(item_type)
            .bind(position as i32)
            .bind(event.timestamp)
            .bind(&event.grade)
            .bind(&event.source)
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(
            "DELETE FROM srs_review_logs WHERE user_id = $1 AND item_key = $2 AND item_type = $3",
        )
        .bind(user_id)
        .bind(&record.key)
        .bind(item_type)
        .execute(&mut **tx)
        .await?;

        for log in &record.logs {
            sqlx::query(
                r#"
                INSERT INTO srs_review_logs (user_id, item_key, item_type, rating, previous_state,
                                             new_state, stability, difficulty, due, reviewed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(user_id)
            .bind(&record.key)
            .bind(item_type)
            .bind(log.rating.as_str())
            .bind(log.previous_state.as_str())
            .bind(log.new_state.as_str())
            .bind(log.stability)
            .bind(log.difficulty)
            .bind(log.due)
            .bind(log.reviewed_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    // === Item Lookup Repository ===

    /// Get lookup rows for a set of search terms
    pub async fn get_items_by_terms(
        &self,
        terms: &[String],
    ) -> std::result::Result<Vec<DbItemLookup>, sqlx::Error> {
        sqlx::query_as::<_, DbItemLookup>(
            r#"
            SELECT search_term, item_key, item_type
            FROM item_lookup
            WHERE search_term = ANY($1)
            ORDER BY search_term, position
            "#,
        )
        .bind(terms)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl PersistentStore for Database {
    async fn get_existing(
        &self,
        user_id: Uuid,
        keys: &[String],
    ) -> std::result::Result<Vec<ExistingCard>, StoreError> {
        let rows = self.get_cards_by_keys(user_id, keys).await?;

        let mut history: HashMap<(String, String), Vec<ReviewEvent>> = HashMap::new();
        for row in self.get_history_by_keys(user_id, keys).await? {
            let event = row.to_event();
            history
                .entry((row.item_key, row.item_type))
                .or_default()
                .push(event);
        }

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let events = history
                    .remove(&(row.item_key.clone(), row.item_type.clone()))
                    .unwrap_or_default();
                row.into_existing(events)
            })
            .collect())
    }

    async fn batch_upsert(
        &self,
        user_id: Uuid,
        records: &[UpsertRecord],
    ) -> std::result::Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            Self::upsert_record(&mut tx, user_id, record).await?;
        }
        tx.commit().await?;

        tracing::info!(%user_id, records = records.len(), "persisted card records");
        Ok(())
    }
}

#[async_trait]
impl ItemResolutionService for Database {
    async fn resolve(
        &self,
        terms: &[String],
    ) -> std::result::Result<HashMap<String, Vec<CanonicalItem>>, ResolutionError> {
        let mut resolved: HashMap<String, Vec<CanonicalItem>> = HashMap::new();
        for row in self.get_items_by_terms(terms).await? {
            match ItemType::parse(&row.item_type) {
                Some(item_type) => resolved
                    .entry(row.search_term)
                    .or_default()
                    .push(CanonicalItem::new(row.item_key, item_type)),
                None => {
                    tracing::warn!(term = %row.search_term, item_type = %row.item_type, "skipping lookup row with unknown item type");
                }
            }
        }
        Ok(resolved)
    }
}
