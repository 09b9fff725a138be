//! Import endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use review_import_core::{get_adapter, ExportError};
use uuid::Uuid;

use crate::error::Result;
use crate::models::ImportRequest;
use crate::services::import::{ImportError, ImportSummary};
use crate::AppState;

/// POST /api/users/:user_id/import
/// Normalize a vendor export and replay it into the user's card records
pub async fn import(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportSummary>> {
    let adapter = get_adapter(&payload.source)
        .ok_or_else(|| ImportError::from(ExportError::UnknownSource(payload.source.clone())))?;

    let cards = adapter.normalize(&payload.export).map_err(ImportError::from)?;

    let summary = state
        .importer
        .import(user_id, adapter.name(), cards)
        .await?;

    Ok(Json(summary))
}
