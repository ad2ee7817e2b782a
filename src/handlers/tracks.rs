//! Track catalog: the sole mutator of the `tracks` table and the only code
//! path that deletes blobs from the file store. Every mutation keeps the row
//! and its referenced files consistent as a matched pair.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    auth::AuthAdmin,
    db::entities::track,
    error::{AppError, Result},
    state::AppState,
    upload::{self, TrackForm},
};

#[derive(Serialize)]
pub struct CreateTrackResponse {
    pub id: i32,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public listing in playback order: `track_order` ascending, ties broken by
/// `created_at` descending.
pub async fn list_tracks(State(state): State<AppState>) -> Result<Json<Vec<track::Model>>> {
    let tracks = track::Entity::find()
        .order_by_asc(track::Column::TrackOrder)
        .order_by_desc(track::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(tracks))
}

pub async fn create_track(
    State(state): State<AppState>,
    admin: AuthAdmin,
    multipart: Multipart,
) -> Result<Json<CreateTrackResponse>> {
    let form = upload::collect_track_form(multipart, &state.config, true).await?;

    match insert_track(&state, &form).await {
        Ok(id) => {
            tracing::info!(user_id = admin.user_id, track_id = id, "Track uploaded");
            Ok(Json(CreateTrackResponse {
                id,
                message: "Track uploaded successfully".to_string(),
            }))
        }
        Err(e) => {
            // No row was created; drop the blobs so nothing is orphaned
            form.discard(&state.config).await;
            Err(e)
        }
    }
}

async fn insert_track(state: &AppState, form: &TrackForm) -> Result<i32> {
    let (title, artist) = required_metadata(form)?;
    let audio = form
        .audio
        .as_ref()
        .ok_or_else(|| AppError::MissingRequiredFile("Track file is required".to_string()))?;

    let row = track::ActiveModel {
        title: Set(title),
        artist: Set(artist),
        album: Set(form.album.clone()),
        duration: Set(form.duration),
        file_path: Set(audio.rel_path.clone()),
        artwork_path: Set(form.artwork.as_ref().map(|f| f.rel_path.clone())),
        track_order: Set(0),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    Ok(row.insert(&state.db).await?.id)
}

pub async fn update_track(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>> {
    // The edit route never accepts audio; re-upload requires delete + create
    let form = upload::collect_track_form(multipart, &state.config, false).await?;

    match apply_update(&state, id, &form).await {
        Ok(()) => {
            tracing::info!(user_id = admin.user_id, track_id = id, "Track updated");
            Ok(Json(MessageResponse {
                message: "Track updated successfully".to_string(),
            }))
        }
        Err(e) => {
            form.discard(&state.config).await;
            Err(e)
        }
    }
}

async fn apply_update(state: &AppState, id: i32, form: &TrackForm) -> Result<()> {
    let existing = track::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Track not found".to_string()))?;

    let (title, artist) = required_metadata(form)?;
    let previous_artwork = existing.artwork_path.clone();

    let mut active: track::ActiveModel = existing.into();
    active.title = Set(title);
    active.artist = Set(artist);
    active.album = Set(form.album.clone());
    active.duration = Set(form.duration);

    if let Some(new_artwork) = &form.artwork {
        active.artwork_path = Set(Some(new_artwork.rel_path.clone()));
    }

    active.update(&state.db).await?;

    // Only after the row points at the new artwork is the old blob removed
    if form.artwork.is_some() {
        if let Some(old_path) = previous_artwork {
            upload::remove_blob(upload::blob_path(&state.config, &old_path)).await;
        }
    }

    Ok(())
}

pub async fn delete_track(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let existing = track::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Track not found".to_string()))?;

    // Best-effort blob removal; missing files are not an error
    upload::remove_blob(upload::blob_path(&state.config, &existing.file_path)).await;
    if let Some(artwork_path) = &existing.artwork_path {
        upload::remove_blob(upload::blob_path(&state.config, artwork_path)).await;
    }

    track::Entity::delete_by_id(id).exec(&state.db).await?;

    tracing::info!(user_id = admin.user_id, track_id = id, "Track deleted");

    Ok(Json(MessageResponse {
        message: "Track deleted successfully".to_string(),
    }))
}

/// Assign `track_order` = positional index for the submitted sequence.
///
/// Applied as independent per-row updates: a failure midway leaves rows
/// already visited in their new order. Resubmitting the full order is
/// idempotent, so callers retry by sending the same payload again.
pub async fn reorder_tracks(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Json(payload): Json<Value>,
) -> Result<Json<MessageResponse>> {
    let entries = payload
        .get("tracks")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::InvalidRequest("Invalid request format".to_string()))?;

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry
            .get("id")
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| AppError::InvalidRequest("Invalid request format".to_string()))?;
        ids.push(id);
    }

    for (position, id) in ids.iter().enumerate() {
        track::Entity::update_many()
            .col_expr(track::Column::TrackOrder, Expr::value(position as i32))
            .filter(track::Column::Id.eq(*id))
            .exec(&state.db)
            .await?;
    }

    tracing::info!(user_id = admin.user_id, count = ids.len(), "Tracks reordered");

    Ok(Json(MessageResponse {
        message: "Tracks reordered successfully".to_string(),
    }))
}

fn required_metadata(form: &TrackForm) -> Result<(String, String)> {
    let title = form
        .title
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Title and artist are required".to_string()))?;
    let artist = form
        .artist
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Title and artist are required".to_string()))?;

    Ok((title.to_string(), artist.to_string()))
}
