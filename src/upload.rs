//! Upload pipeline: validates and persists multipart file submissions before
//! the catalog touches the database.
//!
//! Field-to-directory mapping is fixed: the `track` field only ever lands
//! under `<upload root>/tracks/`, `artwork` under `<upload root>/artwork/`.
//! A request is all-or-nothing: any validation or storage failure removes
//! every blob already written for it.

use axum::extract::multipart::{Field, Multipart};
use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::{
    config::Config,
    error::{AppError, Result},
};

/// Per-file size ceiling: 50 MiB.
pub const MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// A blob persisted under the upload root. `rel_path` is relative to that
/// root (e.g. `tracks/<name>`): it is what gets stored in the catalog row,
/// and the static file route resolves it against the same root.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub rel_path: String,
}

/// Resolve a stored relative path to its location on disk.
pub fn blob_path(config: &Config, rel_path: &str) -> PathBuf {
    Path::new(&config.upload_dir).join(rel_path)
}

/// Parsed multipart submission: track metadata fields plus up to one stored
/// file per file field.
#[derive(Debug, Default)]
pub struct TrackForm {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<f64>,
    pub audio: Option<StoredFile>,
    pub artwork: Option<StoredFile>,
}

impl TrackForm {
    /// Remove every blob this form persisted. Best-effort: failures are
    /// logged, never surfaced, since the primary error is already on its way
    /// to the caller.
    pub async fn discard(self, config: &Config) {
        if let Some(file) = self.audio {
            remove_blob(blob_path(config, &file.rel_path)).await;
        }
        if let Some(file) = self.artwork {
            remove_blob(blob_path(config, &file.rel_path)).await;
        }
    }
}

/// Consume a multipart request into a [`TrackForm`], persisting accepted
/// files as they stream in.
///
/// `accept_audio` is false for the edit route, which has no way to replace a
/// track's audio. On any error, blobs already written for this request are
/// removed before the error is returned.
pub async fn collect_track_form(
    multipart: Multipart,
    config: &Config,
    accept_audio: bool,
) -> Result<TrackForm> {
    let mut form = TrackForm::default();
    match read_fields(multipart, config, accept_audio, &mut form).await {
        Ok(()) => Ok(form),
        Err(err) => {
            form.discard(config).await;
            Err(err)
        }
    }
}

async fn read_fields(
    mut multipart: Multipart,
    config: &Config,
    accept_audio: bool,
    form: &mut TrackForm,
) -> Result<()> {
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "title" => form.title = Some(field.text().await?),
            "artist" => form.artist = Some(field.text().await?),
            "album" => {
                let value = field.text().await?;
                form.album = (!value.trim().is_empty()).then_some(value);
            }
            "duration" => form.duration = field.text().await?.trim().parse().ok(),
            "track" if accept_audio => {
                if form.audio.is_some() {
                    return Err(AppError::InvalidRequest(
                        "Only one track file per upload".to_string(),
                    ));
                }
                let content_type = field.content_type().unwrap_or_default();
                if !content_type.starts_with("audio/") {
                    return Err(AppError::InvalidFileType(
                        "Only audio files are allowed for tracks".to_string(),
                    ));
                }
                form.audio = Some(store_field(field, config, "tracks").await?);
            }
            "track" => {
                return Err(AppError::InvalidRequest(
                    "Audio cannot be replaced; delete the track and re-upload".to_string(),
                ));
            }
            "artwork" => {
                if form.artwork.is_some() {
                    return Err(AppError::InvalidRequest(
                        "Only one artwork file per upload".to_string(),
                    ));
                }
                let content_type = field.content_type().unwrap_or_default();
                if !content_type.starts_with("image/") {
                    return Err(AppError::InvalidFileType(
                        "Only image files are allowed for artwork".to_string(),
                    ));
                }
                form.artwork = Some(store_field(field, config, "artwork").await?);
            }
            _ => {}
        }
    }

    Ok(())
}

/// Stream one file field to disk under `<upload root>/<subdir>/`, enforcing
/// the per-file size ceiling. A partial write left by an error or client
/// disconnect is removed before returning.
async fn store_field(mut field: Field<'_>, config: &Config, subdir: &str) -> Result<StoredFile> {
    let original = field.file_name().unwrap_or("upload").to_string();
    let stored_name = format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        rand::thread_rng().gen::<u32>(),
        sanitize_file_name(&original),
    );

    let dir = Path::new(&config.upload_dir).join(subdir);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(&stored_name);

    let mut file = tokio::fs::File::create(&path).await?;
    let mut written: u64 = 0;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                drop(file);
                remove_blob(&path).await;
                return Err(e.into());
            }
        };

        written += chunk.len() as u64;
        if written > MAX_FILE_BYTES {
            drop(file);
            remove_blob(&path).await;
            return Err(AppError::PayloadTooLarge(
                "File exceeds the 50 MiB limit".to_string(),
            ));
        }

        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            remove_blob(&path).await;
            return Err(e.into());
        }
    }

    file.flush().await?;
    tracing::debug!("Stored {} ({} bytes)", path.display(), written);

    // Rows hold the root-relative path; only filesystem code joins the root
    Ok(StoredFile {
        rel_path: format!("{subdir}/{stored_name}"),
    })
}

/// Delete a blob, swallowing errors. Missing files are expected (cleanup may
/// race or re-run); anything else is logged.
pub async fn remove_blob(path: impl AsRef<Path>) {
    let path = path.as_ref();
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove blob {}: {}", path.display(), e);
        }
    }
}

/// Reduce a client-supplied filename to its final path component and strip
/// anything outside a conservative character set, defeating traversal via
/// the original name.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['_', '.']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("song.mp3"), "song.mp3");
        assert_eq!(sanitize_file_name("My_Track-01.flac"), "My_Track-01.flac");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("/etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("../../escape.mp3"), "escape.mp3");
    }

    #[test]
    fn test_sanitize_replaces_odd_characters() {
        assert_eq!(sanitize_file_name("a b?c.mp3"), "a_b_c.mp3");
        // Backslashes are not separators on unix; they get replaced instead
        assert_eq!(sanitize_file_name("..\\evil.mp3"), ".._evil.mp3");
    }

    #[test]
    fn test_sanitize_rejects_empty_results() {
        assert_eq!(sanitize_file_name("???"), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
