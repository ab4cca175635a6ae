use crate::forms::UploadedImage;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

const IMAGE_SUBDIR: &str = "birthdays_images";

/// Writes an uploaded image under the media directory and returns its path
/// relative to that directory, as served under `/media/`.
pub async fn save_image(media_dir: &Path, image: &UploadedImage) -> Result<String> {
    let extension = image.extension().context("Unsupported image type")?;
    let dir = media_dir.join(IMAGE_SUBDIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .context("Failed to create media directory")?;

    let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
    tokio::fs::write(dir.join(&file_name), &image.bytes)
        .await
        .context("Failed to write image")?;
    Ok(format!("{IMAGE_SUBDIR}/{file_name}"))
}

/// Deletes a stored image. A missing file is not an error; other failures
/// are logged so the request that triggered the cleanup still succeeds.
pub async fn remove_image(media_dir: &Path, relative: &str) {
    match tokio::fs::remove_file(media_dir.join(relative)).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, image = relative, "failed to remove image"),
    }
}
