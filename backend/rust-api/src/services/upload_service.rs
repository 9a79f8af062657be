use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::metrics::COURSE_IMAGES_UPLOADED_TOTAL;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5 MiB

/// Stores uploaded course images in a local static directory.
///
/// Files are written under `{uuid}-{original_name}` so concurrent uploads of
/// the same filename never collide; the returned URL path is what gets stored
/// on the course document.
#[derive(Clone, Debug)]
pub struct UploadService {
    upload_dir: PathBuf,
}

impl UploadService {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    /// Write image bytes to disk and return the public URL path
    pub async fn store_image(&self, original_name: &str, bytes: Vec<u8>) -> Result<String> {
        if bytes.is_empty() {
            COURSE_IMAGES_UPLOADED_TOTAL
                .with_label_values(&["rejected"])
                .inc();
            bail!("Uploaded image is empty");
        }

        if bytes.len() > MAX_IMAGE_BYTES {
            COURSE_IMAGES_UPLOADED_TOTAL
                .with_label_values(&["rejected"])
                .inc();
            bail!("Uploaded image exceeds {} bytes", MAX_IMAGE_BYTES);
        }

        let unique_filename = format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name));

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .context("Failed to create upload directory")?;

        let file_path = self.upload_dir.join(&unique_filename);
        tokio::fs::write(&file_path, bytes)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        COURSE_IMAGES_UPLOADED_TOTAL
            .with_label_values(&["stored"])
            .inc();

        tracing::info!("Stored course image: {}", file_path.display());

        Ok(format!("/uploads/{}", unique_filename))
    }

    /// Remove a previously stored image, ignoring files outside the upload dir
    pub async fn remove_image(&self, url_path: &str) -> Result<()> {
        let Some(filename) = url_path.strip_prefix("/uploads/") else {
            return Ok(());
        };

        // Never follow path components out of the upload directory
        let filename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if filename.is_empty() {
            return Ok(());
        }

        let file_path = self.upload_dir.join(filename);
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", file_path.display())),
        }
    }
}

/// Keep only the final path component and replace shell-hostile characters
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
