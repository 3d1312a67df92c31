/// Disk storage for post images
///
/// Uploads land in the configured images directory as
/// `<timestamp>-<sanitized name>`; the public path stored on a post is
/// `images/<file>`, which is also the route they are served from.
use crate::error::{AppError, Result};
use crate::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub const PUBLIC_PREFIX: &str = "images/";

/// Text fields larger than this are rejected
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Write an uploaded image field to disk and return its public path.
    /// Fields that are not png/jpg/jpeg are drained and yield `None`.
    pub async fn save_field(&self, field: &mut Field) -> Result<Option<String>> {
        if !is_accepted_image(field.content_type()) {
            tracing::debug!(content_type = ?field.content_type(), "ignoring non-image upload");
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            return Ok(None);
        }

        let original = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("upload")
            .to_string();
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let (file_name, mut file) = self
            .create_unique(&stamp, &sanitize_file_name(&original))
            .await?;
        let target = self.dir.join(&file_name);
        let mut written = 0usize;

        while let Some(chunk) = field.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    discard(&target).await;
                    return Err(e.into());
                }
            };
            written += bytes.len();
            if written > self.max_bytes {
                drop(file);
                discard(&target).await;
                return Err(AppError::invalid("Image exceeds upload limit"));
            }
            file.write_all(&bytes).await?;
        }
        file.flush().await?;

        tracing::info!(file = %file_name, bytes = written, "image stored");
        Ok(Some(format!("{}{}", PUBLIC_PREFIX, file_name)))
    }

    /// Create `<stamp>-<name>`, or `<stamp>-<n>-<name>` when that is taken,
    /// without ever opening an existing file.
    async fn create_unique(&self, stamp: &str, name: &str) -> Result<(String, File)> {
        self.ensure_dir().await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = match attempt {
                0 => format!("{}-{}", stamp, name),
                n => format!("{}-{}-{}", stamp, n, name),
            };
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&file_name))
                .await;
            match opened {
                Ok(file) => return Ok((file_name, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Storage(format!(
            "no free file name for {} after {} attempts",
            name, MAX_NAME_ATTEMPTS
        )))
    }

    /// Remove a stored image by its public path. Failures are logged, never returned.
    pub async fn clear_image(&self, public_path: &str) {
        let Some(target) = self.resolve(public_path) else {
            tracing::warn!(path = %public_path, "refusing to clear image outside images directory");
            return;
        };

        match tokio::fs::remove_file(&target).await {
            Ok(()) => tracing::debug!(path = %public_path, "image cleared"),
            Err(e) => tracing::warn!(path = %public_path, error = %e, "failed to clear image"),
        }
    }

    /// Map a public path (`images/<file>`) or bare file name onto the images
    /// directory. `None` for anything that could escape it.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        stored_name(public_path).map(|name| self.dir.join(name))
    }

    /// The `images/<file>` form of a public path or bare file name
    pub fn public_path(&self, path: &str) -> Option<String> {
        stored_name(path).map(|name| format!("{}{}", PUBLIC_PREFIX, name))
    }
}

fn stored_name(public_path: &str) -> Option<&str> {
    let name = public_path
        .trim()
        .strip_prefix(PUBLIC_PREFIX)
        .unwrap_or(public_path.trim());
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return None;
    }
    Some(name)
}

fn is_accepted_image(content_type: Option<&mime::Mime>) -> bool {
    match content_type {
        Some(ct) if ct.type_() == mime::IMAGE => {
            matches!(ct.subtype().as_str(), "png" | "jpg" | "jpeg")
        }
        _ => false,
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial upload");
    }
}

/// A parsed multipart body: text fields plus at most one stored image
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<String>,
}

impl UploadForm {
    /// Read every field. On failure the image stored so far is cleared, so
    /// a rejected request leaves nothing on disk.
    pub async fn read(mut payload: Multipart, images: &ImageStore) -> Result<Self> {
        let mut form = UploadForm::default();

        match form.read_fields(&mut payload, images).await {
            Ok(()) => Ok(form),
            Err(e) => {
                if let Some(path) = form.image.take() {
                    images.clear_image(&path).await;
                }
                Err(e)
            }
        }
    }

    async fn read_fields(&mut self, payload: &mut Multipart, images: &ImageStore) -> Result<()> {
        while let Some(field) = payload.next().await {
            let mut field = field?;
            let name = field.name().unwrap_or_default().to_string();
            let is_file = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .is_some();

            if name == "image" && is_file {
                if let Some(path) = images.save_field(&mut field).await? {
                    if let Some(previous) = self.image.replace(path) {
                        images.clear_image(&previous).await;
                    }
                }
                continue;
            }

            let mut value = Vec::new();
            while let Some(chunk) = field.next().await {
                let bytes = chunk?;
                if value.len() + bytes.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(AppError::invalid(format!("Field '{}' is too large", name)));
                }
                value.extend_from_slice(&bytes);
            }
            self.fields
                .insert(name, String::from_utf8_lossy(&value).into_owned());
        }

        Ok(())
    }

    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// GET /images/{file}
pub async fn serve_image(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let images = &state.images;
    let not_found = || AppError::NotFound("Image not found.".to_string());

    let target = images.resolve(&name).ok_or_else(not_found)?;
    let bytes = match tokio::fs::read(&target).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let content_type = match Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        _ => mime::APPLICATION_OCTET_STREAM,
    };

    Ok(HttpResponse::Ok().content_type(content_type).body(bytes))
}
