//! Storage for candidate photos, kept as plain files under the upload directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    fs::FileServer,
    tokio::{
        fs,
        io::{AsyncWrite, AsyncWriteExt},
    },
    Build, Rocket,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// URL prefix under which photos are served.
pub const PHOTO_ROUTE: &str = "/static/img";

/// Extensions accepted for uploaded photos.
pub const PHOTO_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Longest accepted photo file name, in bytes, after sanitizing.
pub const MAX_PHOTO_NAME_LENGTH: usize = 100;

/// A directory of photo files. References handed out by [`PhotoStore::save`]
/// are bare file names inside that directory.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Open the store, creating its directory if it does not exist yet.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a new photo, returning its reference.
    ///
    /// The reference is the sanitized name prefixed with a fresh ID, so two
    /// uploads with the same file name never share a file.
    pub async fn save(&self, bytes: &[u8], sanitized_name: &str) -> Result<String> {
        let reference = format!("{}_{}", Id::new(), sanitized_name);
        let path = self.root.join(&reference);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_discard(&path, file, bytes).await?;
        debug!("Stored photo {reference} ({} bytes)", bytes.len());
        Ok(reference)
    }

    /// Delete a photo. Returns `Ok(false)` if it was already gone.
    pub async fn delete(&self, reference: &str) -> Result<bool> {
        if sanitize_file_name(reference).as_deref() != Some(reference) {
            return Err(Error::InvalidPhoto(format!(
                "'{reference}' is not a photo reference"
            )));
        }
        match fs::remove_file(self.root.join(reference)).await {
            Ok(()) => {
                debug!("Deleted photo {reference}");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
impl PhotoStore {
    /// Does the store hold a photo with this reference?
    pub async fn contains(&self, reference: &str) -> bool {
        fs::metadata(self.root.join(reference)).await.is_ok()
    }

    /// Number of files in the store.
    pub async fn file_count(&self) -> usize {
        let mut entries = fs::read_dir(&self.root).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }
}

/// Write `bytes` to the freshly created file at `path`. If writing fails, the
/// partial file is removed.
async fn write_or_discard<W>(path: &Path, mut file: W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        if let Err(cleanup_err) = fs::remove_file(path).await {
            warn!(
                "Failed to remove partial photo {}: {cleanup_err}",
                path.display()
            );
        }
        return Err(e.into());
    }
    Ok(())
}

/// Reduce an uploaded file name to something safe to store on disk.
///
/// Path separators become underscores, anything outside `[A-Za-z0-9._-]` is
/// dropped, and leading dots or underscores are stripped, so the result can
/// never traverse out of the upload directory. Returns `None` if nothing is
/// left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .split(|c: char| c == '/' || c == '\\' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Sanitize an uploaded photo's file name and check it has an image extension.
pub fn photo_file_name(raw: &str) -> Result<String> {
    let name = sanitize_file_name(raw)
        .ok_or_else(|| Error::InvalidPhoto(format!("unusable file name '{raw}'")))?;
    if name.len() > MAX_PHOTO_NAME_LENGTH {
        return Err(Error::InvalidPhoto(format!(
            "file name is longer than {MAX_PHOTO_NAME_LENGTH} bytes"
        )));
    }
    let extension = Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if PHOTO_EXTENSIONS.contains(&ext.as_str()) => Ok(name),
        _ => Err(Error::InvalidPhoto(format!(
            "'{name}' is not one of: {}",
            PHOTO_EXTENSIONS.join(", ")
        ))),
    }
}

/// A fairing that opens the [`PhotoStore`] at the configured upload directory,
/// places it into managed state, and serves its files under [`PHOTO_ROUTE`].
///
/// Must be attached after the config fairing.
pub struct PhotoStoreFairing;

#[rocket::async_trait]
impl Fairing for PhotoStoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Photo store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let upload_dir = match rocket.state::<Config>() {
            Some(config) => config.upload_dir().to_path_buf(),
            None => {
                error!("Photo store needs the application config");
                return Err(rocket);
            }
        };
        let store = match PhotoStore::open(&upload_dir).await {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to open photo directory {}: {e}", upload_dir.display());
                return Err(rocket);
            }
        };
        info!("Serving photos from {}", upload_dir.display());
        Ok(rocket
            .mount(PHOTO_ROUTE, FileServer::from(&upload_dir))
            .manage(store))
    }
}
