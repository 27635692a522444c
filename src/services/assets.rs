//! AssetStore: thumbnails written under `root` and served from `base_url`.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Image types accepted as thumbnails and the extension each is stored with.
const THUMBNAIL_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
];

/// Strip parameters and case from a declared media type
/// (`"Image/PNG; q=1"` -> `"image/png"`). `None` if it does not parse.
pub fn media_type_essence(content_type: &str) -> Option<String> {
    content_type
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}

/// File extension for an allowed thumbnail media type.
pub fn thumbnail_extension(content_type: &str) -> Option<&'static str> {
    let essence = media_type_essence(content_type)?;
    THUMBNAIL_TYPES
        .iter()
        .find(|(media_type, _)| *media_type == essence)
        .map(|(_, ext)| *ext)
}

pub fn allowed_thumbnail_types() -> impl Iterator<Item = &'static str> {
    THUMBNAIL_TYPES.iter().map(|(media_type, _)| *media_type)
}

#[derive(Clone, Debug)]
pub struct AssetStore {
    /// Directory on disk holding served assets.
    pub root: PathBuf,
    base_url: String,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Public URL for an asset file name.
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), filename)
    }

    /// Write `bytes` to `root/filename`, replacing any previous file.
    ///
    /// Goes through a temp file in the same directory and a rename so readers
    /// never observe a partial asset. Returns the final path.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid asset name `{}`", filename),
            ));
        }

        fs::create_dir_all(&self.root).await?;
        let final_path = self.root.join(filename);
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        debug!(path = %final_path.display(), size_bytes = bytes.len(), "wrote asset");
        Ok(final_path)
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
