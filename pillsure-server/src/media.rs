//! Image storage behind a trait seam.
//!
//! `LocalMediaStore` keeps objects on disk under the media directory and
//! serves them via `/media`. An S3-compatible implementation can slot in
//! behind the same trait without touching the handlers; the diff/rollback
//! logic in the admin medicine flow only sees keys and URLs.

use pillsure_core::PillsureError;
use std::path::PathBuf;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

pub trait MediaStore: Send + Sync {
    /// Validate and store an image, returning its public URL and key.
    fn put(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, PillsureError>;

    /// Delete a stored object by key.
    fn delete(&self, key: &str) -> Result<(), PillsureError>;

    /// Map a public URL back to a storage key, if this store owns it.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Filesystem-backed store.
pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for_key(&self, key: &str) -> Option<PathBuf> {
        // Keys are generated by `put`; reject anything path-like that could
        // escape the media root.
        if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return None;
        }
        Some(self.root.join(key))
    }
}

/// Validate an upload against the image policy shared by every store
/// implementation: image MIME only, no SVG, extension allowlist, 5 MiB cap.
pub fn validate_image(
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<(), PillsureError> {
    if !content_type.starts_with("image/") {
        return Err(PillsureError::BadRequest(format!(
            "Only image uploads are allowed. Received: {}",
            content_type
        )));
    }
    if content_type == "image/svg+xml" {
        return Err(PillsureError::BadRequest(
            "SVG uploads are not permitted".to_string(),
        ));
    }
    let extension = extension_of(file_name);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(PillsureError::BadRequest(format!(
            "Extension .{} not allowed. Allowed: {}",
            if extension.is_empty() { "(none)" } else { &extension },
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(PillsureError::BadRequest(format!(
            "File too large ({} bytes). Max allowed is {} bytes",
            bytes.len(),
            MAX_UPLOAD_BYTES
        )));
    }
    Ok(())
}

fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Lowercased alphanumeric slug of the original name, capped at 50 chars.
fn sanitize_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let mut slug = String::new();
    let mut last_was_underscore = false;
    for c in stem.to_ascii_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            slug.push('_');
            last_was_underscore = true;
        }
    }
    let slug = slug.trim_matches('_').to_string();
    let slug = if slug.is_empty() { "file".to_string() } else { slug };
    slug.chars().take(50).collect()
}

/// Unique object key: `{folder}/{slug}_{uuid8}.{ext}`.
fn object_key(folder: &str, file_name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}.{}",
        folder,
        sanitize_file_name(file_name),
        &suffix[..8],
        extension_of(file_name)
    )
}

impl MediaStore for LocalMediaStore {
    fn put(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, PillsureError> {
        validate_image(file_name, content_type, bytes)?;

        let key = object_key(folder, file_name);
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PillsureError::Storage(format!("Failed to create media dir: {}", e)))?;
        }
        std::fs::write(&path, bytes)
            .map_err(|e| PillsureError::Storage(format!("Failed to store image: {}", e)))?;

        Ok(StoredObject {
            url: format!("{}/{}", self.base_url, key),
            key,
        })
    }

    fn delete(&self, key: &str) -> Result<(), PillsureError> {
        let Some(path) = self.path_for_key(key) else {
            return Err(PillsureError::BadRequest(format!("Invalid media key: {}", key)));
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // Already gone: deletion is idempotent.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PillsureError::Storage(format!(
                "Failed to delete image: {}",
                e
            ))),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(|key| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn exists_on_disk(root: &Path, key: &str) -> bool {
        root.join(key).is_file()
    }

    fn store() -> (LocalMediaStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = LocalMediaStore::new(dir.path(), "http://localhost:3000/media");
        (store, dir)
    }

    #[test]
    fn test_put_and_delete_round_trip() {
        let (store, dir) = store();
        let object = store
            .put("medicines", "Panadol Extra.PNG", "image/png", b"fake-png")
            .unwrap();

        assert!(object.key.starts_with("medicines/panadol_extra_"));
        assert!(object.key.ends_with(".png"));
        assert!(object.url.starts_with("http://localhost:3000/media/medicines/"));
        assert!(exists_on_disk(dir.path(), &object.key));

        store.delete(&object.key).unwrap();
        assert!(!exists_on_disk(dir.path(), &object.key));
        // Idempotent.
        store.delete(&object.key).unwrap();
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let (store, _dir) = store();
        let err = store
            .put("medicines", "notes.pdf", "application/pdf", b"%PDF")
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_rejects_svg() {
        let (store, _dir) = store();
        let err = store
            .put("medicines", "logo.svg", "image/svg+xml", b"<svg/>")
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_rejects_disallowed_extension() {
        let (store, _dir) = store();
        let err = store
            .put("medicines", "weird.bmp", "image/bmp", b"BM")
            .unwrap_err();
        assert!(err.to_string().contains(".bmp"));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let (store, _dir) = store();
        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let err = store
            .put("medicines", "big.png", "image/png", &big)
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_key_for_url() {
        let (store, _dir) = store();
        assert_eq!(
            store.key_for_url("http://localhost:3000/media/medicines/a_1.png"),
            Some("medicines/a_1.png".to_string())
        );
        assert_eq!(store.key_for_url("https://elsewhere.example/b.png"), None);
        assert_eq!(store.key_for_url("http://localhost:3000/media/"), None);
    }

    #[test]
    fn test_delete_refuses_traversal() {
        let (store, _dir) = store();
        assert!(store.delete("../outside.png").is_err());
        assert!(store.delete("a//b.png").is_err());
    }

    #[test]
    fn test_unique_keys_for_same_name() {
        let (store, _dir) = store();
        let a = store.put("m", "x.png", "image/png", b"1").unwrap();
        let b = store.put("m", "x.png", "image/png", b"2").unwrap();
        assert_ne!(a.key, b.key);
    }
}
