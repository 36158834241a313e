// ============================================================================
// GALLERY — key-addressed persistent store for produced mockup images
// ============================================================================
//
// The compositor never reads or writes this store; the app shell persists
// composites and generated bases into it and can feed a stored image back in
// as a new montage base.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Magic header for the gallery file format.
const GALLERY_MAGIC: &str = "MFG1";

/// One stored image: PNG bytes plus the metadata the gallery UI shows.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: String,
    pub png: Vec<u8>,
    /// Human-readable origin ("Manual montage", prompt excerpt, ...).
    pub label: String,
    pub created_at_ms: u64,
}

impl StoredImage {
    pub fn new(png: Vec<u8>, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            png,
            label: label.into(),
            created_at_ms: now_ms(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GalleryFile {
    magic: String,
    images: Vec<StoredImage>,
}

/// Persistent gallery, kept sorted newest-first. Every mutation saves
/// eagerly; a missing or corrupt file on load just starts empty.
pub struct Gallery {
    path: PathBuf,
    images: Vec<StoredImage>,
}

impl Gallery {
    /// Default on-disk location: `<data_dir>/MontageFE/gallery.bin`.
    pub fn open_default() -> Self {
        Self::open(crate::io::data_dir().join("MontageFE").join("gallery.bin"))
    }

    /// Open (or create) a gallery backed by the given file.
    pub fn open(path: PathBuf) -> Self {
        let images = match Self::load_file(&path) {
            Ok(images) => images,
            Err(e) => {
                if path.exists() {
                    log_warn!("Gallery file {:?} unreadable ({}), starting empty", path, e);
                }
                Vec::new()
            }
        };
        let mut gallery = Self { path, images };
        gallery.sort();
        gallery
    }

    fn load_file(path: &Path) -> Result<Vec<StoredImage>, String> {
        let bytes = fs::read(path).map_err(|e| e.to_string())?;
        let file: GalleryFile = bincode::deserialize(&bytes).map_err(|e| e.to_string())?;
        if file.magic != GALLERY_MAGIC {
            return Err(format!("bad magic '{}'", file.magic));
        }
        Ok(file.images)
    }

    fn sort(&mut self) {
        // Newest first; id as tie-breaker keeps the order deterministic.
        self.images
            .sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then(a.id.cmp(&b.id)));
    }

    /// Insert or replace by id, then persist.
    pub fn insert(&mut self, image: StoredImage) -> Result<(), String> {
        self.images.retain(|img| img.id != image.id);
        self.images.push(image);
        self.sort();
        self.save()
    }

    /// Delete by id, then persist. Unknown ids are a no-op.
    pub fn delete(&mut self, id: &str) -> Result<(), String> {
        let before = self.images.len();
        self.images.retain(|img| img.id != id);
        if self.images.len() == before {
            return Ok(());
        }
        self.save()
    }

    /// Remove every stored image, then persist.
    pub fn clear(&mut self) -> Result<(), String> {
        if self.images.is_empty() {
            return Ok(());
        }
        self.images.clear();
        self.save()
    }

    /// All stored images, newest first.
    pub fn list(&self) -> &[StoredImage] {
        &self.images
    }

    pub fn get(&self, id: &str) -> Option<&StoredImage> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn save(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let file = GalleryFile {
            magic: GALLERY_MAGIC.to_string(),
            images: self.images.clone(),
        };
        let bytes = bincode::serialize(&file).map_err(|e| e.to_string())?;
        fs::write(&self.path, bytes).map_err(|e| e.to_string())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
