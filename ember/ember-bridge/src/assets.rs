//! Asset cache: load-once semantics keyed by the hashed path, with garbage
//! collection of unreferenced entries.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use render_api::Result;

use crate::Files;

/// Anything that can be loaded from a file into the cache.
pub trait Asset: Any + Send + Sync + Sized {
    fn load(files: &Files, path: &str) -> Result<Self>;
}

/// Assets manager, responsible for loading & tracking game assets.
#[derive(Default)]
pub struct Assets {
    assets: HashMap<u64, Arc<dyn Any + Send + Sync>>,
}

fn asset_id(path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an asset from a file, or return it if already loaded.
    pub fn load<T: Asset>(&mut self, files: &Files, path: &str) -> Result<Arc<T>> {
        let id = asset_id(path);
        if let Some(asset) = self.get::<T>(id) {
            return Ok(asset);
        }
        let asset = Arc::new(T::load(files, path)?);
        self.assets.insert(id, asset.clone());
        Ok(asset)
    }

    /// An already loaded asset, or None.
    pub fn get<T: Asset>(&self, id: u64) -> Option<Arc<T>> {
        self.assets
            .get(&id)
            .and_then(|a| a.clone().downcast::<T>().ok())
    }

    pub fn id_of(path: &str) -> u64 {
        asset_id(path)
    }

    /// Unload assets nothing references anymore. Run when switching scenes.
    pub fn collect_garbage(&mut self) {
        self.assets.retain(|_, asset| Arc::strong_count(asset) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blob(Vec<u8>);

    impl Asset for Blob {
        fn load(_files: &Files, path: &str) -> Result<Self> {
            Ok(Blob(path.as_bytes().to_vec()))
        }
    }

    #[test]
    fn load_is_cached_by_path() {
        let files = Files::new();
        let mut assets = Assets::new();
        let a = assets.load::<Blob>(&files, "a.bin").unwrap();
        let b = assets.load::<Blob>(&files, "a.bin").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.0, b"a.bin");
    }

    #[test]
    fn garbage_collection_drops_unreferenced_entries() {
        let files = Files::new();
        let mut assets = Assets::new();
        {
            let _a = assets.load::<Blob>(&files, "temp.bin").unwrap();
        }
        let keep = assets.load::<Blob>(&files, "keep.bin").unwrap();
        assets.collect_garbage();
        assert!(assets.get::<Blob>(Assets::id_of("temp.bin")).is_none());
        assert!(assets.get::<Blob>(Assets::id_of("keep.bin")).is_some());
        drop(keep);
    }
}
