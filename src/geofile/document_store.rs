use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use anyhow::{anyhow, Context};

use crate::crs::crs_utils::crs_name;

use super::{
    collection::AttractionCollection,
    geojson::{parse_collection, write_collection_to_string},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Could not encode the attraction collection: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Could not write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable home of exactly one attractions document.
///
/// Every operation works on the whole document: `load` reads and decodes all of it, `save`
/// overwrites all of it.
pub trait DocumentStore: Send + Sync {
    /// Human readable location of the document, for logging.
    fn location(&self) -> String;

    fn exists(&self) -> bool;

    /// Raw document contents.
    fn read_document(&self) -> anyhow::Result<String>;

    /// Replace the raw document contents.
    fn write_document(&self, contents: &str) -> Result<(), StoreError>;

    /// Load the collection. A missing or unparseable document degrades to an empty default
    /// collection so reads stay available.
    fn load(&self) -> AttractionCollection {
        if !self.exists() {
            log::warn!(
                "No GeoJSON document at {}, using an empty collection",
                self.location()
            );
            return AttractionCollection::default();
        }
        match self
            .read_document()
            .and_then(|contents| parse_collection(&contents))
        {
            Ok(collection) => {
                log::debug!(
                    "Loaded {} features from {} (CRS {})",
                    collection.features.len(),
                    self.location(),
                    collection
                        .crs
                        .as_ref()
                        .and_then(crs_name)
                        .unwrap_or("unspecified")
                );
                collection
            }
            Err(err) => {
                log::error!(
                    "Error reading GeoJSON document at {}, using an empty collection: {:?}",
                    self.location(),
                    err
                );
                AttractionCollection::default()
            }
        }
    }

    /// Serialize and overwrite the document. An error means the change is not durable.
    fn save(&self, collection: &AttractionCollection) -> Result<(), StoreError> {
        let contents = write_collection_to_string(collection)?;
        self.write_document(&contents).map_err(|err| {
            log::error!("Error writing GeoJSON document: {}", err);
            err
        })?;
        log::debug!(
            "Saved {} features to {}",
            collection.features.len(),
            self.location()
        );
        Ok(())
    }
}

/// Document stored as a GeoJSON file.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the document, so a failed write
/// leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temporary_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .unwrap_or_else(|| OsStr::new("attractions.geojson"))
            .to_os_string();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

impl DocumentStore for FileDocumentStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_document(&self) -> anyhow::Result<String> {
        fs::read_to_string(&self.path).with_context(|| format!("Reading {:?}", self.path))
    }

    fn write_document(&self, contents: &str) -> Result<(), StoreError> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }
        let temporary_path = self.temporary_path();
        fs::write(&temporary_path, contents).map_err(io_error)?;
        fs::rename(&temporary_path, &self.path).map_err(|source| {
            // Best effort, the rename error is the one worth reporting.
            let _ = fs::remove_file(&temporary_path);
            io_error(source)
        })
    }
}

/// Document held in memory. Decodes and encodes through the same codec as the file store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    document: Mutex<Option<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(contents.into())),
        }
    }

    /// Snapshot of another store's raw document. An absent or unreadable document leaves this
    /// store empty.
    pub fn copy_of(store: &impl DocumentStore) -> Self {
        if !store.exists() {
            return Self::new();
        }
        match store.read_document() {
            Ok(contents) => Self::with_contents(contents),
            Err(err) => {
                log::warn!("Could not copy {}: {:?}", store.location(), err);
                Self::new()
            }
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn exists(&self) -> bool {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn read_document(&self) -> anyhow::Result<String> {
        self.contents()
            .ok_or_else(|| anyhow!("No document held in memory"))
    }

    fn write_document(&self, contents: &str) -> Result<(), StoreError> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_string());
        Ok(())
    }
}

/// Make sure the store holds a document, creating an empty default collection if it does not.
pub fn bootstrap(store: &impl DocumentStore) -> Result<(), StoreError> {
    if store.exists() {
        log::info!("GeoJSON document found at {}", store.location());
        return Ok(());
    }
    log::info!(
        "GeoJSON document not found at {}. Creating initial document",
        store.location()
    );
    store.save(&AttractionCollection::default())?;
    log::info!("Initial GeoJSON document created");
    Ok(())
}
