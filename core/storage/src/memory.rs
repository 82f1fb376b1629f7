//! In-memory Drive for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use showcase_common::{ConfigError, ProviderError};

use crate::provider::{ClientFactory, DriveApi, DriveFile, NewFile, ProviderResult};

/// A file held by [`MemoryDrive`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub data: Bytes,
}

#[derive(Default)]
struct State {
    files: RwLock<HashMap<String, StoredFile>>,
    failures: Mutex<VecDeque<ProviderError>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    omit_links: AtomicBool,
}

/// In-memory stand-in for Google Drive.
///
/// Clones share the same state, so a test can keep one handle for
/// assertions while the storage layer uses another. It also acts as its own
/// [`ClientFactory`].
#[derive(Clone, Default)]
pub struct MemoryDrive {
    state: Arc<State>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next provider call fail with `error`. Queued errors are
    /// consumed in order.
    pub fn fail_next(&self, error: ProviderError) {
        self.failures().push_back(error);
    }

    /// Answer uploads without view/download links.
    pub fn set_omit_links(&self, omit: bool) {
        self.state.omit_links.store(omit, Ordering::SeqCst);
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.files_read().contains_key(file_id)
    }

    pub fn file(&self, file_id: &str) -> Option<StoredFile> {
        self.files_read().get(file_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.files_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `create_file` calls, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_file` calls, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }

    fn failures(&self) -> MutexGuard<'_, VecDeque<ProviderError>> {
        self.state
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn files_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StoredFile>> {
        self.state
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn files_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StoredFile>> {
        self.state
            .files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(&self) -> ProviderResult<()> {
        match self.failures().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn to_drive_file(&self, id: &str, file: &StoredFile) -> DriveFile {
        let omit = self.state.omit_links.load(Ordering::SeqCst);
        DriveFile {
            id: id.to_string(),
            name: file.name.clone(),
            web_view_link: (!omit)
                .then(|| format!("https://drive.google.com/file/d/{}/view?usp=drivesdk", id)),
            web_content_link: (!omit)
                .then(|| format!("https://drive.google.com/uc?id={}&export=download", id)),
        }
    }
}

#[async_trait]
impl DriveApi for MemoryDrive {
    async fn create_file(&self, file: &NewFile, payload: Bytes) -> ProviderResult<DriveFile> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let id = Uuid::new_v4().simple().to_string();
        let stored = StoredFile {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            parents: file.parents.clone(),
            data: payload,
        };

        let created = self.to_drive_file(&id, &stored);
        self.files_write().insert(id, stored);

        Ok(created)
    }

    async fn delete_file(&self, file_id: &str) -> ProviderResult<()> {
        self.state.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        match self.files_write().remove(file_id) {
            Some(_) => Ok(()),
            None => Err(ProviderError::NotFound(format!("File not found: {}", file_id))),
        }
    }

    async fn list_files(&self, page_size: u32) -> ProviderResult<Vec<DriveFile>> {
        self.take_failure()?;

        let files = self.files_read();
        Ok(files
            .iter()
            .take(page_size as usize)
            .map(|(id, file)| self.to_drive_file(id, file))
            .collect())
    }
}

impl ClientFactory for MemoryDrive {
    type Client = MemoryDrive;

    fn get_client(&self) -> Result<MemoryDrive, ConfigError> {
        Ok(self.clone())
    }
}
