// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metastore implementation.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use assemblage_core::{
    AssemblyDescriptor, AssemblyId, AssemblyRequest, AssemblyResult, ClientId, ClientKind,
    ClientName, ClientRecord, Metastore, StoreError,
};
use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::state::MetaState;

/// Metastore over a JSON file, or purely in memory.
///
/// Several processes may share one file: every operation reloads it under
/// an advisory lock on a sibling `.lock` file, shared for reads and
/// exclusive for writes.
#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
    state: Mutex<MetaState>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self { path: None, state: Mutex::new(MetaState::default()) }
    }

    /// Create a new, empty database file. Fails if one already exists.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.display().to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self { path: Some(path), state: Mutex::new(MetaState::default()) };
        store.mutate(|_| Ok(()))?;
        info!(path = %store.display_path(), "database created");
        Ok(store)
    }

    /// Open an existing database file, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock = lock_file(&path)?;
        lock.lock_shared()?;
        let state = load(&path)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { path: Some(path), state: Mutex::new(state) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn display_path(&self) -> String {
        self.path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<memory>".into())
    }

    /// Snapshot of the contents as of the last operation.
    pub fn snapshot(&self) -> MetaState {
        self.state.lock().clone()
    }

    /// Write `state` to a sibling temp file and rename it into place.
    fn save(&self, state: &MetaState) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(state)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Run `f` against the on-disk state with the file lock held.
    fn locked<T>(
        &self,
        exclusive: bool,
        f: impl FnOnce(&mut MetaState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock();
        let _lock = match &self.path {
            Some(path) => {
                let lock = lock_file(path)?;
                if exclusive {
                    lock.lock_exclusive()?;
                } else {
                    lock.lock_shared()?;
                }
                *state = load(path)?;
                Some(lock)
            }
            None => None,
        };
        f(&mut state)
    }

    fn read<T>(&self, f: impl FnOnce(&MetaState) -> T) -> Result<T, StoreError> {
        self.locked(false, |state| Ok(f(state)))
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut MetaState) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.locked(true, |state| {
            let mut next = state.clone();
            let value = f(&mut next)?;
            self.save(&next)?;
            *state = next;
            Ok(value)
        })
    }
}

/// Lock file guarding `path`; the lock is released when it is dropped.
fn lock_file(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).truncate(false).write(true).open(path.with_extension("json.lock"))?;
    Ok(file)
}

/// Contents of `path`, empty if it does not exist yet.
fn load(path: &Path) -> Result<MetaState, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MetaState::default()),
        Err(e) => Err(e.into()),
    }
}

impl Metastore for Store {
    fn create_client(
        &self,
        name: &ClientName,
        kind: ClientKind,
        tags: &[String],
    ) -> Result<ClientId, StoreError> {
        let id = self.mutate(|state| state.create_client(name, kind, tags))?;
        info!(client = %name, %kind, %id, "client created");
        Ok(id)
    }

    fn find_client(&self, name: &str) -> Result<Option<ClientRecord>, StoreError> {
        self.read(|state| state.find_client(name).cloned())
    }

    fn create_assembly(&self, request: AssemblyRequest) -> Result<AssemblyDescriptor, StoreError> {
        let descriptor = self.mutate(|state| Ok(state.create_assembly(request)))?;
        debug!(assembly = %descriptor.id, repository = %descriptor.repository, "assembly created");
        Ok(descriptor)
    }

    fn record_assembly_result(
        &self,
        client: ClientId,
        result: &AssemblyResult,
    ) -> Result<(), StoreError> {
        self.mutate(|state| state.record_assembly_result(client, result))
    }

    fn assembly(&self, id: AssemblyId) -> Result<Option<AssemblyDescriptor>, StoreError> {
        self.read(|state| state.assembly(id).map(|a| a.descriptor.clone()))
    }

    fn assembly_result(&self, id: AssemblyId) -> Result<Option<AssemblyResult>, StoreError> {
        self.read(|state| state.assembly(id).and_then(|a| a.result.clone()))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
