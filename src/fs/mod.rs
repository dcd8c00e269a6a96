pub mod catalog;
pub mod config;
pub mod error;

use chrono::Local;
use log::{info, warn};

use crate::disk::BlockStore;
use crate::fs::catalog::{Catalog, FileEntry};
use crate::fs::error::{Result, SimError};

/// The simulated filesystem: the block arena plus the flat file catalog.
///
/// Mutating operations are admin-gated, mirroring the single
/// admin/non-admin privilege flag of the simulation. The request
/// coordinator elevates this flag around deferred dispatch.
#[derive(Debug)]
pub struct FileSystem {
    store: BlockStore,
    catalog: Catalog,
    admin_mode: bool,
    user: String,
}

impl FileSystem {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            store: BlockStore::new(total_blocks),
            catalog: Catalog::new(),
            admin_mode: true,
            user: whoami::username(),
        }
    }

    /// Creates a file and allocates its chain. All-or-nothing: on any error
    /// neither the disk nor the catalog has changed.
    pub fn create_file(&mut self, name: &str, size_blocks: usize) -> Result<usize> {
        self.require_admin("create file")?;
        if self.catalog.find(name).is_some() {
            return Err(SimError::AlreadyExists(name.to_string()));
        }
        if !self.store.has_space(size_blocks) {
            return Err(SimError::OutOfSpace);
        }

        let head = self.store.allocate(name, size_blocks)?;
        let mut entry = FileEntry::new(name, size_blocks, &self.user);
        entry.head = Some(head);
        self.catalog.insert(entry);

        info!("created '{}' ({} blocks, head {})", name, size_blocks, head);
        Ok(head)
    }

    /// Deletes a file, freeing its chain. Returns the number of blocks
    /// released.
    pub fn delete_file(&mut self, name: &str) -> Result<usize> {
        self.require_admin("delete file")?;
        let entry = self
            .catalog
            .remove(name)
            .ok_or_else(|| SimError::NotFound(name.to_string()))?;

        let freed = match entry.head {
            Some(head) => self.store.free_chain(head),
            None => 0,
        };
        info!("deleted '{}', {} block(s) freed", name, freed);
        Ok(freed)
    }

    /// Renames a file, propagating the new name to every block of its chain.
    pub fn rename_file(&mut self, old: &str, new: &str) -> Result<()> {
        self.require_admin("rename file")?;
        if self.catalog.find(new).is_some() {
            return Err(SimError::AlreadyExists(new.to_string()));
        }
        let entry = self
            .catalog
            .find_mut(old)
            .ok_or_else(|| SimError::NotFound(old.to_string()))?;

        let head = entry.head;
        entry.name = new.to_string();
        entry.modified_at = Local::now();
        if let Some(head) = head {
            self.store.rename_chain(head, new);
        }
        info!("renamed '{}' -> '{}'", old, new);
        Ok(())
    }

    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.catalog.find(name)
    }

    pub fn files(&self) -> &[FileEntry] {
        self.catalog.entries()
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn is_admin(&self) -> bool {
        self.admin_mode
    }

    pub fn set_admin(&mut self, admin: bool) {
        self.admin_mode = admin;
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Clears the disk and the catalog for a fresh simulation run.
    pub fn reset(&mut self) {
        self.store.reset();
        self.catalog.clear();
        warn!("filesystem reset, all blocks freed");
    }

    fn require_admin(&self, op: &str) -> Result<()> {
        if self.admin_mode {
            Ok(())
        } else {
            Err(SimError::PermissionDenied(op.to_string()))
        }
    }

    // Persistence-load support: raw access for rebuilding state.
    pub(crate) fn store_mut(&mut self) -> &mut BlockStore {
        &mut self.store
    }

    pub(crate) fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }
}
