//! Database file I/O operations.
//!
//! This module handles reading pages from the database file on behalf of the
//! block cache, and writing out a freshly built tree.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
#[cfg(not(unix))]
use std::io::{Seek, SeekFrom};
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(not(unix))]
use std::sync::Mutex;

use crate::storage::buffer_pool::BufferPool;
use crate::storage::io::{PageStore, StorageError};
use crate::storage::page::{PAGE_SIZE, PAGE_SIZE_U64, Page, PageId};
use crate::storage::superblock::Superblock;

/// A read-only database file handle.
pub struct FileStore {
    #[cfg(unix)]
    file: File,
    #[cfg(not(unix))]
    file: Mutex<File>,
    superblock: Superblock,
    path: PathBuf,
}

impl FileStore {
    /// Write `pages` into a new database file at `path`.
    ///
    /// Page 0 must be a superblock. Returns an error if the file already exists.
    pub fn create(path: &Path, pages: &[(PageId, Page)]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;

        let mut ordered: Vec<&(PageId, Page)> = pages.iter().collect();
        ordered.sort_by_key(|(page_id, _)| *page_id);

        let mut next_page: PageId = 0;
        for (page_id, page) in ordered {
            // Gaps are zero-filled so every page lives at `id * PAGE_SIZE`.
            while next_page < *page_id {
                file.write_all(&[0u8; PAGE_SIZE])?;
                next_page += 1;
            }
            file.write_all(page.as_bytes())?;
            next_page = page_id + 1;
        }

        file.sync_all()?;
        tracing::debug!(path = %path.display(), pages = next_page, "created database file");
        Ok(())
    }

    /// Open an existing database file and validate its superblock.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut file = OpenOptions::new().read(true).open(path)?;

        let mut page = Page::new();
        file.read_exact(page.as_bytes_mut())?;
        let superblock = Superblock::from_page(&page)?;

        let file_pages = file.metadata()?.len() / PAGE_SIZE_U64;
        if file_pages < superblock.total_page_count {
            return Err(StorageError::PageOutOfBounds {
                page_id: superblock.total_page_count - 1,
                total_pages: file_pages,
            });
        }

        tracing::info!(
            path = %path.display(),
            root_page = superblock.root_page,
            total_pages = superblock.total_page_count,
            "opened database file"
        );

        Ok(Self {
            #[cfg(unix)]
            file,
            #[cfg(not(unix))]
            file: Mutex::new(file),
            superblock,
            path: path.to_path_buf(),
        })
    }

    /// Get a reference to the superblock read at open time.
    #[must_use]
    pub const fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Path the store was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a page using pread (position-independent).
    #[cfg(unix)]
    fn read_into(&self, page: &mut Page, offset: u64) -> Result<(), StorageError> {
        self.file.read_exact_at(page.as_bytes_mut(), offset)?;
        Ok(())
    }

    #[cfg(not(unix))]
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    fn read_into(&self, page: &mut Page, offset: u64) -> Result<(), StorageError> {
        let mut file = self.file.lock().expect("lock poisoned");
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(page.as_bytes_mut())?;
        Ok(())
    }
}

impl PageStore for FileStore {
    fn read_page(&self, page_id: PageId, pool: &Arc<BufferPool>) -> Result<Page, StorageError> {
        if page_id >= self.superblock.total_page_count {
            return Err(StorageError::PageOutOfBounds {
                page_id,
                total_pages: self.superblock.total_page_count,
            });
        }

        let mut page = pool.lease().ok_or(StorageError::BufferPoolExhausted)?;
        self.read_into(&mut page, page_id * PAGE_SIZE_U64)?;
        Ok(page)
    }

    fn total_pages(&self) -> u64 {
        self.superblock.total_page_count
    }
}
