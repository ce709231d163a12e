use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bincode::config::standard;
use bincode::decode_from_slice;
use memmap2::Mmap;

use crate::bundle_format::{
    sha256, BundleEntry, BundleHeader, BUNDLE_MAGIC, BUNDLE_VERSION, HEADER_REGION,
    MAX_ENTRY_NAME_LEN, MAX_ENTRY_SIZE,
};
use crate::error::BundleError;

enum Storage {
    Mmap(Mmap),
    File(File),
    Memory(Vec<u8>),
}

impl Storage {
    fn read_range(&self, offset: u64, size: u64) -> Result<Cow<'_, [u8]>, BundleError> {
        match self {
            Storage::Mmap(m) => Ok(Cow::Borrowed(&m[offset as usize..(offset + size) as usize])),
            Storage::Memory(v) => Ok(Cow::Borrowed(&v[offset as usize..(offset + size) as usize])),
            Storage::File(f) => {
                let mut f = f.try_clone()?;
                let mut buf = vec![0u8; size as usize];
                f.seek(SeekFrom::Start(offset))?;
                f.read_exact(&mut buf)?;
                Ok(Cow::Owned(buf))
            }
        }
    }
}

/// An opened, validated bundle. Dropping it releases the mapping or file handle.
pub struct Bundle {
    storage: Storage,
    entries: HashMap<String, BundleEntry>,
    len: u64,
}

impl Bundle {
    /// Open a bundle file, memory mapped when possible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Err(BundleError::InvalidBundle("empty file".into()));
        }
        // SAFETY: the mapping is read-only and owned by the bundle; bundle files
        // are not expected to be truncated while loaded.
        let storage = match unsafe { Mmap::map(&file) } {
            Ok(m) => Storage::Mmap(m),
            Err(_) => Storage::File(file),
        };
        Self::from_storage(storage, len)
    }

    /// Parse a bundle already held in memory (decrypted or stream-read bytes).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, BundleError> {
        if bytes.is_empty() {
            return Err(BundleError::InvalidBundle("empty buffer".into()));
        }
        let len = bytes.len() as u64;
        Self::from_storage(Storage::Memory(bytes), len)
    }

    fn from_storage(storage: Storage, len: u64) -> Result<Self, BundleError> {
        if len < HEADER_REGION as u64 {
            return Err(BundleError::InvalidBundle("truncated header".into()));
        }

        let header: BundleHeader = {
            let header_bytes = storage.read_range(0, HEADER_REGION as u64)?;
            decode_from_slice(&header_bytes, standard())
                .map_err(|e| BundleError::InvalidBundle(format!("header decode: {}", e)))?
                .0
        };
        if header.magic != BUNDLE_MAGIC {
            return Err(BundleError::InvalidBundle("bad magic".into()));
        }
        if header.version != BUNDLE_VERSION {
            return Err(BundleError::InvalidBundle(format!(
                "unsupported version {}",
                header.version
            )));
        }
        match header.index_offset.checked_add(header.index_size) {
            Some(end) if end <= len => {}
            _ => return Err(BundleError::InvalidBundle("index OOB".into())),
        }

        let index_bytes = storage.read_range(header.index_offset, header.index_size)?;
        if header.index_hash != sha256(&index_bytes) {
            return Err(BundleError::InvalidBundle("index hash mismatch".into()));
        }
        let (entries_vec, _): (Vec<BundleEntry>, usize) = decode_from_slice(&index_bytes, standard())
            .map_err(|e| BundleError::InvalidBundle(format!("index decode: {}", e)))?;
        drop(index_bytes);

        let mut entries = HashMap::with_capacity(entries_vec.len());
        for ent in entries_vec {
            if ent.name.is_empty() || ent.name.len() > MAX_ENTRY_NAME_LEN {
                return Err(BundleError::InvalidBundle("invalid asset name length".into()));
            }
            match ent.offset.checked_add(ent.size) {
                Some(end) if end <= len => {}
                _ => return Err(BundleError::InvalidBundle(format!("asset OOB: {}", ent.name))),
            }
            entries.insert(ent.name.clone(), ent);
        }

        Ok(Bundle {
            storage,
            entries,
            len,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.get(name)
    }

    /// Entry names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read an entry's payload, zero-copy for mapped and in-memory bundles.
    /// Stored checksums are verified.
    pub fn read_entry(&self, name: &str) -> Result<Cow<'_, [u8]>, BundleError> {
        let ent = self
            .entries
            .get(name)
            .ok_or_else(|| BundleError::EntryNotFound(name.to_string()))?;
        if ent.size > MAX_ENTRY_SIZE {
            return Err(BundleError::ResourceLimit(format!("asset too large: {}", name)));
        }
        let bytes = self.storage.read_range(ent.offset, ent.size)?;
        if let Some(expected) = ent.checksum {
            if sha256(&bytes) != expected {
                return Err(BundleError::ChecksumMismatch(name.to_string()));
            }
        }
        Ok(bytes)
    }
}
