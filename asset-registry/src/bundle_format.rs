use bincode::config::standard;
use bincode::{encode_to_vec, Decode, Encode};
use sha2::{Digest, Sha256};

use crate::error::BundleError;

pub const BUNDLE_MAGIC: u32 = 0x4C44_4E42; // 'BNDL'
pub const BUNDLE_VERSION: u16 = 1;

/// Bytes reserved at the start of every bundle for the (zero padded) header.
pub const HEADER_REGION: usize = 256;

// safety caps
pub const MAX_ENTRY_NAME_LEN: usize = 255;
pub const MAX_ENTRY_SIZE: u64 = 1 << 31;

#[derive(Encode, Decode, Debug, Clone)]
pub struct BundleHeader {
    pub magic: u32,
    pub version: u16,
    pub flags: u16,
    pub index_offset: u64,
    pub index_size: u64,
    pub index_hash: [u8; 32],
}

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    /// Tag matched against the requested asset type.
    pub type_name: String,
    pub offset: u64,
    pub size: u64,
    pub flags: u16,
    pub checksum: Option<[u8; 32]>,
}

impl BundleHeader {
    pub fn new(index_offset: u64, index_bytes: &[u8], flags: u16) -> Self {
        BundleHeader {
            magic: BUNDLE_MAGIC,
            version: BUNDLE_VERSION,
            flags,
            index_offset,
            index_size: index_bytes.len() as u64,
            index_hash: sha256(index_bytes),
        }
    }
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut h = [0u8; 32];
    h.copy_from_slice(&out);
    h
}

/// One asset to be written by [`write_bundle`].
#[derive(Debug, Clone, Copy)]
pub struct EntrySource<'a> {
    pub name: &'a str,
    pub type_name: &'a str,
    pub data: &'a [u8],
}

impl<'a> EntrySource<'a> {
    pub fn new(name: &'a str, type_name: &'a str, data: &'a [u8]) -> Self {
        EntrySource {
            name,
            type_name,
            data,
        }
    }
}

/// Serialize a complete bundle in memory: header region, payloads, index.
pub fn write_bundle(entries: &[EntrySource<'_>]) -> Result<Vec<u8>, BundleError> {
    let mut out = vec![0u8; HEADER_REGION];
    let mut index = Vec::with_capacity(entries.len());
    for src in entries {
        if src.name.is_empty() || src.name.len() > MAX_ENTRY_NAME_LEN {
            return Err(BundleError::InvalidBundle(format!(
                "invalid entry name length: {:?}",
                src.name
            )));
        }
        if index.iter().any(|e: &BundleEntry| e.name == src.name) {
            return Err(BundleError::InvalidBundle(format!("duplicate entry: {}", src.name)));
        }
        let offset = out.len() as u64;
        out.extend_from_slice(src.data);
        index.push(BundleEntry {
            name: src.name.to_string(),
            type_name: src.type_name.to_string(),
            offset,
            size: src.data.len() as u64,
            flags: 0,
            checksum: Some(sha256(src.data)),
        });
    }

    let index_bytes = encode_to_vec(&index, standard())
        .map_err(|e| BundleError::InvalidBundle(format!("index encode: {}", e)))?;
    let index_offset = out.len() as u64;
    out.extend_from_slice(&index_bytes);

    let header = BundleHeader::new(index_offset, &index_bytes, 0);
    let header_bytes = encode_to_vec(&header, standard())
        .map_err(|e| BundleError::InvalidBundle(format!("header encode: {}", e)))?;
    if header_bytes.len() > HEADER_REGION {
        return Err(BundleError::InvalidBundle("header too large for reserved region".into()));
    }
    out[..header_bytes.len()].copy_from_slice(&header_bytes);
    Ok(out)
}
