use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::location::ResolvedKey;

/// A payload type that can be produced from a loaded resource's bytes.
///
/// `TYPE_NAME` doubles as the tag stored next to bundle entries; `accepts`
/// decides which tags satisfy a request for this type.
pub trait Asset: Sized + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn decode(bytes: &[u8]) -> Result<Self, String>;

    fn accepts(type_name: &str) -> bool {
        type_name == Self::TYPE_NAME
    }
}

/// Undecoded bytes; satisfies requests for any entry tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl Asset for RawBytes {
    const TYPE_NAME: &'static str = "bytes";

    fn decode(bytes: &[u8]) -> Result<Self, String> {
        Ok(RawBytes(bytes.to_vec()))
    }

    fn accepts(_type_name: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAsset {
    pub text: String,
}

impl Asset for TextAsset {
    const TYPE_NAME: &'static str = "text";

    fn decode(bytes: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
        Ok(TextAsset {
            text: text.to_string(),
        })
    }
}

pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Type-erased decoder captured from the first requester of a key.
#[derive(Clone, Copy)]
pub(crate) struct PayloadDecoder {
    type_id: TypeId,
    type_name: &'static str,
    accepts: fn(&str) -> bool,
    decode: fn(&[u8]) -> Result<Payload, String>,
}

fn decode_erased<T: Asset>(bytes: &[u8]) -> Result<Payload, String> {
    T::decode(bytes).map(|asset| Arc::new(asset) as Payload)
}

impl PayloadDecoder {
    pub(crate) fn of<T: Asset>() -> Self {
        PayloadDecoder {
            type_id: TypeId::of::<T>(),
            type_name: T::TYPE_NAME,
            accepts: <T as Asset>::accepts,
            decode: decode_erased::<T>,
        }
    }

    pub(crate) fn is<T: Asset>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn accepts(&self, tag: &str) -> bool {
        (self.accepts)(tag)
    }

    pub(crate) fn decode(&self, bytes: &[u8]) -> Result<Payload, String> {
        (self.decode)(bytes)
    }
}

/// Shared reference to a loaded asset.
///
/// The registry counts one reference per successful load call; clones of an
/// `AssetRef` share that single reference and are not counted again.
pub struct AssetRef<T> {
    key: ResolvedKey,
    asset: Arc<T>,
}

impl<T> AssetRef<T> {
    pub(crate) fn new(key: ResolvedKey, asset: Arc<T>) -> Self {
        AssetRef { key, asset }
    }

    pub fn key(&self) -> &ResolvedKey {
        &self.key
    }

    pub fn shared(&self) -> &Arc<T> {
        &self.asset
    }
}

impl<T> Clone for AssetRef<T> {
    fn clone(&self) -> Self {
        AssetRef {
            key: self.key.clone(),
            asset: self.asset.clone(),
        }
    }
}

impl<T> Deref for AssetRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.asset
    }
}

impl<T: fmt::Debug> fmt::Debug for AssetRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRef")
            .field("key", &self.key)
            .field("asset", &self.asset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erased_decoder_round_trips_through_any() {
        let decoder = PayloadDecoder::of::<TextAsset>();
        assert!(decoder.is::<TextAsset>());
        assert!(!decoder.is::<RawBytes>());
        assert!(decoder.accepts("text"));
        assert!(!decoder.accepts("bytes"));

        let payload = decoder.decode(b"hi").unwrap();
        let text = payload.downcast::<TextAsset>().unwrap();
        assert_eq!(text.text, "hi");
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        assert!(TextAsset::decode(&[0xff, 0xfe]).is_err());
        assert!(RawBytes::accepts("anything"));
    }
}
