use asset_registry::bundle_format::{write_bundle, EntrySource, HEADER_REGION};
use asset_registry::{Bundle, BundleError};
use tempfile::tempdir;

#[test]
fn written_bundle_reopens_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mixed.bundle");
    let bytes = write_bundle(&[
        EntrySource::new("b_second", "bytes", &[1, 2, 3]),
        EntrySource::new("a_first", "text", b"first"),
        EntrySource::new("empty", "bytes", &[]),
    ])
    .unwrap();
    assert!(bytes.len() > HEADER_REGION);
    std::fs::write(&path, &bytes).unwrap();

    let bundle = Bundle::open(&path).unwrap();
    assert_eq!(bundle.names(), vec!["a_first", "b_second", "empty"]);
    assert_eq!(bundle.len(), bytes.len() as u64);
    assert_eq!(bundle.entry("a_first").unwrap().type_name, "text");
    assert_eq!(&*bundle.read_entry("b_second").unwrap(), &[1, 2, 3]);
    assert!(bundle.read_entry("empty").unwrap().is_empty());
    assert!(matches!(
        bundle.read_entry("missing"),
        Err(BundleError::EntryNotFound(_))
    ));
}

#[test]
fn writer_rejects_bad_names() {
    let long = "n".repeat(300);
    assert!(write_bundle(&[EntrySource::new("", "bytes", b"x")]).is_err());
    assert!(write_bundle(&[EntrySource::new(&long, "bytes", b"x")]).is_err());
    assert!(write_bundle(&[
        EntrySource::new("dup", "bytes", b"x"),
        EntrySource::new("dup", "bytes", b"y"),
    ])
    .is_err());
}

#[test]
fn truncated_index_is_rejected() {
    let bytes = write_bundle(&[EntrySource::new("a", "bytes", b"payload")]).unwrap();
    let cut = bytes[..bytes.len() - 1].to_vec();
    assert!(matches!(
        Bundle::from_bytes(cut),
        Err(BundleError::InvalidBundle(_))
    ));
}
