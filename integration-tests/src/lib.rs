//! Shared fixtures for the cross-module tests in `tests/`.

use asset_registry::bundle_format::{write_bundle, EntrySource};
use asset_registry::{
    BundleService, DecryptService, ManifestBundleService, OffsetDecrypt, ResourceServices,
    ServiceError,
};
use std::path::Path;
use std::sync::Arc;

/// Writes `shared.bundle`, `ui.bundle` and a `manifest.json` into `dir`.
/// `ui/icon` depends on `shared/palette`. Every bundle file gets `junk`
/// leading bytes for use with [`OffsetDecrypt`].
pub fn write_ui_bundles(dir: &Path, junk: usize) -> std::io::Result<()> {
    let shared = write_bundle(&[EntrySource::new("Palette", "bytes", b"rgb")])
        .map_err(std::io::Error::other)?;
    let ui = write_bundle(&[
        EntrySource::new("Icon", "text", b"icon"),
        EntrySource::new("Frame", "text", b"frame"),
    ])
    .map_err(std::io::Error::other)?;
    for (file, bytes) in [("shared.bundle", shared), ("ui.bundle", ui)] {
        let mut out = vec![0u8; junk];
        out.extend(bytes);
        std::fs::write(dir.join(file), out)?;
    }
    std::fs::write(
        dir.join("manifest.json"),
        r#"{ "bundles": {
            "ui/icon": { "file": "ui.bundle", "dependencies": ["shared/palette"] },
            "ui/frame": { "file": "ui.bundle" },
            "shared/palette": { "file": "shared.bundle" }
        } }"#,
    )
}

/// Services over the manifest written by [`write_ui_bundles`].
pub fn bundle_services(
    dir: &Path,
    decrypt_offset: Option<usize>,
) -> Result<ResourceServices, ServiceError> {
    let bundles = ManifestBundleService::from_json_file(dir, dir.join("manifest.json"))?;
    Ok(ResourceServices {
        bundles: Some(Arc::new(bundles) as Arc<dyn BundleService>),
        decrypt: decrypt_offset.map(|o| Arc::new(OffsetDecrypt::new(o)) as Arc<dyn DecryptService>),
    })
}
