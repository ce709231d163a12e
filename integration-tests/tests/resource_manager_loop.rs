use asset_registry::{
    LoadStatus, LoaderState, ResourceConfig, ResourceManager, ResourceServices, ServiceError,
    TextAsset,
};
use integration_tests::{bundle_services, write_ui_bundles};
use tempfile::tempdir;

/// Contract: on_update advances every pending load by one unit per tick and the
/// auto-release sweep only reclaims loaders nobody references.
#[test]
fn tick_loop_loads_then_auto_releases() {
    let dir = tempdir().unwrap();
    write_ui_bundles(dir.path(), 0).unwrap();
    let config = ResourceConfig {
        auto_release_interval_secs: 1.0,
        ..Default::default()
    };
    let mut mgr = ResourceManager::on_create(config, bundle_services(dir.path(), None).unwrap());

    let icon = mgr.load_async::<TextAsset>("UI/Icon", None).unwrap();
    let frame = mgr.load_async::<TextAsset>("UI/Frame", None).unwrap();
    assert_eq!(mgr.registry().in_flight_count(), 2);

    let mut ticks = 0;
    while mgr.registry().in_flight_count() > 0 {
        mgr.on_update(0.1);
        ticks += 1;
        assert!(ticks < 100);
    }
    // icon: open palette, read palette, read ui bundle
    assert_eq!(ticks, 3);
    assert_eq!(mgr.check(&icon).ready().unwrap().text, "icon");
    assert_eq!(mgr.check(&frame).ready().unwrap().text, "frame");

    mgr.release_ref(frame.key());
    for _ in 0..10 {
        mgr.on_update(0.1);
    }
    assert_eq!(mgr.registry().loader_count(), 1);
    assert_eq!(mgr.registry().state(icon.key()), Some(LoaderState::Succeeded));
    assert!(matches!(mgr.check(&frame), LoadStatus::Evicted));
    assert_eq!(
        mgr.on_diagnostics_draw(),
        "mode: bundle | loaders: 1 | in flight: 0 | failed: 0"
    );
}

#[test]
fn broken_manifest_is_reported_by_the_fixture() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("manifest.json"), "{ not json").unwrap();
    assert!(matches!(
        bundle_services(dir.path(), None),
        Err(ServiceError::Manifest(_))
    ));
    assert!(matches!(
        bundle_services(&dir.path().join("missing"), None),
        Err(ServiceError::Io(_))
    ));
}

#[test]
fn disabled_timer_requires_manual_release() {
    let dir = tempdir().unwrap();
    write_ui_bundles(dir.path(), 0).unwrap();
    let mut mgr =
        ResourceManager::on_create(ResourceConfig::default(), bundle_services(dir.path(), None).unwrap());

    let frame = mgr.load::<TextAsset>("UI/Frame").unwrap();
    mgr.release_ref(frame.key());
    for _ in 0..100 {
        mgr.on_update(10.0);
    }
    assert_eq!(mgr.registry().loader_count(), 1);
    assert_eq!(mgr.release(), 1);
}

#[test]
fn encrypted_bundles_load_through_manager() {
    let dir = tempdir().unwrap();
    write_ui_bundles(dir.path(), 32).unwrap();
    let mut mgr = ResourceManager::on_create(
        ResourceConfig::default(),
        bundle_services(dir.path(), Some(32)).unwrap(),
    );

    let frame = mgr.load_sync::<TextAsset>("UI\\Frame", None).unwrap();
    assert_eq!(frame.text, "frame");
    let icon = mgr.load_async::<TextAsset>("UI/Icon", None).unwrap();
    for _ in 0..5 {
        mgr.on_update(0.016);
    }
    assert_eq!(mgr.check(&icon).ready().unwrap().text, "icon");
    assert_eq!(mgr.force_release_all(), 2);
}

#[test]
fn simulation_config_from_ron_file() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(src.join("Dialog")).unwrap();
    std::fs::write(src.join("Dialog/Intro.txt"), "hello there").unwrap();
    let cfg_path = dir.path().join("resources.ron");
    std::fs::write(
        &cfg_path,
        format!(
            "(location_root: {:?}, simulation_on_editor: true, stream_chunk_bytes: 4)",
            src.display().to_string()
        ),
    )
    .unwrap();

    let config = ResourceConfig::from_ron_file(&cfg_path).unwrap();
    let mut mgr = ResourceManager::on_create(config, ResourceServices::default());
    assert!(mgr.on_diagnostics_draw().starts_with("mode: simulation"));

    let intro = mgr.load_async::<TextAsset>("Dialog/Intro", None).unwrap();
    let mut ticks = 0;
    while !mgr.check(&intro).is_done() {
        mgr.on_update(0.016);
        ticks += 1;
    }
    // open, then 11 bytes in 4-byte chunks
    assert_eq!(ticks, 4);
    assert_eq!(mgr.check(&intro).ready().unwrap().text, "hello there");
}
