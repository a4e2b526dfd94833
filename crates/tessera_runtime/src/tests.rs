//! End-to-end tests for the runtime facade
//!
//! An in-memory engine stands in for the native one; assets come from a
//! temporary resource directory, `file://` URLs and a counting HTTP stand-in.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use async_trait::async_trait;
use base64::Engine;
use tessera_assets::loader::DataLoader;
use tessera_assets::{
    AssetLoaderConfig, DataLoaderError, DataSource, DefaultAssetFactory, Loaders, ReferencedAsset,
    ReferencedAssets,
};
use tessera_core::memory::{
    MemoryFile, MemoryFileParser, MemoryProperty, MemoryTrigger, MemoryView, SlotDeclaration,
};
use tessera_core::{
    AssetFactory, AssetKind, DecodedAsset, EngineError, NativeObject, NumberProperty,
    PropertyListeners, PropertyValue, RefreshTarget, TriggerProperty,
};
use tessera_platform::FilesystemAssetLoader;

use crate::TesseraRuntime;

const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

/// Engine-side decoder: fonts are registered as raw bytes, images decoded
struct HostDecoder;

impl AssetFactory for HostDecoder {
    fn decode(&self, kind: AssetKind, bytes: &[u8]) -> Result<DecodedAsset, EngineError> {
        match kind {
            AssetKind::Font => Ok(DecodedAsset::Font(NativeObject::new(bytes.to_vec()))),
            _ => DefaultAssetFactory.decode(kind, bytes),
        }
    }
}

fn write(path: &Path, bytes: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

fn png() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(PNG_1X1)
        .unwrap()
}

fn scene_runtime(root: &Path) -> TesseraRuntime {
    let parser = MemoryFileParser::new(vec![
        SlotDeclaration::new("hero", "hero-1.png", AssetKind::Image),
        SlotDeclaration::new("Inter", "Inter-594377.ttf", AssetKind::Font),
    ]);
    TesseraRuntime::builder(Arc::new(parser))
        .with_decoder(Arc::new(HostDecoder))
        .with_config(AssetLoaderConfig::testing(root.join("cache")))
        .with_asset_loader(Arc::new(FilesystemAssetLoader::new(root.join("res"))))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_image_and_font_batch_refreshes_once() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("res/raw/scene.riv"), b"scene");
    write(&dir.path().join("res/raw/Inter-594377.ttf"), b"font bytes");
    write(&dir.path().join("images/hero.png"), &png());

    let runtime = scene_runtime(dir.path());
    let declared = ReferencedAssets::new()
        .with("hero-1", ReferencedAsset::default())
        .with("Inter-594377", ReferencedAsset::default());
    let file = runtime
        .files()
        .from_resource("scene.riv", Some(&declared))
        .await
        .unwrap();

    let mut keys = file.slot_keys();
    keys.sort();
    assert_eq!(keys, vec!["Inter-594377", "hero-1"]);

    let view = Arc::new(MemoryView::new());
    let target: Arc<dyn RefreshTarget> = view.clone();
    file.register_view(&target);

    let hero_url = format!("file://{}", dir.path().join("images/hero.png").display());
    let update = ReferencedAssets::new()
        .with("hero-1", ReferencedAsset::url(hero_url))
        .with("Inter-594377", ReferencedAsset::bundled("Inter-594377.ttf"));
    let report = file.update_referenced_assets(&update).unwrap().await.unwrap();

    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(view.refresh_count(), 1);

    let engine_file = file
        .engine_file()
        .as_any()
        .downcast_ref::<MemoryFile>()
        .unwrap();
    let hero = engine_file.slot("hero").unwrap().assigned().unwrap();
    assert!(matches!(hero, DecodedAsset::Image(ref handle) if handle.byte_size() == png().len()));
    let font = engine_file.slot("Inter").unwrap().assigned().unwrap();
    match font {
        DecodedAsset::Font(native) => {
            assert_eq!(native.downcast_ref::<Vec<u8>>().unwrap(), b"font bytes")
        }
        other => panic!("expected font, got {}", other.kind()),
    }
}

/// Serves one image over "HTTP" and counts requests
struct CdnStub {
    url: &'static str,
    requests: AtomicUsize,
}

#[async_trait]
impl DataLoader for CdnStub {
    async fn load(&self, source: &DataSource) -> tessera_assets::Result<Vec<u8>> {
        let DataSource::Http(url) = source else {
            return Err(DataLoaderError::InvalidSource);
        };
        self.requests.fetch_add(1, Ordering::SeqCst);
        if url == self.url {
            Ok(png())
        } else {
            Err(DataLoaderError::HttpError {
                status_code: 404,
                url: url.clone(),
            })
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_image_and_bundled_font_share_one_refresh() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("res/raw/scene.riv"), b"scene");
    write(&dir.path().join("res/raw/Inter.ttf"), b"font bytes");

    let cdn = Arc::new(CdnStub {
        url: "https://cdn.test/hero.png",
        requests: AtomicUsize::new(0),
    });
    let config = AssetLoaderConfig::testing(dir.path().join("cache"));
    let parser = MemoryFileParser::new(vec![
        SlotDeclaration::new("hero", "hero-1.png", AssetKind::Image),
        SlotDeclaration::new("Inter", "Inter-594377.ttf", AssetKind::Font),
    ]);
    let runtime = TesseraRuntime::builder(Arc::new(parser))
        .with_decoder(Arc::new(HostDecoder))
        .with_loaders(Loaders::new(&config).with_http(cdn.clone()))
        .with_asset_loader(Arc::new(FilesystemAssetLoader::new(dir.path().join("res"))))
        .with_config(config)
        .build()
        .unwrap();

    let declared = ReferencedAssets::new()
        .with("hero", ReferencedAsset::default())
        .with("Inter", ReferencedAsset::default());
    let file = runtime
        .files()
        .from_resource("scene.riv", Some(&declared))
        .await
        .unwrap();
    let view = Arc::new(MemoryView::new());
    let target: Arc<dyn RefreshTarget> = view.clone();
    file.register_view(&target);

    let update = ReferencedAssets::new()
        .with("hero", ReferencedAsset::url("https://cdn.test/hero.png"))
        .with("Inter", ReferencedAsset::bundled("Inter.ttf"));
    let report = file.update_referenced_assets(&update).unwrap().await.unwrap();

    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(view.refresh_count(), 1);
    assert_eq!(cdn.requests.load(Ordering::SeqCst), 1);

    let engine_file = file
        .engine_file()
        .as_any()
        .downcast_ref::<MemoryFile>()
        .unwrap();
    assert!(matches!(
        engine_file.slot("hero").unwrap().assigned(),
        Some(DecodedAsset::Image(_))
    ));
    assert!(matches!(
        engine_file.slot("Inter").unwrap().assigned(),
        Some(DecodedAsset::Font(_))
    ));

    // A second batch is served from the URL cache
    file.update_referenced_assets(&update).unwrap().await.unwrap();
    assert_eq!(cdn.requests.load(Ordering::SeqCst), 1);
    assert_eq!(view.refresh_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_assets_still_refresh_once() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("res/raw/scene.riv"), b"scene");

    let runtime = scene_runtime(dir.path());
    let declared = ReferencedAssets::new()
        .with("hero-1", ReferencedAsset::default())
        .with("Inter", ReferencedAsset::default());
    let file = runtime
        .files()
        .from_resource("scene.riv", Some(&declared))
        .await
        .unwrap();
    let view = Arc::new(MemoryView::new());
    let target: Arc<dyn RefreshTarget> = view.clone();
    file.register_view(&target);

    let update = ReferencedAssets::new()
        .with("hero-1", ReferencedAsset::asset_id("ftp://cdn.test/hero.png"))
        .with("Inter", ReferencedAsset::bundled("Inter-594377.ttf"));
    let report = file.update_referenced_assets(&update).unwrap().await.unwrap();

    assert_eq!(report.failed, 2);
    assert_eq!(view.refresh_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_standalone_image_loading() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("res/drawable/logo.png"), &png());
    let runtime = scene_runtime(dir.path());

    let handle = runtime.load_from_resource_async("logo.png").await.unwrap();
    assert_eq!(handle.byte_size(), png().len());

    let missing = runtime.load_from_resource_async("absent.png").await;
    assert!(missing.is_err());

    let bytes = runtime.load_from_bytes_async(png()).await.unwrap();
    assert_eq!(bytes.byte_size(), png().len());
}

#[test]
fn test_build_requires_tokio_runtime() {
    let result = TesseraRuntime::builder(Arc::new(MemoryFileParser::default())).build();
    assert!(result.is_err());
}

#[test]
fn test_init_loads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tessera.toml");
    std::fs::write(
        &path,
        "[assets]\ncache_enabled = false\nhttp_timeout_secs = 12\n",
    )
    .unwrap();

    let config = crate::init(Some(&path)).unwrap();
    assert!(!config.cache_enabled);
    assert_eq!(config.http_timeout_secs, 12);

    let err = crate::init(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to load config"));
}

#[test]
fn test_number_property_shares_one_subscription() {
    let engine = Arc::new(MemoryProperty::new(1.5_f32));
    let score = NumberProperty::new("player/score", engine.clone());

    let seen = Arc::new(AtomicUsize::new(0));
    let first = {
        let seen = seen.clone();
        score.add_listener(move |value| {
            assert_eq!(value, 4.0);
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };
    let second = {
        let seen = seen.clone();
        score.add_listener(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    };
    assert_eq!(engine.subscribe_count(), 1);

    score.set_value(4.0);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(score.value(), 4.0);

    first.remove();
    assert_eq!(engine.active_subscriptions(), 1);
    second.remove();
    assert_eq!(engine.active_subscriptions(), 0);

    score.dispose();
    second.remove();
}

#[test]
fn test_worklet_relay_delivers_in_order() {
    let relay = crate::install_worklet_dispatcher();
    assert!(Arc::ptr_eq(&relay, &crate::install_worklet_dispatcher()));

    let engine = Arc::new(MemoryProperty::new(0.0_f32));
    let level = NumberProperty::new("audio/level", engine.clone());
    let trigger_engine = Arc::new(MemoryTrigger::new());
    let fire = TriggerProperty::new("intro/fire", trigger_engine.clone());

    let (tx, rx) = mpsc::channel();
    let level_tx = tx.clone();
    let _level_token =
        level.add_boxed_listener(relay.box_callback(move |value| level_tx.send(value).unwrap()));
    let _fire_token =
        fire.add_boxed_listener(relay.box_callback(move |value| tx.send(value).unwrap()));

    std::thread::spawn(move || {
        for value in [0.25_f32, 0.5, 0.75] {
            engine.emit(value);
        }
        trigger_engine.fire();
    })
    .join()
    .unwrap();

    assert!(rx.try_recv().is_err());
    assert_eq!(relay.drain(), 4);

    let received: Vec<PropertyValue> = rx.try_iter().collect();
    assert_eq!(
        received,
        vec![
            PropertyValue::Number(0.25),
            PropertyValue::Number(0.5),
            PropertyValue::Number(0.75),
            PropertyValue::Unit,
        ]
    );
    assert_eq!(
        serde_json::to_string(&received[3]).unwrap(),
        r#"{"type":"unit"}"#
    );
}
