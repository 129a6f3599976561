use archetype_asset_store::loader::{BinaryAsset, BytesLoader, JsonAsset, JsonLoader, TextAsset, TextLoader};
use archetype_asset_store::{AssetError, AssetStore, Identifier, Loader, StoreConfig};
use std::fs;
use std::path::PathBuf;

fn asset_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("asset-store-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn store_at(dir: &PathBuf) -> AssetStore {
    let config = StoreConfig::default()
        .with_asset_root(dir)
        .with_worker_threads(2);
    let store = AssetStore::new(config).unwrap();
    store.set_loader(Loader::sync::<TextAsset, _>(TextLoader));
    store.set_loader(Loader::sync::<BinaryAsset, _>(BytesLoader));
    store.set_loader(Loader::asynchronous::<JsonAsset, _>(JsonLoader));
    store
}

#[test]
fn test_loads_files_relative_to_root() {
    let dir = asset_dir("root");
    fs::write(dir.join("readme.txt"), "hello assets").unwrap();
    fs::write(dir.join("blob.bin"), [1u8, 2, 3, 4]).unwrap();
    fs::write(dir.join("level.json"), r#"{ "name": "intro", "enemies": 3 }"#).unwrap();
    let store = store_at(&dir);

    let text = store
        .load::<TextAsset>(Identifier::new::<TextAsset>("readme.txt"))
        .unwrap();
    assert_eq!(text.content, "hello assets");

    let blob = store
        .load::<BinaryAsset>(Identifier::new::<BinaryAsset>("blob.bin"))
        .unwrap();
    assert_eq!(blob.data, vec![1, 2, 3, 4]);

    let level = store
        .load::<JsonAsset>(Identifier::new::<JsonAsset>("level.json"))
        .unwrap();
    assert_eq!(level.value["name"], "intro");
    assert_eq!(level.value["enemies"], 3);

    let progress = store.progress().snapshot();
    assert_eq!(progress.total, 3);
    assert_eq!(progress.loaded, 3);
    assert!(progress.is_finished());

    store.dispose_all();
    assert!(store.is_empty());
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_same_path_loads_as_two_types() {
    let dir = asset_dir("types");
    fs::write(dir.join("config.json"), r#"{ "volume": 0.5 }"#).unwrap();
    let store = store_at(&dir);

    let as_text = Identifier::new::<TextAsset>("config.json");
    let as_json = Identifier::new::<JsonAsset>("config.json");
    let text = store.load::<TextAsset>(as_text.clone()).unwrap();
    let json = store.load::<JsonAsset>(as_json.clone()).unwrap();

    assert!(text.content.contains("volume"));
    assert_eq!(json.value["volume"], 0.5);
    assert_eq!(store.len(), 2);

    store.unload(&as_text);
    assert!(!store.contains(&as_text));
    assert!(store.is_loaded(&as_json));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_file_fails_with_loading_error() {
    let dir = asset_dir("missing");
    let store = store_at(&dir);
    let id = Identifier::new::<JsonAsset>("nowhere.json");

    match store.load::<JsonAsset>(id.clone()) {
        Err(AssetError::Loading { identifier, .. }) => assert_eq!(identifier, id),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(store.progress().failed(), 1);
    assert!(store.contains(&id));

    store.unload(&id);
    assert_eq!(store.progress().total(), 0);
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_config_round_trips_through_file() {
    let dir = asset_dir("config");
    let path = dir.join("store.json");
    let config = StoreConfig::default().with_asset_root(&dir).with_worker_threads(1);
    fs::write(&path, config.to_json().unwrap()).unwrap();

    let loaded = StoreConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(AssetStore::new(loaded).is_ok());
    fs::remove_dir_all(dir).ok();
}
