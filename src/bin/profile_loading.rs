#![allow(dead_code, unused_imports)]

use archetype_asset_store::{
    AssetStore, BoxError, Dependencies, Descriptor, Identifier, Loader, StoreConfig, SyncLoader,
};
use std::{fs::File, time::Instant};

#[cfg(feature = "profiling")]
use tracing_subscriber::{self, prelude::*, EnvFilter};

#[derive(Debug)]
struct Texture(Vec<u8>);

#[derive(Debug)]
struct Material;

struct TextureLoader;

impl SyncLoader<Texture> for TextureLoader {
    fn load(&self, _: &Descriptor, _: &Dependencies) -> Result<Texture, BoxError> {
        Ok(Texture(vec![0; 4096]))
    }
}

/// Each material pulls four textures, two of them shared by every material
struct MaterialLoader;

impl SyncLoader<Material> for MaterialLoader {
    fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor> {
        vec![
            Descriptor::new::<Texture>("shared/albedo.png"),
            Descriptor::new::<Texture>("shared/normal.png"),
            Descriptor::new::<Texture>(format!("{}/roughness.png", descriptor.path())),
            Descriptor::new::<Texture>(format!("{}/emissive.png", descriptor.path())),
        ]
    }

    fn load(&self, _: &Descriptor, dependencies: &Dependencies) -> Result<Material, BoxError> {
        if dependencies.len() != 4 {
            return Err("missing textures".into());
        }
        Ok(Material)
    }
}

#[cfg(feature = "profiling")]
#[tracing::instrument(skip(store))]
fn profile_loads(store: &AssetStore, count: usize) -> Vec<Identifier> {
    let _span = tracing::info_span!("load_loop", count = count).entered();
    let handles: Vec<_> = (0..count)
        .map(|i| {
            if i % 100 == 0 {
                tracing::info!("Requesting material {}/{}", i, count);
            }
            store
                .load_async::<Material>(Identifier::new::<Material>(format!("material/{i}")))
                .expect("material loader registered")
        })
        .collect();
    for handle in &handles {
        store.wait(handle).expect("material loaded");
    }
    handles.iter().map(|h| h.identifier().clone()).collect()
}

#[cfg(feature = "profiling")]
fn main() {
    // Set up tracing subscriber to write to a file
    let file = File::create("trace.json").expect("create trace.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .init();

    let store = AssetStore::builder()
        .config(StoreConfig::default().with_worker_threads(4))
        .loader(Loader::sync::<Texture, _>(TextureLoader))
        .loader(Loader::sync::<Material, _>(MaterialLoader))
        .build()
        .expect("store");

    println!("Warming up...");
    {
        let _span = tracing::info_span!("warmup").entered();
        let warmup = profile_loads(&store, 100);
        for id in &warmup {
            store.unload(id);
        }
    }

    println!("Profiling 1k materials with shared textures...");
    let start = Instant::now();
    let ids = profile_loads(&store, 1_000);
    println!(
        "Loaded {} assets in: {:?} ({})",
        store.len(),
        start.elapsed(),
        store.progress().snapshot()
    );

    let start = Instant::now();
    for id in &ids {
        store.unload(id);
    }
    println!("Unloaded everything in: {:?}", start.elapsed());
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("profile_loading binary requires --features profiling");
}
