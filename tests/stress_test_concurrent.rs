use archetype_asset_store::{
    AssetStore, AsyncLoader, BoxError, Dependencies, Descriptor, Identifier,
    IdentityResolver, Loader, SyncLoader, ThreadExecutor,
};
use crossbeam::channel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[allow(dead_code)]
#[derive(Debug)]
struct Mesh(String);

#[derive(Debug)]
struct Material;

/// Async loader whose prepare phase blocks until the test opens the gate
struct GatedMeshLoader {
    invocations: Arc<AtomicUsize>,
    gate: channel::Receiver<()>,
}

impl AsyncLoader<Mesh> for GatedMeshLoader {
    type Prepared = String;

    fn prepare(&self, descriptor: &Descriptor, _: &Dependencies) -> Result<String, BoxError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.gate.recv()?;
        Ok(descriptor.path().to_uppercase())
    }

    fn finalize(&self, _: &Descriptor, prepared: String, _: &Dependencies) -> Result<Mesh, BoxError> {
        Ok(Mesh(prepared))
    }
}

fn pump_until_finished<T>(store: &AssetStore, workers: &[thread::JoinHandle<T>]) {
    while workers.iter().any(|worker| !worker.is_finished()) {
        store.process_main_thread_tasks();
        thread::yield_now();
    }
    store.process_main_thread_tasks();
}

#[test]
fn test_concurrent_requests_load_once() {
    const THREADS: usize = 8;
    let invocations = Arc::new(AtomicUsize::new(0));
    let (open, gate) = channel::bounded(THREADS);
    let store = Arc::new(
        AssetStore::builder()
            .executor(ThreadExecutor::new("stress-loader"))
            .resolver(IdentityResolver)
            .loader(Loader::asynchronous::<Mesh, _>(GatedMeshLoader {
                invocations: invocations.clone(),
                gate,
            }))
            .build()
            .unwrap(),
    );
    let id = Identifier::new::<Mesh>("ship.mesh");

    let (ready_tx, ready_rx) = channel::unbounded();
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let id = id.clone();
            let ready = ready_tx.clone();
            thread::spawn(move || {
                let handle = store.load_async::<Mesh>(id).unwrap();
                ready.send(()).unwrap();
                handle.wait().map(|mesh| mesh.0.clone())
            })
        })
        .collect();

    for _ in 0..THREADS {
        ready_rx.recv().unwrap();
    }
    assert_eq!(store.reference_count(&id), THREADS);
    for _ in 0..THREADS {
        open.send(()).unwrap();
    }

    pump_until_finished(&store, &workers);
    for worker in workers {
        assert_eq!(worker.join().unwrap().unwrap(), "SHIP.MESH");
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(store.progress().total(), 1);
    assert_eq!(store.progress().loaded(), 1);
}

struct MaterialLoader {
    textures: usize,
}

impl SyncLoader<Material> for MaterialLoader {
    fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor> {
        (0..self.textures)
            .map(|i| Descriptor::new::<Mesh>(format!("{}-{i}.mesh", descriptor.path())))
            .collect()
    }

    fn load(&self, _: &Descriptor, dependencies: &Dependencies) -> Result<Material, BoxError> {
        if dependencies.len() != self.textures {
            return Err("incomplete dependencies".into());
        }
        Ok(Material)
    }
}

struct MeshLoader {
    loads: Arc<AtomicUsize>,
}

impl SyncLoader<Mesh> for MeshLoader {
    fn load(&self, descriptor: &Descriptor, _: &Dependencies) -> Result<Mesh, BoxError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Mesh(descriptor.path().to_string()))
    }
}

#[test]
fn test_reference_counts_balance_under_contention() {
    const THREADS: usize = 6;
    const ROUNDS: usize = 25;
    let loads = Arc::new(AtomicUsize::new(0));
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&disposed);
    let store = Arc::new(
        AssetStore::builder()
            .executor(ThreadExecutor::new("stress-loader"))
            .resolver(IdentityResolver)
            .loader(Loader::sync::<Mesh, _>(MeshLoader {
                loads: Arc::clone(&loads),
            }))
            .loader(Loader::sync::<Material, _>(MaterialLoader { textures: 3 }))
            .disposer::<Mesh, _>(move |_: &Mesh| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap(),
    );
    let material = Identifier::new::<Material>("hull");

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let material = material.clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let handle = store.load_async::<Material>(material.clone()).unwrap();
                    // Our own reference keeps the record alive until we unload it
                    if let Err(error) = handle.wait() {
                        panic!("unexpected error: {error}");
                    }
                    assert!(store.unload(&material));
                }
            })
        })
        .collect();

    pump_until_finished(&store, &workers);
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(store.is_empty());
    assert_eq!(store.progress().total(), 0);
    assert_eq!(store.progress().loaded(), 0);
    assert_eq!(store.progress().failed(), 0);
    // Every mesh that finished loading was disposed exactly once
    assert_eq!(disposed.load(Ordering::SeqCst), loads.load(Ordering::SeqCst));
    assert!(loads.load(Ordering::SeqCst) >= 3);
}
