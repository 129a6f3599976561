use archetype_asset_store::{AssetStore, Identifier, InlineExecutor};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
struct Blob(#[allow(dead_code)] u64);

fn bench_add_unload(c: &mut Criterion) {
    let store = AssetStore::builder().executor(InlineExecutor).build().unwrap();
    let id = Identifier::new::<Blob>("blob");

    c.bench_function("progress_add_unload", |b| {
        b.iter(|| {
            store.add(id.clone(), Blob(black_box(7))).unwrap();
            store.unload(&id);
        });
    });
}

fn bench_snapshot_under_contention(c: &mut Criterion) {
    let store = Arc::new(AssetStore::builder().executor(InlineExecutor).build().unwrap());
    for i in 0..256 {
        store
            .add(Identifier::new::<Blob>(format!("blob/{i}")), Blob(i))
            .unwrap();
    }

    c.bench_function("progress_snapshot_4_writers", |b| {
        b.iter(|| {
            thread::scope(|s| {
                for t in 0..4 {
                    let store = Arc::clone(&store);
                    s.spawn(move || {
                        let id = Identifier::new::<Blob>(format!("writer/{t}"));
                        for _ in 0..64 {
                            store.add(id.clone(), Blob(t)).unwrap();
                            store.unload(&id);
                        }
                    });
                }
                black_box(store.progress().snapshot());
            });
        });
    });
}

criterion_group!(benches, bench_add_unload, bench_snapshot_under_contention);
criterion_main!(benches);
