//! End-to-end scenarios: full train → search → dump → load → re-train
//! lifecycles over the in-memory store.
//!
//! Scenarios that depend on bucket assignment pin `bias_multiplier` to
//! zero, which puts every hyperplane through the sample mean: bucket
//! membership then depends only on which side of the mean a point
//! falls, so the asserted outcomes hold for every seed.

use proxima::{Config, Index, MemoryStore, Metric, Neighbor, Record, Store};

fn seeded(dims: usize) -> Config {
    let mut config = Config::new(dims);
    config.seed = Some(42);
    config
}

/// A coarse one-table one-plane index still resolves an exact-match
/// query deterministically.
#[test]
fn deterministic_identity() {
    let mut config = seeded(2);
    config.n_permutes = 1;
    config.n_planes = 1;
    let mut index = Index::new(config, MemoryStore::new(), Metric::Euclidean).unwrap();
    index
        .train(&[
            Record::new("a", vec![1.0, 0.0]),
            Record::new("b", vec![0.0, 1.0]),
        ])
        .unwrap();
    let hits = index.search(&[1.0, 0.0], 1, 10.0).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
    assert_eq!(hits[0].dist, 0.0);
}

fn one_dim_corpus() -> Vec<Record> {
    vec![
        Record::new("x1", vec![0.0]),
        Record::new("x2", vec![1.0]),
        Record::new("x3", vec![3.0]),
    ]
}

fn one_dim_index() -> Index<MemoryStore> {
    let mut config = seeded(1);
    config.bias_multiplier = 0.0;
    let mut index = Index::new(config, MemoryStore::new(), Metric::Euclidean).unwrap();
    index.train(&one_dim_corpus()).unwrap();
    index
}

/// Equal distances resolve in first-insertion order; results come back
/// ascending.
#[test]
fn top_k_ordering_with_insertion_tie_break() {
    let index = one_dim_index();
    // the sample mean is 4/3: x1 and x2 share the query's side in every
    // table, x3 never does
    let hits = index.search(&[0.5], 3, 10.0).unwrap();
    assert_eq!(
        hits,
        vec![
            Neighbor {
                id: "x1".into(),
                dist: 0.5
            },
            Neighbor {
                id: "x2".into(),
                dist: 0.5
            },
        ]
    );

    // the far side of the mean reaches x3 alone
    let hits = index.search(&[2.5], 3, 10.0).unwrap();
    assert_eq!(
        hits,
        vec![Neighbor {
            id: "x3".into(),
            dist: 0.5
        }]
    );
}

/// The distance threshold prunes candidates after exact reranking.
#[test]
fn threshold_filter() {
    let index = one_dim_index();
    let hits = index.search(&[0.5], 3, 1.0).unwrap();
    let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["x1", "x2"]);
    assert!(hits.iter().all(|n| n.dist <= 1.0));

    let hits = index.search(&[0.5], 3, 0.4).unwrap();
    assert!(hits.is_empty());
}

/// Zero vectors under the angular metric never surface and never fail
/// the query.
#[test]
fn angular_zero_vector_record() {
    let mut index = Index::new(seeded(2), MemoryStore::new(), Metric::Angular).unwrap();
    index
        .train(&[
            Record::new("z", vec![0.0, 0.0]),
            Record::new("a", vec![2.0, 0.0]),
        ])
        .unwrap();

    // an exact-match query always collides with "a"; "z" never surfaces
    let hits = index.search(&[2.0, 0.0], 2, 10.0).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
    assert!(hits[0].dist < 1e-12);

    // a zero query makes every candidate degenerate and still comes
    // back empty rather than erroring
    let hits = index.search(&[0.0, 0.0], 2, 10.0).unwrap();
    assert!(hits.is_empty());
}

/// Dump, load into a fresh index over the same store, and answer a
/// held-out query set identically.
#[test]
fn round_trip_preserves_search_results() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let dims = 8;
    let records: Vec<Record> = (0..200)
        .map(|i| {
            let vec: Vec<f64> = (0..dims).map(|_| rng.random_range(-1.0..1.0)).collect();
            Record::new(format!("r{i}"), vec)
        })
        .collect();
    let held_out: Vec<Vec<f64>> = (0..10)
        .map(|_| (0..dims).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect();

    let mut store = MemoryStore::new();
    let mut config = seeded(dims);
    config.sample_size = 64;
    let bytes;
    let expected: Vec<Vec<Neighbor>>;
    {
        let mut index = Index::new(config, &mut store, Metric::Euclidean).unwrap();
        index.train(&records).unwrap();
        bytes = index.dump().unwrap();
        expected = held_out
            .iter()
            .map(|q| index.search(q, 5, 1.5).unwrap())
            .collect();
    }

    // fresh index over the same store; only the byte stream carries the
    // hasher across
    let mut restored = Index::new(Config::new(dims), &mut store, Metric::Euclidean).unwrap();
    restored.load(&bytes).unwrap();
    assert!(restored.is_trained());
    for (query, want) in held_out.iter().zip(&expected) {
        let got = restored.search(query, 5, 1.5).unwrap();
        assert_eq!(&got, want);
    }
    assert_eq!(restored.dump().unwrap(), bytes);
}

/// Re-training replaces the previous corpus wholesale.
#[test]
fn retrain_replaces_corpus() {
    let mut index = Index::new(seeded(2), MemoryStore::new(), Metric::Euclidean).unwrap();
    index
        .train(&[
            Record::new("a1", vec![1.0, 0.0]),
            Record::new("a2", vec![0.0, 1.0]),
        ])
        .unwrap();
    assert_eq!(
        index.search(&[1.0, 0.0], 1, 10.0).unwrap()[0].id,
        "a1"
    );

    index
        .train(&[
            Record::new("b1", vec![5.0, 5.0]),
            Record::new("b2", vec![-5.0, 5.0]),
        ])
        .unwrap();

    // the old records are gone from the store entirely
    assert!(index.store().get_vector("a1").is_err());
    assert_eq!(index.store().len(), 2);

    // queries over the old corpus behave like queries over unseen data
    let hits = index.search(&[1.0, 0.0], 2, 10.0).unwrap();
    assert!(hits.iter().all(|n| n.id.starts_with('b')));
}

/// Every trained record is its own nearest neighbor at distance ~0.
#[test]
fn self_neighbors_after_training() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(3);
    let dims = 5;
    let records: Vec<Record> = (0..50usize)
        .map(|i| {
            // offset grid keeps every vector distinct
            let vec: Vec<f64> = (0..dims)
                .map(|d| (i * 10 + d) as f64 + rng.random_range(0.0..0.5))
                .collect();
            Record::new(format!("r{i}"), vec)
        })
        .collect();

    let mut index = Index::new(seeded(dims), MemoryStore::new(), Metric::Euclidean).unwrap();
    index.train(&records).unwrap();
    for record in &records {
        let hits = index.search(&record.vec, 1, f64::INFINITY).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, record.id);
        assert!(hits[0].dist < 1e-9);
    }
}
