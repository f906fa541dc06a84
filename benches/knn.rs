use criterion::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sstree::{Point, SsTree};

fn bench_k_nearest(c: &mut Criterion) {
    c.bench(
        "k_nearest",
        ParameterizedBenchmark::new(
            "cap_8_k_8",
            |bencher: &mut Bencher, &total: &usize| {
                let mut rng = SmallRng::from_seed([5; 16]);
                let mut tree = SsTree::new(8).unwrap();
                for n in 0..total {
                    tree.insert(Point::new(
                        rng.gen::<f64>() * 1000.0,
                        rng.gen::<f64>() * 1000.0,
                        n,
                    ));
                }
                bencher.iter(|| {
                    let query = (rng.gen::<f64>() * 1000.0, rng.gen::<f64>() * 1000.0);
                    assert_eq!(tree.k_nearest(query, 8).unwrap().len(), 8);
                });
            },
            (10..17).map(|n| 2usize.pow(n)),
        )
        .sample_size(30),
    );
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_10k_cap_8", |bencher| {
        let mut rng = SmallRng::from_seed([7; 16]);
        let space: Vec<(f64, f64)> = (0..10_000)
            .map(|_| (rng.gen::<f64>() * 1000.0, rng.gen::<f64>() * 1000.0))
            .collect();
        bencher.iter(|| {
            let mut tree = SsTree::new(8).unwrap();
            for (ix, &(x, y)) in space.iter().enumerate() {
                tree.insert(Point::new(x, y, ix));
            }
            tree.len()
        });
    });
}

fn config() -> Criterion {
    Criterion::default()
}

criterion_group! {
    name = benches;
    config = config();
    targets = bench_k_nearest, bench_insert
}

criterion_main!(benches);
