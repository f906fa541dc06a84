use chrono::Utc;
use log::LevelFilter;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sstree::{Error, Point, SsTree};
use std::path::PathBuf;

#[test]
fn construction_rejects_degenerate_capacities() {
    assert_eq!(
        SsTree::<u32>::new(0).err(),
        Some(Error::InvalidArgument(
            "max_elements_per_cluster must be at least 2"
        ))
    );
    assert!(SsTree::<u32>::new(1).is_err());
    assert!(SsTree::<u32>::new(2).is_ok());
}

#[test]
fn zero_k_is_rejected_and_empty_tree_is_not() {
    let tree = SsTree::<u32>::new(4).unwrap();
    assert!(tree.k_nearest((0.0, 0.0), 0).is_err());
    assert_eq!(tree.k_nearest((0.0, 0.0), 5).unwrap(), vec![]);
}

#[test]
fn root_split_scenario() {
    let mut tree = SsTree::new(2).unwrap();
    tree.insert(Point::new(0.0, 0.0, "a"));
    tree.insert(Point::new(10.0, 10.0, "b"));
    tree.insert(Point::new(1.0, 1.0, "c"));
    assert_eq!(tree.len(), 3);

    assert_eq!(tree.k_nearest((0.0, 0.0), 1).unwrap(), vec!["a"]);
    assert_eq!(tree.k_nearest((0.0, 0.0), 2).unwrap(), vec!["a", "c"]);
    assert_eq!(tree.k_nearest((0.0, 0.0), 3).unwrap(), vec!["a", "c", "b"]);
    // Asking for more than the tree holds returns everything.
    assert_eq!(tree.k_nearest((0.0, 0.0), 10).unwrap().len(), 3);
}

#[test]
fn queries_are_idempotent() {
    let mut rng = SmallRng::from_seed([7; 16]);
    let mut tree = SsTree::new(5).unwrap();
    for n in 0..200u32 {
        tree.insert(Point::new(rng.gen::<f64>(), rng.gen::<f64>(), n));
    }
    let first = tree.k_nearest((0.5, 0.5), 9).unwrap();
    let second = tree.k_nearest((0.5, 0.5), 9).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_insert_is_retrievable() {
    let mut rng = SmallRng::from_seed([9; 16]);
    for &cap in &[2usize, 3, 8] {
        let mut tree = SsTree::new(cap).unwrap();
        for n in 0..500usize {
            tree.insert(Point::new(rng.gen::<f64>() * 10.0, rng.gen::<f64>() * 10.0, n));
            assert_eq!(tree.len(), n + 1);
        }
        let mut payloads: Vec<usize> = tree.points().map(|p| p.payload).collect();
        payloads.sort();
        assert_eq!(payloads, (0..500).collect::<Vec<_>>());
    }
}

#[test]
fn identical_points_do_not_break_anything() {
    let mut tree = SsTree::new(3).unwrap();
    for n in 0..20u32 {
        tree.insert(Point::new(-1.5, 2.5, n));
    }
    let found = tree.k_nearest((-1.5, 2.5), 20).unwrap();
    assert_eq!(found.len(), 20);
}

#[test]
fn compare_to_linear() -> std::io::Result<()> {
    // Start logging.
    let now = Utc::now();
    let log_dir = PathBuf::from("target").join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join(now.format("%Z_%F_%H-%M-%S.txt").to_string());
    eprintln!("logging in {}", log_file.display());
    simple_logging::log_to_file(&log_file, LevelFilter::Trace)?;

    let mut rng = SmallRng::from_seed([5; 16]);
    let space: Vec<(f64, f64)> = (0..2000)
        .map(|_| (rng.gen::<f64>() * 1000.0, rng.gen::<f64>() * 1000.0))
        .collect();
    let queries: Vec<(f64, f64)> = (0..100)
        .map(|_| (rng.gen::<f64>() * 1000.0, rng.gen::<f64>() * 1000.0))
        .collect();

    for &cap in &[2usize, 4, 16] {
        let mut tree = SsTree::new(cap).unwrap();
        for (ix, &(x, y)) in space.iter().enumerate() {
            tree.insert(Point::new(x, y, ix));
        }

        for &(qx, qy) in &queries {
            for &k in &[1usize, 5, 17] {
                let mut by_distance: Vec<(f64, usize)> = space
                    .iter()
                    .enumerate()
                    .map(|(ix, &(x, y))| ((x - qx).hypot(y - qy), ix))
                    .collect();
                by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
                let expected: Vec<usize> = by_distance.iter().take(k).map(|&(_, ix)| ix).collect();
                assert_eq!(tree.k_nearest((qx, qy), k).unwrap(), expected);
            }
        }
    }

    Ok(())
}
