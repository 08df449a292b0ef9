#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use restrack_algorithms::{
    hits_to_tracks, HitsToTrack, MeshClustering, MeshClusteringConfig, PathMinimizationConfig,
    PathMinimizer, RadiusClustering, RadiusClusteringConfig, SegmentCost,
};
use restrack_core::{Hit, Hits, Position, TrackEvent};

/// Deterministic pseudo-random generator for reproducible point clouds.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn random_points(seed: u64, n: usize, scale: f64) -> Hits {
    let mut rng = Lcg(seed);
    (0..n)
        .map(|_| {
            Hit::new(
                rng.next_f64() * scale,
                rng.next_f64() * scale,
                rng.next_f64() * scale,
                1.0 + rng.next_f64(),
            )
        })
        .collect()
}

fn permutations(items: &mut Vec<usize>, k: usize, visit: &mut impl FnMut(&[usize])) {
    if k == items.len() {
        visit(items);
        return;
    }
    for i in k..items.len() {
        items.swap(k, i);
        permutations(items, k + 1, visit);
        items.swap(k, i);
    }
}

fn brute_force_length(hits: &Hits) -> f64 {
    let mut best = f64::INFINITY;
    let mut order: Vec<usize> = (0..hits.len()).collect();
    permutations(&mut order, 0, &mut |perm| {
        best = best.min(hits.reordered(perm).total_length());
    });
    best
}

fn partition(event: &TrackEvent) -> Vec<Vec<(u64, u64, u64)>> {
    let mut tracks: Vec<Vec<(u64, u64, u64)>> = event
        .tracks()
        .iter()
        .map(|track| {
            let mut hits: Vec<_> = track
                .hits
                .iter()
                .map(|h| (h.x().to_bits(), h.y().to_bits(), h.z().to_bits()))
                .collect();
            hits.sort_unstable();
            hits
        })
        .collect();
    tracks.sort();
    tracks
}

#[test]
fn test_exact_path_matches_brute_force() {
    let minimizer =
        PathMinimizer::new(PathMinimizationConfig::default().with_cost(SegmentCost::Exact))
            .unwrap();
    for n in 4..=8 {
        let hits = random_points(n as u64, n, 50.0);
        let path = minimizer.minimize(&hits, None);
        assert!(path.ok);
        let length = hits.reordered(&path.order).total_length();
        assert_relative_eq!(length, brute_force_length(&hits), epsilon = 1e-9);
    }
}

#[test]
fn test_scaled_path_within_tolerance() {
    let minimizer = PathMinimizer::new(PathMinimizationConfig::default()).unwrap();
    for n in 4..=8 {
        let hits = random_points(100 + n as u64, n, 50.0);
        let path = minimizer.minimize(&hits, None);
        let length = hits.reordered(&path.order).total_length();
        // Each of the n - 1 segments may lose up to 1/100 mm to truncation.
        let tolerance = (n - 1) as f64 * 0.01;
        assert!(
            length <= brute_force_length(&hits) + tolerance,
            "n = {}: {} exceeds optimum by more than {}",
            n,
            length,
            tolerance
        );
    }
}

#[test]
fn test_minimized_never_longer_than_input() {
    let minimizer = PathMinimizer::new(PathMinimizationConfig::default()).unwrap();
    for seed in 0..10 {
        let hits = random_points(seed, 10, 20.0);
        let path = minimizer.minimize(&hits, None);
        let mut sorted = path.order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
        assert!(hits.reordered(&path.order).total_length() <= hits.total_length() + 0.1);
    }
}

#[test]
fn test_colinear_scenario() {
    let hits: Hits = [2.0, 0.0, 4.0, 1.0, 3.0]
        .iter()
        .map(|&x| Hit::new(x, 0.0, 0.0, 1.0))
        .collect();
    assert_relative_eq!(hits.total_length(), 11.0);

    let minimizer = PathMinimizer::new(PathMinimizationConfig::default()).unwrap();
    let path = minimizer.minimize(&hits, None);
    let ordered = hits.reordered(&path.order);
    assert_relative_eq!(ordered.total_length(), 4.0);
    assert!(ordered.x == vec![0.0, 1.0, 2.0, 3.0, 4.0] || ordered.x == vec![4.0, 3.0, 2.0, 1.0, 0.0]);
}

#[test]
fn test_two_blobs_mesh() {
    let mut hits = Hits::new();
    let mut rng = Lcg(7);
    for _ in 0..5 {
        hits.push(Hit::new(rng.next_f64() * 0.9, rng.next_f64() * 0.9, rng.next_f64() * 0.9, 1.0));
        hits.push(Hit::new(
            100.0 + rng.next_f64() * 0.9,
            100.0 + rng.next_f64() * 0.9,
            100.0 + rng.next_f64() * 0.9,
            1.0,
        ));
    }

    let config = MeshClusteringConfig::default()
        .with_cell_resolution(1.0)
        .with_net_size(200.0)
        .with_net_origin(Position::new(-50.0, -50.0, -50.0));
    let algo = MeshClustering::new(config).unwrap();
    let mut event = TrackEvent::new();
    assert_eq!(algo.find_tracks(&hits, &mut event).unwrap(), 2);
    assert_eq!(event.total_hits(), 10);
}

#[test]
fn test_strategies_partition_alike() {
    // Well separated sparse clumps: both strategies must agree.
    let mut hits = Hits::new();
    let mut rng = Lcg(11);
    for clump in 0..6 {
        let base = f64::from(clump) * 60.0 - 150.0;
        for _ in 0..8 {
            hits.push(Hit::new(
                base + rng.next_f64() * 3.0,
                base + rng.next_f64() * 3.0,
                rng.next_f64() * 3.0,
                rng.next_f64(),
            ));
        }
    }

    let mesh = MeshClustering::new(MeshClusteringConfig::default()).unwrap();
    let radius =
        RadiusClustering::new(RadiusClusteringConfig::default().with_cluster_distance(20.0))
            .unwrap();

    let by_mesh = hits_to_tracks(&hits, &mesh).unwrap();
    let by_radius = hits_to_tracks(&hits, &radius).unwrap();

    assert_eq!(by_mesh.number_of_tracks(), 6);
    assert_eq!(by_mesh.total_hits(), hits.len());
    assert_eq!(by_radius.total_hits(), hits.len());
    assert_eq!(partition(&by_mesh), partition(&by_radius));
}

#[test]
fn test_random_cloud_is_partitioned() {
    let hits = random_points(3, 300, 100.0);
    for distance in [1.0, 5.0, 15.0] {
        let radius =
            RadiusClustering::new(RadiusClusteringConfig::default().with_cluster_distance(distance))
                .unwrap();
        let event = hits_to_tracks(&hits, &radius).unwrap();
        assert_eq!(event.total_hits(), hits.len());
        assert_relative_eq!(event.energy(None), hits.total_energy(), epsilon = 1e-9);
    }

    let mesh = MeshClustering::new(MeshClusteringConfig::default().with_cell_resolution(4.0))
        .unwrap();
    let event = hits_to_tracks(&hits, &mesh).unwrap();
    assert_eq!(event.total_hits(), hits.len());
}
