use restrack_algorithms::{
    Cost, DistanceMatrix, HeldKarp, PathMinimizationConfig, PathMinimizer, Tour, TourSolver,
};
use restrack_core::{Hit, Hits, MinimizationError, TrackEvent};

/// Fails on tracks above a size, delegates to Held-Karp otherwise.
struct FailAbove(usize);

impl TourSolver for FailAbove {
    fn solve<C: Cost>(&self, distances: &DistanceMatrix<C>) -> Result<Tour<C>, MinimizationError> {
        if distances.len() > self.0 {
            Err(MinimizationError::TooManyNodes(distances.len()))
        } else {
            HeldKarp.solve(distances)
        }
    }
}

/// Returns a tour that misses nodes.
struct Truncating;

impl TourSolver for Truncating {
    fn solve<C: Cost>(&self, _: &DistanceMatrix<C>) -> Result<Tour<C>, MinimizationError> {
        Ok(Tour {
            order: vec![0],
            cost: C::ZERO,
        })
    }
}

/// Returns an order of the right length that is not a permutation.
struct Repeating(usize);

impl TourSolver for Repeating {
    fn solve<C: Cost>(&self, distances: &DistanceMatrix<C>) -> Result<Tour<C>, MinimizationError> {
        Ok(Tour {
            order: vec![self.0; distances.len()],
            cost: C::ZERO,
        })
    }
}

fn line(xs: &[f64]) -> Hits {
    xs.iter().map(|&x| Hit::new(x, 0.0, 0.0, 1.0)).collect()
}

#[test]
fn test_failed_track_keeps_input_order() {
    let mut event = TrackEvent::new();
    event.push_track(0, line(&[2.0, 0.0, 4.0, 1.0, 3.0])).unwrap();
    event
        .push_track(0, line(&[5.0, 9.0, 6.0, 8.0, 7.0, 10.0]))
        .unwrap();

    let minimizer =
        PathMinimizer::with_solver(PathMinimizationConfig::default(), FailAbove(5)).unwrap();
    let output = minimizer.minimize_event(&event).unwrap();

    let solved = output.track(2).unwrap();
    assert!(solved.ok);
    assert_eq!(solved.parent_id, 1);

    let failed = output.track(3).unwrap();
    assert!(!failed.ok);
    assert_eq!(failed.parent_id, 2);
    assert_eq!(failed.hits, event.track(1).unwrap().hits);
    assert!(!output.is_ok());
}

#[test]
fn test_incomplete_tour_is_rejected() {
    let minimizer =
        PathMinimizer::with_solver(PathMinimizationConfig::default(), Truncating).unwrap();
    let path = minimizer.minimize(&line(&[3.0, 1.0, 2.0, 0.0]), None);
    assert_eq!(path.order, vec![0, 1, 2, 3]);
    assert!(!path.ok);
}

#[test]
fn test_trivial_tracks_skip_solver() {
    let minimizer =
        PathMinimizer::with_solver(PathMinimizationConfig::default(), FailAbove(0)).unwrap();
    for n in 0..=3 {
        let xs: Vec<f64> = (0..n).rev().map(f64::from).collect();
        let path = minimizer.minimize(&line(&xs), None);
        assert_eq!(path.order, (0..xs.len()).collect::<Vec<_>>());
        assert!(path.ok);
    }
}

#[test]
fn test_repeated_tour_nodes_are_rejected() {
    let hits = line(&[2.0, 0.0, 4.0, 1.0, 3.0]);
    for node in [0, 5, usize::MAX] {
        let minimizer =
            PathMinimizer::with_solver(PathMinimizationConfig::default(), Repeating(node))
                .unwrap();
        let path = minimizer.minimize(&hits, None);
        assert_eq!(path.order, vec![0, 1, 2, 3, 4], "solver node {node}");
        assert!(!path.ok, "solver node {node}");
    }
}
