//! Energy-threshold node selection ahead of path minimization.

use restrack_core::Hits;

/// Keeps the most energetic hits of a track.
///
/// Hits are ranked by energy (descending, stable) and the smallest prefix
/// whose cumulative energy exceeds `energy_fraction` of the total is kept,
/// with at least 2 and at most `len - 1` hits. The kept hit farthest from
/// the first one is moved to the last slot. Tracks of two hits or fewer
/// are returned unchanged.
#[must_use]
pub fn select_nodes(hits: &Hits, energy_fraction: f64) -> Hits {
    let total = hits.len();
    if total <= 2 {
        return hits.clone();
    }

    let mut ranked: Vec<usize> = (0..total).collect();
    ranked.sort_by(|&a, &b| hits.energy[b].total_cmp(&hits.energy[a]));

    let target = energy_fraction * hits.total_energy();
    let mut accumulated = 0.0;
    let mut n = 0;
    for &index in &ranked {
        accumulated += hits.energy[index];
        n += 1;
        if accumulated > target {
            break;
        }
    }
    let n = n.max(2).min(total - 1);

    let mut selected = hits.reordered(&ranked[..n]);
    if n > 1 {
        let farthest = (1..n)
            .max_by(|&a, &b| {
                selected
                    .distance_squared(0, a)
                    .total_cmp(&selected.distance_squared(0, b))
            })
            .unwrap_or(n - 1);
        selected.swap_hits(farthest, n - 1);
    }
    log::debug!("node selection kept {n} of {total} hits");
    selected
}
