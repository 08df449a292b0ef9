//! Held-Karp dynamic programming for the open-path travelling salesman.
//!
//! `cost[mask][j]` is the cheapest path that visits exactly the nodes in
//! `mask` and ends at `j`. Both endpoints are free: every node may start
//! the path. Time is O(2^n · n²), memory O(2^n · n).
#![allow(clippy::cast_possible_truncation)]

use restrack_core::MinimizationError;

/// Segment cost type usable by the solver.
pub trait Cost: Copy + PartialOrd + std::fmt::Debug {
    /// Cost of the empty path.
    const ZERO: Self;
    /// Marker for unreachable states.
    const INFINITY: Self;
    /// Addition that never wraps.
    #[must_use]
    fn plus(self, other: Self) -> Self;
}

impl Cost for u32 {
    const ZERO: Self = 0;
    const INFINITY: Self = u32::MAX;

    fn plus(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Cost for f64 {
    const ZERO: Self = 0.0;
    const INFINITY: Self = f64::INFINITY;

    fn plus(self, other: Self) -> Self {
        self + other
    }
}

/// Dense symmetric matrix of segment costs.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix<C> {
    n: usize,
    data: Vec<C>,
}

impl<C: Cost> DistanceMatrix<C> {
    /// Builds an `n × n` matrix from `f(i, j)`. The diagonal is zero.
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> C) -> Self {
        let mut data = vec![C::ZERO; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let value = f(i, j);
                data[i * n + j] = value;
                data[j * n + i] = value;
            }
        }
        Self { n, data }
    }

    /// Wraps a row-major matrix.
    ///
    /// # Errors
    /// Returns [`MinimizationError::MatrixSize`] unless `data` holds
    /// `n * n` entries.
    pub fn from_rows(n: usize, data: Vec<C>) -> Result<Self, MinimizationError> {
        if data.len() == n * n {
            Ok(Self { n, data })
        } else {
            Err(MinimizationError::MatrixSize {
                expected: n * n,
                found: data.len(),
            })
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// True for a matrix without nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Cost of the segment `i -> j`.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> C {
        self.data[i * self.n + j]
    }

    /// Cost of visiting the nodes in `order`.
    #[must_use]
    pub fn path_cost(&self, order: &[usize]) -> C {
        order
            .windows(2)
            .fold(C::ZERO, |acc, w| acc.plus(self.get(w[0], w[1])))
    }
}

/// A visiting order and its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour<C> {
    /// Node indices in visiting order.
    pub order: Vec<usize>,
    /// Sum of the segment costs along `order`.
    pub cost: C,
}

/// Open-path tour solver.
///
/// [`HeldKarp`] is the exact solver; other implementations can be
/// plugged into [`crate::PathMinimizer`].
pub trait TourSolver: Send + Sync {
    /// Finds a visiting order of all nodes of `distances`.
    ///
    /// # Errors
    /// Returns a [`MinimizationError`] when no tour can be produced.
    fn solve<C: Cost>(&self, distances: &DistanceMatrix<C>) -> Result<Tour<C>, MinimizationError>;
}

/// Exact Held-Karp solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeldKarp;

impl HeldKarp {
    /// Number of DP states for `n` nodes, `2^n · n`, or `None` when it
    /// does not fit in `usize`.
    #[must_use]
    pub fn states(n: usize) -> Option<usize> {
        1usize.checked_shl(u32::try_from(n).ok()?)?.checked_mul(n)
    }

    /// Relative cost estimate, `2^n`, for callers deciding whether to
    /// downsample a track first.
    #[must_use]
    pub fn estimated_cost(n: usize) -> f64 {
        2f64.powi(i32::try_from(n).unwrap_or(i32::MAX))
    }
}

impl TourSolver for HeldKarp {
    fn solve<C: Cost>(&self, distances: &DistanceMatrix<C>) -> Result<Tour<C>, MinimizationError> {
        let n = distances.len();
        if n <= 1 {
            return Ok(Tour {
                order: (0..n).collect(),
                cost: C::ZERO,
            });
        }
        // Parents are stored as u8.
        if n > usize::from(u8::MAX) {
            return Err(MinimizationError::TooManyNodes(n));
        }
        let entries = Self::states(n).ok_or(MinimizationError::TooManyNodes(n))?;

        let mut cost: Vec<C> = Vec::new();
        cost.try_reserve_exact(entries)
            .map_err(|_| MinimizationError::Allocation { entries })?;
        cost.resize(entries, C::INFINITY);
        let mut parent: Vec<u8> = Vec::new();
        parent
            .try_reserve_exact(entries)
            .map_err(|_| MinimizationError::Allocation { entries })?;
        parent.resize(entries, 0);

        for j in 0..n {
            cost[(1 << j) * n + j] = C::ZERO;
        }

        let full = (1usize << n) - 1;
        for mask in 1..full {
            for j in 0..n {
                if mask & (1 << j) == 0 {
                    continue;
                }
                let current = cost[mask * n + j];
                if !(current < C::INFINITY) {
                    continue;
                }
                for k in 0..n {
                    if mask & (1 << k) != 0 {
                        continue;
                    }
                    let next = (mask | (1 << k)) * n + k;
                    let candidate = current.plus(distances.get(j, k));
                    if candidate < cost[next] {
                        cost[next] = candidate;
                        parent[next] = j as u8;
                    }
                }
            }
        }

        let mut best: Option<(usize, C)> = None;
        for j in 0..n {
            let value = cost[full * n + j];
            if value < best.map_or(C::INFINITY, |(_, c)| c) {
                best = Some((j, value));
            }
        }
        let (mut last, total) = best.ok_or(MinimizationError::NoTour)?;

        let mut order = Vec::with_capacity(n);
        let mut mask = full;
        loop {
            order.push(last);
            if mask == 1 << last {
                break;
            }
            let previous = usize::from(parent[mask * n + last]);
            mask ^= 1 << last;
            last = previous;
        }
        order.reverse();

        if order.len() != n {
            return Err(MinimizationError::NoTour);
        }
        Ok(Tour { order, cost: total })
    }
}
