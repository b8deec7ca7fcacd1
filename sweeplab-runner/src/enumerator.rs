//! Combination enumerators.
//!
//! - [`ExactEnumerator`]: full Cartesian product of a grid, odometer order.
//! - [`SampledEnumerator`]: `cap` distinct grid points chosen by seeded
//!   index sampling, never materializing the product.
//! - [`RandomEnumerator`]: `n` independent draws from ranges (or grid axes).
//!
//! [`Enumerator`] wraps all three behind one iterator. The same seed and
//! space always produce the same sequence.

use std::collections::HashSet;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sweeplab_core::rng::RngHierarchy;
use sweeplab_core::ParameterSet;

use crate::config::ConfigError;
use crate::space::{ParamGrid, ParamRanges, ParamSpace};

/// Which enumeration strategy produced a run's combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumeratorKind {
    Exact,
    Sampled,
    Random,
}

impl fmt::Display for EnumeratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Sampled => "sampled",
            Self::Random => "random",
        })
    }
}

// ─── Exact ───────────────────────────────────────────────────────────

/// Lazily walks the full product; first axis slowest, last fastest.
#[derive(Debug, Clone)]
pub struct ExactEnumerator {
    grid: ParamGrid,
    digits: Vec<usize>,
    remaining: usize,
}

impl ExactEnumerator {
    /// An invalid grid yields nothing.
    pub fn new(grid: ParamGrid) -> Self {
        let remaining = match (grid.validate(), grid.total()) {
            (Ok(()), Some(total)) => usize::try_from(total).unwrap_or(0),
            _ => 0,
        };
        Self {
            digits: vec![0; grid.axes().len()],
            grid,
            remaining,
        }
    }

    fn advance(&mut self) {
        for (digit, axis) in self.digits.iter_mut().zip(self.grid.axes()).rev() {
            *digit += 1;
            if *digit < axis.values.len() {
                return;
            }
            *digit = 0;
        }
    }
}

impl Iterator for ExactEnumerator {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<ParameterSet> {
        if self.remaining == 0 {
            return None;
        }
        let set = self.grid.assemble(&self.digits);
        self.remaining -= 1;
        self.advance();
        Some(set)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

// ─── Sampled ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SampleSource {
    /// Pre-selected flat indices, decoded one at a time.
    Indices(std::vec::IntoIter<u128>),
    /// Product too large for `u128`: draw digits directly, reject repeats.
    Digits {
        rng: StdRng,
        seen: HashSet<Vec<usize>>,
    },
}

/// `cap` distinct grid points in a seeded pseudo-random order.
#[derive(Debug, Clone)]
pub struct SampledEnumerator {
    grid: ParamGrid,
    source: SampleSource,
    remaining: usize,
}

impl SampledEnumerator {
    /// Callers guarantee a valid grid with `total > cap`.
    pub fn new(grid: ParamGrid, cap: usize, seed: u64) -> Self {
        let mut rng = RngHierarchy::new(seed).rng_for("grid_sample", 0);
        let source = match grid.total() {
            Some(total) => {
                let mut indices = floyd_sample(&mut rng, total, cap);
                indices.shuffle(&mut rng);
                SampleSource::Indices(indices.into_iter())
            }
            None => SampleSource::Digits {
                rng,
                seen: HashSet::with_capacity(cap),
            },
        };
        Self {
            grid,
            source,
            remaining: cap,
        }
    }
}

/// Floyd's algorithm: `k` distinct values from `[0, n)` in O(k) memory.
///
/// Returned in insertion order, which is deterministic for a given RNG.
fn floyd_sample<R: Rng + ?Sized>(rng: &mut R, n: u128, k: usize) -> Vec<u128> {
    let k = (k as u128).min(n);
    let mut chosen = HashSet::with_capacity(k as usize);
    let mut order = Vec::with_capacity(k as usize);
    for j in (n - k)..n {
        let t = rng.gen_range(0..=j);
        let pick = if chosen.contains(&t) { j } else { t };
        chosen.insert(pick);
        order.push(pick);
    }
    order
}

impl Iterator for SampledEnumerator {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<ParameterSet> {
        if self.remaining == 0 {
            return None;
        }
        let set = match &mut self.source {
            SampleSource::Indices(iter) => self.grid.decode(iter.next()?),
            SampleSource::Digits { rng, seen } => loop {
                let digits: Vec<usize> = self
                    .grid
                    .axes()
                    .iter()
                    .map(|a| rng.gen_range(0..a.values.len()))
                    .collect();
                if seen.insert(digits.clone()) {
                    break self.grid.assemble(&digits);
                }
            },
        };
        self.remaining -= 1;
        Some(set)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

// ─── Random ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Sampler {
    Ranges(ParamRanges),
    Grid(ParamGrid),
}

/// `n_iterations` independent draws. Repeats are possible; the optimizer
/// skips them.
#[derive(Debug, Clone)]
pub struct RandomEnumerator {
    sampler: Sampler,
    rng: StdRng,
    remaining: usize,
}

impl RandomEnumerator {
    pub fn new(space: ParamSpace, n_iterations: usize, seed: u64) -> Self {
        let sampler = match space {
            ParamSpace::Ranges(r) => Sampler::Ranges(r),
            ParamSpace::Grid(g) => Sampler::Grid(g),
        };
        Self {
            sampler,
            rng: RngHierarchy::new(seed).rng_for("random_search", 0),
            remaining: n_iterations,
        }
    }
}

impl Iterator for RandomEnumerator {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<ParameterSet> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(match &self.sampler {
            Sampler::Ranges(r) => r.sample(&mut self.rng),
            Sampler::Grid(g) => g.sample(&mut self.rng),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

// ─── Enumerator ──────────────────────────────────────────────────────

/// Any of the three enumerators.
#[derive(Debug, Clone)]
pub enum Enumerator {
    Exact(ExactEnumerator),
    Sampled(SampledEnumerator),
    Random(RandomEnumerator),
}

impl Enumerator {
    /// Exact when the grid fits within `cap`, otherwise sampled.
    pub fn for_grid(grid: ParamGrid, cap: usize, seed: u64) -> Result<Self, ConfigError> {
        grid.validate()?;
        if cap == 0 {
            return Err(ConfigError::InvalidSetting("cap must be at least 1".into()));
        }
        Ok(match grid.total() {
            Some(total) if total <= cap as u128 => Self::Exact(ExactEnumerator::new(grid)),
            _ => Self::Sampled(SampledEnumerator::new(grid, cap, seed)),
        })
    }

    pub fn random(space: ParamSpace, n_iterations: usize, seed: u64) -> Result<Self, ConfigError> {
        space.validate()?;
        if n_iterations == 0 {
            return Err(ConfigError::InvalidSetting(
                "n_iterations must be at least 1".into(),
            ));
        }
        Ok(Self::Random(RandomEnumerator::new(space, n_iterations, seed)))
    }

    pub fn kind(&self) -> EnumeratorKind {
        match self {
            Self::Exact(_) => EnumeratorKind::Exact,
            Self::Sampled(_) => EnumeratorKind::Sampled,
            Self::Random(_) => EnumeratorKind::Random,
        }
    }

    /// Size of the underlying grid; None for ranges or when it overflows.
    pub fn space_size(&self) -> Option<u128> {
        match self {
            Self::Exact(e) => e.grid.total(),
            Self::Sampled(s) => s.grid.total(),
            Self::Random(r) => match &r.sampler {
                Sampler::Grid(g) => g.total(),
                Sampler::Ranges(_) => None,
            },
        }
    }

    /// How many combinations remain to be yielded.
    pub fn planned(&self) -> usize {
        self.size_hint().0
    }
}

impl Iterator for Enumerator {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<ParameterSet> {
        match self {
            Self::Exact(e) => e.next(),
            Self::Sampled(s) => s.next(),
            Self::Random(r) => r.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Exact(e) => e.size_hint(),
            Self::Sampled(s) => s.size_hint(),
            Self::Random(r) => r.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x3() -> ParamGrid {
        ParamGrid::new()
            .with_values("a", [1, 2])
            .with_values("b", ["x", "y", "z"])
    }

    #[test]
    fn exact_yields_odometer_order() {
        let sets: Vec<String> = ExactEnumerator::new(grid_2x3())
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            sets,
            vec!["a=1, b=x", "a=1, b=y", "a=1, b=z", "a=2, b=x", "a=2, b=y", "a=2, b=z"]
        );
    }

    #[test]
    fn for_grid_picks_exact_within_cap() {
        let e = Enumerator::for_grid(grid_2x3(), 6, 0).unwrap();
        assert_eq!(e.kind(), EnumeratorKind::Exact);
        assert_eq!(e.planned(), 6);
        assert_eq!(e.space_size(), Some(6));
    }

    #[test]
    fn for_grid_samples_above_cap() {
        let e = Enumerator::for_grid(grid_2x3(), 4, 9).unwrap();
        assert_eq!(e.kind(), EnumeratorKind::Sampled);
        let sets: Vec<ParameterSet> = e.collect();
        assert_eq!(sets.len(), 4);
        let unique: HashSet<_> = sets.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn floyd_returns_distinct_in_range() {
        let mut rng = RngHierarchy::new(5).rng_for("t", 0);
        let picks = floyd_sample(&mut rng, 100, 100);
        let unique: HashSet<_> = picks.iter().copied().collect();
        assert_eq!(unique.len(), 100);
        assert!(picks.iter().all(|&p| p < 100));
    }

    #[test]
    fn sampled_handles_overflowing_product() {
        let mut grid = ParamGrid::new();
        for i in 0..40 {
            grid.push(format!("p{i}"), 0..10_000i64);
        }
        let e = Enumerator::for_grid(grid, 25, 3).unwrap();
        assert_eq!(e.kind(), EnumeratorKind::Sampled);
        assert_eq!(e.space_size(), None);
        let sets: Vec<ParameterSet> = e.collect();
        assert_eq!(sets.len(), 25);
        assert_eq!(sets.iter().collect::<HashSet<_>>().len(), 25);
        assert_eq!(sets[0].len(), 40);
    }

    #[test]
    fn random_draws_are_reproducible() {
        let space = ParamSpace::Ranges(ParamRanges::new().with_int("n", 1, 1000).with_float("x", 0.0, 1.0));
        let a: Vec<_> = Enumerator::random(space.clone(), 20, 42).unwrap().collect();
        let b: Vec<_> = Enumerator::random(space.clone(), 20, 42).unwrap().collect();
        let c: Vec<_> = Enumerator::random(space, 20, 43).unwrap().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn rejects_zero_budget() {
        assert!(Enumerator::for_grid(grid_2x3(), 0, 0).is_err());
        assert!(Enumerator::random(ParamSpace::Grid(grid_2x3()), 0, 0).is_err());
    }

    #[test]
    fn rejects_invalid_space() {
        assert!(matches!(
            Enumerator::for_grid(ParamGrid::new(), 10, 0),
            Err(ConfigError::EmptySpace)
        ));
    }
}
