//! Property tests for the combination enumerators.
//!
//! - Exact: yields the full product once each, odometer order
//! - Sampled: `cap` distinct grid points, reproducible per seed
//! - Random: `n` draws inside the bounds, reproducible per seed

use std::collections::HashSet;

use proptest::prelude::*;
use sweeplab_core::ParameterSet;
use sweeplab_runner::{Enumerator, EnumeratorKind, ParamGrid, ParamRange, ParamRanges, ParamSpace};

/// Axis sizes for a small grid; values are `0..size` per axis.
fn grid_from_sizes(sizes: &[usize]) -> ParamGrid {
    sizes.iter().enumerate().fold(ParamGrid::new(), |grid, (i, &n)| {
        grid.with_values(format!("p{i}"), (0..n as i64).collect::<Vec<_>>())
    })
}

fn digits(set: &ParameterSet) -> Vec<i64> {
    set.iter().map(|(_, v)| v.as_i64().unwrap()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn exact_yields_product_in_odometer_order(sizes in prop::collection::vec(1usize..5, 1..4)) {
        let grid = grid_from_sizes(&sizes);
        let total: usize = sizes.iter().product();
        let sets: Vec<ParameterSet> = Enumerator::for_grid(grid, total, 0).unwrap().collect();

        prop_assert_eq!(sets.len(), total);
        let tuples: Vec<Vec<i64>> = sets.iter().map(digits).collect();
        let mut sorted = tuples.clone();
        sorted.sort();
        // Values equal their positions, so odometer order is lexicographic.
        prop_assert_eq!(&tuples, &sorted);
        prop_assert_eq!(tuples.iter().collect::<HashSet<_>>().len(), total);
    }

    #[test]
    fn sampled_is_distinct_and_reproducible(
        sizes in prop::collection::vec(2usize..8, 2..5),
        cap_fraction in 0.05f64..0.9,
        seed in any::<u64>(),
    ) {
        let total: usize = sizes.iter().product();
        let cap = ((total as f64 * cap_fraction) as usize).clamp(1, total - 1);
        let grid = grid_from_sizes(&sizes);

        let first = Enumerator::for_grid(grid.clone(), cap, seed).unwrap();
        prop_assert_eq!(first.kind(), EnumeratorKind::Sampled);
        prop_assert_eq!(first.planned(), cap);
        let a: Vec<ParameterSet> = first.collect();
        let b: Vec<ParameterSet> = Enumerator::for_grid(grid, cap, seed).unwrap().collect();

        prop_assert_eq!(a.len(), cap);
        prop_assert_eq!(a.iter().collect::<HashSet<_>>().len(), cap);
        prop_assert_eq!(&a, &b);
        for set in &a {
            for (value, &size) in digits(set).iter().zip(&sizes) {
                prop_assert!((*value as usize) < size);
            }
        }
    }

    #[test]
    fn random_draws_stay_in_bounds(
        lo in -50i64..50,
        span in 0i64..100,
        flo in -1.0f64..1.0,
        fspan in 0.0f64..2.0,
        n in 1usize..60,
        seed in any::<u64>(),
    ) {
        let ranges = ParamRanges::new()
            .with_int("i", lo, lo + span)
            .with_float("f", flo, flo + fspan);
        let space = ParamSpace::from(ranges);
        let a: Vec<ParameterSet> = Enumerator::random(space.clone(), n, seed).unwrap().collect();
        let b: Vec<ParameterSet> = Enumerator::random(space, n, seed).unwrap().collect();

        prop_assert_eq!(a.len(), n);
        prop_assert_eq!(&a, &b);
        for set in &a {
            let i = set.get_int("i").unwrap();
            let f = set.get_float("f").unwrap();
            prop_assert!(i >= lo && i <= lo + span);
            prop_assert!(f >= flo && f <= flo + fspan);
        }
    }
}

#[test]
fn grid_total_overflow_still_samples() {
    // 10^40 points: beyond u128.
    let mut grid = ParamGrid::new();
    for i in 0..40 {
        grid.push(format!("p{i}"), 0..10);
    }
    assert_eq!(grid.total(), None);

    let sets: Vec<ParameterSet> = Enumerator::for_grid(grid.clone(), 20, 1).unwrap().collect();
    assert_eq!(sets.len(), 20);
    assert_eq!(sets.iter().collect::<HashSet<_>>().len(), 20);
    let again: Vec<ParameterSet> = Enumerator::for_grid(grid, 20, 1).unwrap().collect();
    assert_eq!(sets, again);
}

#[test]
fn degenerate_float_range_yields_min() {
    let space = ParamSpace::from(ParamRanges::new().with_float("x", 0.25, 0.25));
    let draws: Vec<ParameterSet> = Enumerator::random(space, 5, 3).unwrap().collect();
    assert!(draws.iter().all(|s| s.get_float("x") == Some(0.25)));
}

#[test]
fn invalid_ranges_rejected() {
    let mut ranges = ParamRanges::new();
    ranges.push("x", ParamRange::Int { min: 5, max: 1 });
    assert!(Enumerator::random(ranges.into(), 5, 0).is_err());
}
