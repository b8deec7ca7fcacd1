//! Normalization applied by every provider before a series is built:
//! drop void and non-positive bars, sort by date, dedupe (first wins).

use chrono::NaiveDate;
use tracing::debug;

use super::provider::DataError;
use crate::domain::{PriceBar, PriceSeries};

/// What normalization removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub dropped_invalid: usize,
    pub dropped_duplicates: usize,
    /// Kept bars whose high/low do not bracket open and close.
    pub inconsistent_ranges: usize,
}

/// Sort, dedupe and clean raw bars.
///
/// Bars with a NaN price or a non-positive/non-finite close are dropped
/// first. The sort is stable, so among bars sharing a date the one that
/// appeared first in the input is kept.
pub fn normalize(bars: Vec<PriceBar>) -> (Vec<PriceBar>, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let before = bars.len();

    let mut bars: Vec<PriceBar> = bars
        .into_iter()
        .filter(PriceBar::is_tradable)
        .collect();
    stats.dropped_invalid = before - bars.len();

    bars.sort_by_key(|b| b.date);
    let kept = bars.len();
    bars.dedup_by_key(|b| b.date);
    stats.dropped_duplicates = kept - bars.len();
    stats.inconsistent_ranges = bars.iter().filter(|b| !b.has_consistent_range()).count();

    (bars, stats)
}

/// Normalize raw bars, keep `[start, end]`, and validate into a series.
pub fn build_series(
    symbol: &str,
    bars: Vec<PriceBar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataError> {
    let (bars, stats) = normalize(bars);
    if stats != NormalizeStats::default() {
        debug!(
            symbol,
            dropped_invalid = stats.dropped_invalid,
            dropped_duplicates = stats.dropped_duplicates,
            inconsistent_ranges = stats.inconsistent_ranges,
            "normalized raw bars"
        );
    }

    let bars: Vec<PriceBar> = bars
        .into_iter()
        .filter(|b| b.date >= start && b.date <= end)
        .collect();
    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }
    Ok(PriceSeries::new(symbol, bars)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn sorts_and_dedupes_first_wins() {
        let raw = vec![
            PriceBar::flat(day(3), 30.0),
            PriceBar::flat(day(1), 10.0),
            PriceBar::flat(day(3), 99.0),
            PriceBar::flat(day(2), 20.0),
        ];
        let (bars, stats) = normalize(raw);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 20.0, 30.0]);
        assert_eq!(stats.dropped_duplicates, 1);
        assert_eq!(stats.dropped_invalid, 0);
    }

    #[test]
    fn drops_void_and_non_positive() {
        let raw = vec![
            PriceBar::flat(day(1), 10.0),
            PriceBar::flat(day(2), f64::NAN),
            PriceBar::flat(day(3), 0.0),
            PriceBar::flat(day(4), -5.0),
            PriceBar::flat(day(5), 12.0),
        ];
        let (bars, stats) = normalize(raw);
        assert_eq!(bars.len(), 2);
        assert_eq!(stats.dropped_invalid, 3);
    }

    #[test]
    fn inconsistent_ranges_are_counted_not_dropped() {
        let mut odd = PriceBar::flat(day(2), 20.0);
        odd.high = 15.0;
        let (bars, stats) = normalize(vec![PriceBar::flat(day(1), 10.0), odd]);
        assert_eq!(bars.len(), 2);
        assert_eq!(stats.inconsistent_ranges, 1);
    }

    #[test]
    fn build_series_filters_window() {
        let raw = (1..=9).map(|d| PriceBar::flat(day(d), d as f64)).collect();
        let series = build_series("X", raw, day(4), day(6)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), day(4));
    }

    #[test]
    fn build_series_empty_window_is_no_data() {
        let raw = vec![PriceBar::flat(day(1), 1.0)];
        let err = build_series("X", raw, day(10), day(12)).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }
}
