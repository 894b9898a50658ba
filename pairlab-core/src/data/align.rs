//! Two-series time alignment.
//!
//! Inner join on timestamp: a bar survives only if both symbols have a finite
//! close at that exact timestamp. Nothing is forward-filled.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::debug;

use super::provider::{DataError, PriceSeries};
use crate::domain::{PairBar, PairSeries};

/// Align two raw close series on their common timestamps.
///
/// Duplicate timestamps within one series keep the last value seen. Rows with
/// a non-finite close on either side are dropped. Fails with
/// [`DataError::InsufficientData`] if no usable row remains.
pub fn align_pair(first: &PriceSeries, second: &PriceSeries) -> Result<PairSeries, DataError> {
    let left = index_by_time(first);
    let right = index_by_time(second);

    let bars: Vec<PairBar> = left
        .iter()
        .filter_map(|(ts, &p1)| right.get(ts).map(|&p2| PairBar::new(*ts, p1, p2)))
        .filter(|bar| !bar.is_void())
        .collect();

    debug!(
        asset1 = %first.symbol,
        asset2 = %second.symbol,
        raw1 = first.points.len(),
        raw2 = second.points.len(),
        aligned = bars.len(),
        "aligned pair"
    );

    if bars.is_empty() {
        return Err(DataError::InsufficientData(format!(
            "{} and {} share no complete rows",
            first.symbol, second.symbol
        )));
    }

    Ok(PairSeries::new(
        first.symbol.clone(),
        second.symbol.clone(),
        bars,
    )?)
}

fn index_by_time(series: &PriceSeries) -> BTreeMap<NaiveDateTime, f64> {
    series
        .points
        .iter()
        .map(|p| (p.timestamp, p.close))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::PricePoint;
    use chrono::NaiveDate;

    fn series(symbol: &str, rows: &[(u32, f64)]) -> PriceSeries {
        let points = rows
            .iter()
            .map(|&(minute, close)| PricePoint {
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(0, minute, 0)
                    .unwrap(),
                close,
            })
            .collect();
        PriceSeries::new(symbol, points)
    }

    #[test]
    fn inner_join_keeps_common_timestamps() {
        let a = series("BTC", &[(0, 100.0), (5, 101.0), (10, 102.0)]);
        let b = series("ETH", &[(0, 50.0), (10, 52.0), (15, 53.0)]);

        let pair = align_pair(&a, &b).unwrap();

        assert_eq!(pair.len(), 2);
        assert_eq!(pair.prices1(), vec![100.0, 102.0]);
        assert_eq!(pair.prices2(), vec![50.0, 52.0]);
        assert_eq!(pair.asset1, "BTC");
        assert_eq!(pair.asset2, "ETH");
    }

    #[test]
    fn drops_rows_with_missing_value_on_either_side() {
        let a = series("BTC", &[(0, 100.0), (5, f64::NAN), (10, 102.0)]);
        let b = series("ETH", &[(0, f64::NAN), (5, 51.0), (10, 52.0)]);

        let pair = align_pair(&a, &b).unwrap();
        assert_eq!(pair.len(), 1);
        assert_eq!(pair.prices1(), vec![102.0]);
    }

    #[test]
    fn unsorted_input_comes_out_sorted() {
        let a = series("BTC", &[(10, 3.0), (0, 1.0), (5, 2.0)]);
        let b = series("ETH", &[(5, 20.0), (10, 30.0), (0, 10.0)]);

        let pair = align_pair(&a, &b).unwrap();
        assert_eq!(pair.prices1(), vec![1.0, 2.0, 3.0]);
        assert_eq!(pair.prices2(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn duplicate_timestamp_keeps_last() {
        let a = series("BTC", &[(0, 1.0), (0, 1.5)]);
        let b = series("ETH", &[(0, 10.0)]);
        let pair = align_pair(&a, &b).unwrap();
        assert_eq!(pair.prices1(), vec![1.5]);
    }

    #[test]
    fn disjoint_series_is_insufficient_data() {
        let a = series("BTC", &[(0, 1.0)]);
        let b = series("ETH", &[(5, 1.0)]);
        let err = align_pair(&a, &b).unwrap_err();
        assert!(matches!(err, DataError::InsufficientData(_)));
    }
}
