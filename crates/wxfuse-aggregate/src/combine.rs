//! Overlap-weighted combination rules per data point kind

use crate::{AggregateError, AggregateResult, IntervalDataPoints};
use tracing::debug;
use wxfuse_core::{DataPoint, DataPointValue, NumericValue, Quantity, TimeInterval};

/// Contributors with positive overlap, in map order, paired with their weight
fn weighted<'a>(
    target: &TimeInterval,
    data_points: &'a IntervalDataPoints,
) -> Vec<(f64, &'a DataPoint)> {
    data_points
        .iter()
        .filter_map(|(interval, dp)| {
            let weight = target.overlap_seconds(interval);
            (weight > 0.0).then_some((weight, dp))
        })
        .collect()
}

/// First contributor with the strictly largest weight
fn heaviest<'a, T>(contributors: &'a [(f64, T)]) -> Option<&'a (f64, T)> {
    contributors.iter().fold(None, |best, c| match best {
        Some(b) if b.0 >= c.0 => Some(b),
        _ => Some(c),
    })
}

/// Time-weighted average of `quantity_ave`, with min of mins and max of maxes
pub fn aggregate_numeric_data_points(
    target: &TimeInterval,
    data_points: &IntervalDataPoints,
) -> AggregateResult<DataPoint> {
    let contributors: Vec<(f64, &DataPoint, &NumericValue)> = weighted(target, data_points)
        .into_iter()
        .filter_map(|(w, dp)| match dp.as_numeric() {
            Some(v) if v.quantity_ave.magnitude.is_finite() => Some((w, dp, v)),
            _ => {
                debug!(source = %dp.source().id, "Skipping non-numeric contributor");
                None
            }
        })
        .collect();

    match contributors.as_slice() {
        [] => return Err(AggregateError::NoOverlap(*target)),
        [(_, dp, _)] => return Ok((*dp).clone()),
        _ => {}
    }

    let unit = contributors[0].2.quantity_ave.unit;
    let mut weight_sum = 0.0;
    let mut weighted_sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for (w, _, value) in &contributors {
        let value = value.to(unit)?;
        weight_sum += w;
        weighted_sum += value.quantity_ave.magnitude * w;
        min = min.min(value.min().magnitude);
        max = max.max(value.max().magnitude);
    }

    let pairs: Vec<(f64, &DataPoint)> = contributors.iter().map(|(w, dp, _)| (*w, *dp)).collect();
    let (_, lead) = heaviest(&pairs).ok_or(AggregateError::NoOverlap(*target))?;
    let source_datetime = pairs
        .iter()
        .map(|(_, dp)| dp.source_datetime)
        .max()
        .unwrap_or(lead.source_datetime);

    Ok(DataPoint::new(
        lead.station.clone(),
        source_datetime,
        DataPointValue::Numeric(NumericValue::with_range(
            Quantity::new(weighted_sum / weight_sum, unit),
            Quantity::new(min, unit),
            Quantity::new(max, unit),
        )),
    ))
}

/// True only when the true-weight strictly exceeds the false-weight
pub fn aggregate_boolean_data_points(
    target: &TimeInterval,
    data_points: &IntervalDataPoints,
) -> AggregateResult<DataPoint> {
    let contributors: Vec<(f64, &DataPoint, bool)> = weighted(target, data_points)
        .into_iter()
        .filter_map(|(w, dp)| dp.as_bool().map(|v| (w, dp, v)))
        .collect();
    if contributors.is_empty() {
        return Err(AggregateError::NoOverlap(*target));
    }

    let (true_weight, false_weight) =
        contributors
            .iter()
            .fold((0.0_f64, 0.0_f64), |(t, f), (w, _, v)| if *v { (t + w, f) } else { (t, f + w) });
    let result = true_weight > false_weight;

    let agreeing: Vec<(f64, &DataPoint)> = contributors
        .iter()
        .filter(|(_, _, v)| *v == result)
        .map(|(w, dp, _)| (*w, *dp))
        .collect();
    let (_, lead) = heaviest(&agreeing).ok_or(AggregateError::NoOverlap(*target))?;
    let source_datetime = agreeing
        .iter()
        .map(|(_, dp)| dp.source_datetime)
        .max()
        .unwrap_or(lead.source_datetime);

    Ok(DataPoint::boolean(lead.station.clone(), source_datetime, result))
}

/// Longest single overlap wins
pub fn aggregate_string_data_points(
    target: &TimeInterval,
    data_points: &IntervalDataPoints,
) -> AggregateResult<DataPoint> {
    longest_duration(target, data_points, |dp| dp.as_str().is_some())
}

/// Longest single overlap wins
pub fn aggregate_time_data_points(
    target: &TimeInterval,
    data_points: &IntervalDataPoints,
) -> AggregateResult<DataPoint> {
    longest_duration(target, data_points, |dp| dp.as_time().is_some())
}

fn longest_duration(
    target: &TimeInterval,
    data_points: &IntervalDataPoints,
    accepts: impl Fn(&DataPoint) -> bool,
) -> AggregateResult<DataPoint> {
    let contributors: Vec<(f64, &DataPoint)> = weighted(target, data_points)
        .into_iter()
        .filter(|(_, dp)| accepts(dp))
        .collect();
    heaviest(&contributors)
        .map(|(_, dp)| (*dp).clone())
        .ok_or(AggregateError::NoOverlap(*target))
}
