//! The consumption aggregation pipeline.
//!
//! Takes irregular cumulative meter readings and a date range and produces a
//! gap-free daily consumption series plus summary statistics: period total,
//! peak day, monthly means, and a weekday/weekend split.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// A single meter reading: timestamp plus the cumulative register value.
///
/// The register is a running total, so the difference between two readings
/// approximates the volume used in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Consumption attributed to one calendar date.
///
/// `has_data` is false for dates inside the requested range that had no
/// readings at all; their consumption is reported as zero, matching the
/// historical reports, but stays distinguishable from a genuine
/// zero-consumption day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyConsumption {
    pub date: NaiveDate,
    pub consumption: f64,
    pub has_data: bool,
}

/// Mean daily consumption for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub year: i32,
    pub month: u32,
    pub mean: f64,
}

impl MonthlyMean {
    /// Month label in the `MM/YYYY` form the reports use.
    pub fn label(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }
}

/// Total consumption split into weekday and weekend days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeeklySplit {
    pub weekday: f64,
    pub weekend: f64,
}

impl WeeklySplit {
    pub fn total(&self) -> f64 {
        self.weekday + self.weekend
    }
}

/// Weekday/weekend classification of a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DayClass {
    Weekday,
    Weekend,
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("no readings between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Saturday and Sunday count as weekend (ISO weekday index 5 and 6).
pub fn classify_weekday(date: NaiveDate) -> DayClass {
    if date.weekday().num_days_from_monday() >= 5 {
        DayClass::Weekend
    } else {
        DayClass::Weekday
    }
}

/// Sorts readings ascending by timestamp.
///
/// The sort is stable, so readings sharing a timestamp keep their input
/// order. Rows with unparsable fields never reach this point; the parser
/// drops them.
pub fn normalize(mut readings: Vec<Reading>) -> Vec<Reading> {
    readings.sort_by_key(|r| r.timestamp);
    readings
}

/// Retains only readings whose date component lies within `[start, end]`.
pub fn filter_range(readings: &[Reading], start: NaiveDate, end: NaiveDate) -> Vec<Reading> {
    readings
        .iter()
        .filter(|r| {
            let date = r.timestamp.date();
            date >= start && date <= end
        })
        .cloned()
        .collect()
}

/// Computes per-date consumption as last minus first reading of the day.
///
/// Readings must already be sorted by timestamp. A date with a single
/// reading yields 0 since no intra-day delta is observable. The register is
/// assumed non-decreasing within a day; a decrease is kept as a negative
/// delta and surfaced as a warning, with no correction applied.
pub fn daily_deltas(readings: &[Reading]) -> BTreeMap<NaiveDate, f64> {
    let mut bounds: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for r in readings {
        bounds
            .entry(r.timestamp.date())
            .and_modify(|(_, last)| *last = r.value)
            .or_insert((r.value, r.value));
    }

    let mut deltas = BTreeMap::new();
    for (date, (first, last)) in bounds {
        let delta = last - first;
        if delta < 0.0 {
            warn!(%date, delta, "meter register decreased within the day");
        }
        deltas.insert(date, delta);
    }
    deltas
}

/// Expands the delta map to one entry per date in `[start, end]` inclusive.
///
/// Dates without readings get a zero fill with `has_data = false`.
pub fn fill_range(
    deltas: &BTreeMap<NaiveDate, f64>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyConsumption> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| match deltas.get(&date) {
            Some(&consumption) => DailyConsumption {
                date,
                consumption,
                has_data: true,
            },
            None => DailyConsumption {
                date,
                consumption: 0.0,
                has_data: false,
            },
        })
        .collect()
}

/// Sums per-day deltas into weekday and weekend buckets.
///
/// Works on the reading set directly, not on the filled series; the per-day
/// delta is the same in both paths, so the split totals re-sum to the sum
/// of all deltas.
pub fn weekly_split(readings: &[Reading]) -> WeeklySplit {
    split_by_class(&daily_deltas(readings))
}

fn split_by_class(deltas: &BTreeMap<NaiveDate, f64>) -> WeeklySplit {
    let mut split = WeeklySplit::default();
    for (date, delta) in deltas {
        match classify_weekday(*date) {
            DayClass::Weekday => split.weekday += delta,
            DayClass::Weekend => split.weekend += delta,
        }
    }
    split
}

/// Groups the daily series by calendar month and averages each group.
///
/// Zero-filled days participate in the average, as in the historical
/// reports. Output is chronological.
pub fn monthly_means(daily: &[DailyConsumption]) -> Vec<MonthlyMean> {
    let mut groups: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();

    for day in daily {
        let entry = groups
            .entry((day.date.year(), day.date.month()))
            .or_insert((0.0, 0));
        entry.0 += day.consumption;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((year, month), (sum, count))| MonthlyMean {
            year,
            month,
            mean: sum / count as f64,
        })
        .collect()
}

/// Stable argmax over the daily series: the first date with the maximum
/// consumption wins ties.
///
/// Returns `None` when the series carries no real readings (all entries are
/// zero fills), so callers report "no data" instead of a fabricated peak.
pub fn peak_day(daily: &[DailyConsumption]) -> Option<DailyConsumption> {
    if !daily.iter().any(|d| d.has_data) {
        return None;
    }

    let mut best: Option<&DailyConsumption> = None;
    for day in daily {
        match best {
            None => best = Some(day),
            Some(b) if day.consumption > b.consumption => best = Some(day),
            _ => {}
        }
    }
    best.cloned()
}

/// Sum over the filled series, zero fills included.
pub fn total_consumption(daily: &[DailyConsumption]) -> f64 {
    daily.iter().map(|d| d.consumption).sum()
}

/// Arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// All derived outputs of one pipeline invocation over a reading set and a
/// requested date range.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumptionReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily: Vec<DailyConsumption>,
    pub total: f64,
    pub peak: Option<DailyConsumption>,
    pub monthly: Vec<MonthlyMean>,
    pub split: WeeklySplit,
}

impl ConsumptionReport {
    /// Runs the whole pipeline: sort, filter to range, daily deltas, gap
    /// fill, and the summary statistics.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidRange`] when `start > end` and
    /// [`AggregateError::EmptyRange`] when no reading falls inside the
    /// range, so downstream consumers never take a max over nothing.
    pub fn compute(
        readings: Vec<Reading>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, AggregateError> {
        if start > end {
            return Err(AggregateError::InvalidRange { start, end });
        }

        let readings = normalize(readings);
        let in_range = filter_range(&readings, start, end);
        if in_range.is_empty() {
            return Err(AggregateError::EmptyRange { start, end });
        }

        let deltas = daily_deltas(&in_range);
        let daily = fill_range(&deltas, start, end);

        Ok(Self {
            start,
            end,
            total: total_consumption(&daily),
            peak: peak_day(&daily),
            monthly: monthly_means(&daily),
            split: split_by_class(&deltas),
            daily,
        })
    }
}
