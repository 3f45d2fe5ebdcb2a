//! Multi-day forecast types and daily aggregation.
//!
//! The weather upstream reports 3-hourly samples. [`ForecastSet::from_samples`]
//! folds them into at most [`MAX_FORECAST_DAYS`] daily summaries, one per
//! distinct calendar date, ordered by date ascending.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of days in a [`ForecastSet`].
pub const MAX_FORECAST_DAYS: usize = 5;

/// A single 3-hourly forecast sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub condition: String,
    pub icon: String,
}

/// Summary of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Weekday name, e.g. "Monday".
    pub day_name: String,
    pub date: NaiveDate,
    /// Lowest minimum of the day, rounded to whole °C.
    pub min_temp: f64,
    /// Highest maximum of the day, rounded to whole °C.
    pub max_temp: f64,
    /// Most frequent condition of the day, title-cased.
    pub condition: String,
    /// Icon of the first sample of the day.
    pub icon: String,
}

/// Ordered daily forecast, at most [`MAX_FORECAST_DAYS`] entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastSet {
    days: Vec<ForecastDay>,
}

struct DayAccumulator {
    min_temp: f64,
    max_temp: f64,
    icon: String,
    // (condition, count) in first-seen order
    conditions: Vec<(String, usize)>,
}

impl DayAccumulator {
    fn new(sample: &ForecastSample) -> Self {
        Self {
            min_temp: sample.temp_min,
            max_temp: sample.temp_max,
            icon: sample.icon.clone(),
            conditions: vec![(sample.condition.clone(), 1)],
        }
    }

    fn add(&mut self, sample: &ForecastSample) {
        self.min_temp = self.min_temp.min(sample.temp_min);
        self.max_temp = self.max_temp.max(sample.temp_max);
        match self
            .conditions
            .iter_mut()
            .find(|(condition, _)| *condition == sample.condition)
        {
            Some((_, count)) => *count += 1,
            None => self.conditions.push((sample.condition.clone(), 1)),
        }
    }

    fn dominant_condition(&self) -> &str {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.conditions {
            // strict > keeps the first-seen condition on ties
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(condition, _)| condition.as_str()).unwrap_or("")
    }
}

impl ForecastSet {
    /// Aggregate samples into daily summaries.
    ///
    /// Dates are computed in `offset` (the city's UTC offset). Samples may
    /// arrive in any order; the first sample of a day (by timestamp) supplies
    /// its icon.
    pub fn from_samples(samples: &[ForecastSample], offset: FixedOffset) -> Self {
        let mut ordered: Vec<&ForecastSample> = samples.iter().collect();
        ordered.sort_by_key(|s| s.timestamp);

        let mut by_date: BTreeMap<NaiveDate, (String, DayAccumulator)> = BTreeMap::new();
        for sample in ordered {
            let local = sample.timestamp.with_timezone(&offset);
            let date = local.date_naive();
            by_date
                .entry(date)
                .and_modify(|(_, acc)| acc.add(sample))
                .or_insert_with(|| (local.format("%A").to_string(), DayAccumulator::new(sample)));
        }

        let days = by_date
            .into_iter()
            .take(MAX_FORECAST_DAYS)
            .map(|(date, (day_name, acc))| ForecastDay {
                day_name,
                date,
                min_temp: acc.min_temp.round(),
                max_temp: acc.max_temp.round(),
                condition: title_case(acc.dominant_condition()),
                icon: acc.icon,
            })
            .collect();

        Self { days }
    }

    /// Build a set from already-summarized days, enforcing ordering, one
    /// entry per date, and the day limit.
    pub fn from_days(mut days: Vec<ForecastDay>) -> Self {
        days.sort_by_key(|d| d.date);
        days.dedup_by_key(|d| d.date);
        days.truncate(MAX_FORECAST_DAYS);
        Self { days }
    }

    pub fn days(&self) -> &[ForecastDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Upper-case the first letter of every word, lower-case the rest.
pub(crate) fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn sample(hour_offset: i64, min: f64, max: f64, condition: &str, icon: &str) -> ForecastSample {
        // 2025-10-30 00:00 UTC is a Thursday
        let base = Utc.with_ymd_and_hms(2025, 10, 30, 0, 0, 0).unwrap();
        ForecastSample {
            timestamp: base + chrono::Duration::hours(hour_offset),
            temp_min: min,
            temp_max: max,
            condition: condition.to_string(),
            icon: icon.to_string(),
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn groups_samples_per_date() {
        let samples = vec![
            sample(0, 20.2, 25.0, "clear sky", "01d"),
            sample(3, 19.6, 28.4, "clear sky", "01d"),
            sample(6, 21.0, 30.6, "light rain", "10d"),
            sample(24, 18.0, 26.0, "light rain", "10d"),
        ];
        let set = ForecastSet::from_samples(&samples, utc());
        assert_eq!(set.len(), 2);

        let first = &set.days()[0];
        assert_eq!(first.day_name, "Thursday");
        assert_eq!(first.min_temp, 20.0);
        assert_eq!(first.max_temp, 31.0);
        assert_eq!(first.condition, "Clear Sky");
        assert_eq!(first.icon, "01d");
    }

    #[test]
    fn keeps_at_most_five_days() {
        let samples: Vec<_> = (0..7)
            .map(|day| sample(day * 24, 10.0, 20.0, "haze", "50d"))
            .collect();
        let set = ForecastSet::from_samples(&samples, utc());
        assert_eq!(set.len(), MAX_FORECAST_DAYS);
        assert!(set.days().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn condition_tie_keeps_first_seen() {
        let samples = vec![
            sample(0, 10.0, 20.0, "mist", "50d"),
            sample(3, 10.0, 20.0, "haze", "50d"),
        ];
        let set = ForecastSet::from_samples(&samples, utc());
        assert_eq!(set.days()[0].condition, "Mist");
    }

    #[test]
    fn offset_moves_late_samples_to_next_day() {
        // 21:00 UTC is 02:30 next day in IST
        let samples = vec![sample(0, 10.0, 20.0, "haze", "50d"), sample(21, 9.0, 19.0, "haze", "50n")];
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let set = ForecastSet::from_samples(&samples, ist);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn from_days_orders_and_dedups() {
        let day = |d: u32| ForecastDay {
            day_name: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 11, d).unwrap(),
            min_temp: 0.0,
            max_temp: 0.0,
            condition: String::new(),
            icon: String::new(),
        };
        let set = ForecastSet::from_days(vec![day(3), day(1), day(3), day(2)]);
        let dates: Vec<_> = set.days().iter().map(|d| d.date.day0() + 1).collect();
        assert_eq!(dates, vec![1, 2, 3]);
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("overcast clouds"), "Overcast Clouds");
        assert_eq!(title_case("LIGHT rain"), "Light Rain");
    }
}
