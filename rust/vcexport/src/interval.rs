//! Historical interval resolution.
//!
//! vCenter keeps performance history at fixed granularities. A requested
//! window in minutes maps onto exactly one tier; the sample count follows
//! from the window and the tier's sampling period by floor division.

use serde::Serialize;

use crate::error::{Error, Result};

/// vCenter historical statistics tiers, ordered by granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoricalInterval {
    RealTime,
    ShortTerm,
    MediumTerm,
    LongTerm,
    Historical,
}

impl HistoricalInterval {
    /// The interval id vCenter expects in query specs. For these tiers the
    /// id equals the sampling period in seconds.
    pub fn interval_id(&self) -> u32 {
        self.period_secs()
    }

    /// Sampling period in seconds.
    pub fn period_secs(&self) -> u32 {
        match self {
            HistoricalInterval::RealTime => 20,
            HistoricalInterval::ShortTerm => 300,
            HistoricalInterval::MediumTerm => 1800,
            HistoricalInterval::LongTerm => 7200,
            HistoricalInterval::Historical => 86400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoricalInterval::RealTime => "real-time",
            HistoricalInterval::ShortTerm => "short-term",
            HistoricalInterval::MediumTerm => "medium-term",
            HistoricalInterval::LongTerm => "long-term",
            HistoricalInterval::Historical => "historical",
        }
    }
}

/// Resolved sampling parameters for one export run. Derived once from the
/// requested window and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalPolicy {
    pub window_minutes: u32,
    pub interval: HistoricalInterval,
    pub period_secs: u32,
    pub sample_count: u32,
}

impl IntervalPolicy {
    /// Resolve a requested window to a tier and sample count.
    ///
    /// First matching upper bound wins; sample count is
    /// `floor(window_secs / period_secs)` with a minimum of 1. A zero
    /// window is a configuration error.
    pub fn resolve(window_minutes: u32) -> Result<Self> {
        if window_minutes == 0 {
            return Err(Error::Config(
                "performance window must be a positive number of minutes".to_string(),
            ));
        }

        let interval = match window_minutes {
            0..=60 => HistoricalInterval::RealTime,
            61..=1440 => HistoricalInterval::ShortTerm,
            1441..=10080 => HistoricalInterval::MediumTerm,
            10081..=43200 => HistoricalInterval::LongTerm,
            _ => HistoricalInterval::Historical,
        };

        let period_secs = interval.period_secs();
        // Widened so the largest representable window cannot overflow the
        // seconds product; the quotient is at most window/1440 and always
        // fits back into u32.
        let sample_count =
            ((u64::from(window_minutes) * 60 / u64::from(period_secs)).max(1)) as u32;

        Ok(Self {
            window_minutes,
            interval,
            period_secs,
            sample_count,
        })
    }
}
