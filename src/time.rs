use hifitime::Epoch;
use std::fmt;

use crate::{constants::HjdDay, selection::parse::SelectorParseError};

/// A calendar date of the observing log, matched at day resolution.
///
/// Construction validates the date against the Gregorian calendar, so `20150230` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObsDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl ObsDate {
    /// Build a validated date.
    ///
    /// Arguments
    /// ---------
    /// * `year`, `month`, `day`: Gregorian calendar components
    ///
    /// Return
    /// ------
    /// * the date, or [`SelectorParseError::InvalidDate`] if the components do not form a real day
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, SelectorParseError> {
        Epoch::maybe_from_gregorian_utc(year, month, day, 12, 0, 0, 0)
            .map_err(|_| SelectorParseError::InvalidDate(format!("{year:04}{month:02}{day:02}")))?;
        Ok(ObsDate { year, month, day })
    }

    /// The 8-digit `YYYYMMDD` form used for matching.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    // Noon keeps day arithmetic away from leap-second boundaries.
    fn noon_mjd(&self) -> f64 {
        Epoch::from_gregorian_utc_at_noon(self.year, self.month, self.day).to_mjd_utc_days()
    }

    /// Every calendar day from `self` through `end`, both inclusive.
    ///
    /// Return
    /// ------
    /// * an empty vector when `end` precedes `self`
    pub fn days_through(&self, end: &ObsDate) -> Vec<ObsDate> {
        let start_mjd = self.noon_mjd();
        let n_days = (end.noon_mjd() - start_mjd).round() as i64;

        (0..=n_days)
            .map(|k| {
                let (year, month, day, ..) =
                    Epoch::from_mjd_utc(start_mjd + k as f64).to_gregorian_utc();
                ObsDate { year, month, day }
            })
            .collect()
    }
}

impl fmt::Display for ObsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact())
    }
}

/// Whole heliocentric day of a heliocentric time value, truncated toward zero.
#[inline]
pub fn hjd_day(hjd: f64) -> HjdDay {
    hjd.trunc() as HjdDay
}
