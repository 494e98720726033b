//! Jalali (Solar Hijri) calendar conversion.
//!
//! Workshop users enter report ranges as Jalali `YYYY/MM/DD` dates while the
//! spreadsheet date column holds Gregorian dates. Conversion follows the
//! break-year arithmetic of the Jalaali algorithm, which is exact for Jalali
//! years -61 through 3177.

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::{
    data::normalize_digits,
    error::{EngineError, EngineResult},
};

const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

fn jalali_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(-?\d{1,4})\s*/\s*(\d{1,2})\s*/\s*(\d{1,2})\s*$")
            .expect("static Jalali date pattern")
    })
}

struct YearInfo {
    gregorian_year: i32,
    /// Day of March on which Farvardin 1 falls.
    march_day: i32,
    /// Zero for Jalali leap years.
    leap: i32,
}

fn year_info(jy: i32) -> Option<YearInfo> {
    if jy < BREAKS[0] || jy >= BREAKS[BREAKS.len() - 1] {
        return None;
    }
    let gy = jy + 621;
    let mut leap_j = -14;
    let mut jp = BREAKS[0];
    let mut jump = 0;
    for &jm in &BREAKS[1..] {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + (jump % 33) / 4;
        jp = jm;
    }
    let mut n = jy - jp;
    leap_j += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }
    let leap_g = gy / 4 - (gy / 100 + 1) * 3 / 4 - 150;
    let march_day = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }
    Some(YearInfo {
        gregorian_year: gy,
        march_day,
        leap,
    })
}

fn year_start(info: &YearInfo) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(info.gregorian_year, 3, u32::try_from(info.march_day).ok()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

impl JalaliDate {
    pub fn new(year: i32, month: u32, day: u32) -> EngineResult<Self> {
        let text = format!("{year:04}/{month:02}/{day:02}");
        let info = year_info(year)
            .ok_or_else(|| EngineError::invalid_date(&text, "year outside the supported range"))?;
        if !(1..=12).contains(&month) {
            return Err(EngineError::invalid_date(&text, "month must be 1-12"));
        }
        let month_len = match month {
            1..=6 => 31,
            7..=11 => 30,
            _ if info.leap == 0 => 30,
            _ => 29,
        };
        if day == 0 || day > month_len {
            return Err(EngineError::invalid_date(
                &text,
                format!("day must be 1-{month_len} for month {month}"),
            ));
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_leap_year(year: i32) -> bool {
        year_info(year).is_some_and(|info| info.leap == 0)
    }

    pub fn to_gregorian(&self) -> EngineResult<NaiveDate> {
        let info = year_info(self.year)
            .ok_or_else(|| EngineError::invalid_date(self.to_string(), "unsupported year"))?;
        let month = self.month as i32;
        let offset = (month - 1) * 31 - (month / 7) * (month - 7) + self.day as i32 - 1;
        year_start(&info)
            .and_then(|start| start.checked_add_days(Days::new(offset as u64)))
            .ok_or_else(|| EngineError::invalid_date(self.to_string(), "date out of range"))
    }

    pub fn from_gregorian(date: NaiveDate) -> EngineResult<Self> {
        let out_of_range = || EngineError::invalid_date(date.to_string(), "date out of range");
        let mut jy = date.year() - 621;
        let info = year_info(jy).ok_or_else(out_of_range)?;
        let start = year_start(&info).ok_or_else(out_of_range)?;
        let mut k = (date - start).num_days() as i32;
        if k >= 0 {
            if k <= 185 {
                return Self::new(jy, (1 + k / 31) as u32, (k % 31 + 1) as u32);
            }
            k -= 186;
        } else {
            jy -= 1;
            k += 179;
            if info.leap == 1 {
                k += 1;
            }
        }
        Self::new(jy, (7 + k / 30) as u32, (k % 30 + 1) as u32)
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for JalaliDate {
    type Err = EngineError;

    /// Parses `YYYY/MM/DD`, accepting Persian and Arabic-Indic digits.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_digits(value);
        let captures = jalali_pattern()
            .captures(&normalized)
            .ok_or_else(|| EngineError::invalid_date(value, "expected YYYY/MM/DD"))?;
        let field = |idx: usize| {
            captures[idx]
                .parse::<i64>()
                .map_err(|_| EngineError::invalid_date(value, "expected YYYY/MM/DD"))
        };
        let (year, month, day) = (field(1)?, field(2)?, field(3)?);
        JalaliDate::new(year as i32, month as u32, day as u32)
            .map_err(|_| EngineError::invalid_date(value, "no such Jalali date"))
    }
}

/// Inclusive Gregorian date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Converts a Jalali `[start, end]` range into a Gregorian interval.
///
/// Both bounds absent (or blank) means "no date restriction" and yields
/// `Ok(None)`. Supplying only one bound is an error.
pub fn convert_range(start: Option<&str>, end: Option<&str>) -> EngineResult<Option<DateInterval>> {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());
    match (start, end) {
        (None, None) => Ok(None),
        (Some(only), None) | (None, Some(only)) => Err(EngineError::invalid_date(
            only,
            "start and end dates must be supplied together",
        )),
        (Some(start), Some(end)) => {
            let from = start.parse::<JalaliDate>()?.to_gregorian()?;
            let to = end.parse::<JalaliDate>()?.to_gregorian()?;
            if from > to {
                return Err(EngineError::invalid_date(
                    format!("{start}..{end}"),
                    "start date is after end date",
                ));
            }
            Ok(Some(DateInterval {
                start: from,
                end: to,
            }))
        }
    }
}
