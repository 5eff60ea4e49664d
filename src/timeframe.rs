use std::{fmt, str::FromStr, time::Duration};

use tracing::info;

/// Lookback used whenever a time-frame token cannot be understood.
pub const DEFAULT_TIME_FRAME: Duration = Duration::from_secs(6 * 60 * 60);

/// Count used by the `digits`/`unit` form when `digits` is absent.
pub const DEFAULT_DIGITS: &str = "6";

/// Unit used by the `digits`/`unit` form when `unit` is absent.
pub const DEFAULT_UNIT: &str = "m";

const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

// ---------------------------------------------------------------------------
// TimeUnit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn minutes(self) -> u64 {
        match self {
            TimeUnit::Minutes => 1,
            TimeUnit::Hours => MINUTES_PER_HOUR,
            TimeUnit::Days => MINUTES_PER_DAY,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            "d" => Ok(Self::Days),
            other => Err(format!("unknown time unit {other:?}, valid units are: m, h, d")),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// TimeFrame
// ---------------------------------------------------------------------------

/// How a [`TimeFrame`] was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The requested duration, unchanged.
    Exact,
    /// The input was malformed and [`DEFAULT_TIME_FRAME`] was substituted.
    Defaulted,
    /// The request exceeded the configured maximum and was capped to it.
    Clamped,
}

/// A resolved lookback window.
///
/// `digits` and `unit` record what the caller asked for and are only
/// meaningful for diagnostics; both are `None` when the input was malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFrame {
    pub duration: Duration,
    pub digits: Option<u64>,
    pub unit: Option<TimeUnit>,
    pub resolution: Resolution,
}

impl TimeFrame {
    fn defaulted() -> Self {
        Self {
            duration: DEFAULT_TIME_FRAME,
            digits: None,
            unit: None,
            resolution: Resolution::Defaulted,
        }
    }

    pub fn is_clamped(&self) -> bool {
        self.resolution == Resolution::Clamped
    }

    pub fn is_defaulted(&self) -> bool {
        self.resolution == Resolution::Defaulted
    }
}

// ---------------------------------------------------------------------------
// TimeFrameParser
// ---------------------------------------------------------------------------

/// Turns user-supplied time-frame specifiers into bounded [`TimeFrame`]s.
///
/// Malformed input never fails: it resolves to [`DEFAULT_TIME_FRAME`]. Input
/// exceeding `max_days` resolves to exactly `max_days` days. Both cases are
/// logged and reported through [`TimeFrame::resolution`].
#[derive(Debug, Clone, Copy)]
pub struct TimeFrameParser {
    max_days: u32,
}

impl TimeFrameParser {
    pub fn new(max_days: u32) -> Self {
        Self { max_days }
    }

    pub fn max_window(&self) -> Duration {
        minutes(self.max_minutes())
    }

    /// Parse a `<digits><unit>` token such as `"90m"`, `"5h"` or `"3d"`.
    pub fn parse(&self, token: &str) -> TimeFrame {
        let Some((digits, unit)) = split_token(token) else {
            info!(input = %token, "Invalid time frame, using default");
            return TimeFrame::defaulted();
        };
        self.resolve(token, digits, unit)
    }

    /// Parse a time frame given as separate `digits` and `unit` values,
    /// falling back to [`DEFAULT_DIGITS`] and [`DEFAULT_UNIT`] when absent.
    pub fn parse_parts(&self, digits: Option<&str>, unit: Option<&str>) -> TimeFrame {
        let digits = digits.unwrap_or(DEFAULT_DIGITS);
        let unit = unit.unwrap_or(DEFAULT_UNIT);
        self.resolve(&format!("{digits}{unit}"), digits, unit)
    }

    fn resolve(&self, input: &str, digits: &str, unit: &str) -> TimeFrame {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            info!(input = %input, "Invalid numeric value in time frame, using default");
            return TimeFrame::defaulted();
        }
        let Ok(count) = digits.parse::<u64>() else {
            info!(input = %input, "Time frame count out of range, using default");
            return TimeFrame::defaulted();
        };
        let unit = match unit.parse::<TimeUnit>() {
            Ok(unit) => unit,
            Err(e) => {
                info!(input = %input, reason = %e, "Invalid unit in time frame, using default");
                return TimeFrame::defaulted();
            }
        };

        let max_minutes = self.max_minutes();
        match count.checked_mul(unit.minutes()) {
            Some(requested) if requested <= max_minutes => TimeFrame {
                duration: minutes(requested),
                digits: Some(count),
                unit: Some(unit),
                resolution: Resolution::Exact,
            },
            _ => {
                info!(
                    digits = count,
                    unit = %unit,
                    max_days = self.max_days,
                    "Time frame exceeds maximum, returning max time frame"
                );
                TimeFrame {
                    duration: minutes(max_minutes),
                    digits: Some(count),
                    unit: Some(unit),
                    resolution: Resolution::Clamped,
                }
            }
        }
    }

    fn max_minutes(&self) -> u64 {
        u64::from(self.max_days) * MINUTES_PER_DAY
    }
}

/// Split `token` into its digit prefix and single trailing unit character.
fn split_token(token: &str) -> Option<(&str, &str)> {
    let (idx, _) = token.char_indices().last()?;
    if idx == 0 {
        return None;
    }
    Some(token.split_at(idx))
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}
