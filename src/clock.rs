// Copyright 2026 Vocab Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time sources and the calendar keys derived from them.
//!
//! Daily feed state is partitioned by `dateKey`, the calendar day in a fixed
//! reference offset (UTC+9 unless configured otherwise). Exposure rows are
//! stamped with the UTC day instead. Persisted timestamps use a fixed-width
//! UTC layout so that text ordering in SQLite matches chronological ordering.

use anyhow::Context;
use anyhow::Result;
use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::macros::offset;

pub const DEFAULT_REFERENCE_OFFSET: UtcOffset = offset!(+9);

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always reports the same instant. Backs the CLI `--now` flag.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// `YYYY-MM-DD` of `now` observed at `reference`.
pub fn date_key(now: OffsetDateTime, reference: UtcOffset) -> Result<String> {
    now.to_offset(reference)
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .context("format date key")
}

/// `YYYY-MM-DD` of `now` in UTC.
pub fn utc_day(now: OffsetDateTime) -> Result<String> {
    date_key(now, UtcOffset::UTC)
}

pub fn timestamp(now: OffsetDateTime) -> Result<String> {
    now.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
        ))
        .context("format timestamp")
}

pub fn parse_instant(text: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(text.trim(), &Rfc3339)
        .with_context(|| format!("parse RFC3339 instant {text:?}"))
}

/// Parses `+HH:MM` / `-HH:MM`.
pub fn parse_offset(text: &str) -> Option<UtcOffset> {
    UtcOffset::parse(
        text.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .ok()
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;
    use std::sync::PoisonError;

    use time::Duration;
    use time::OffsetDateTime;

    use super::Clock;

    /// Advances by `step` on every read, so consecutive writes get distinct
    /// timestamps.
    pub struct SteppingClock {
        next: Mutex<OffsetDateTime>,
        step: Duration,
    }

    impl SteppingClock {
        pub fn new(start: OffsetDateTime, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> OffsetDateTime {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let current = *next;
            *next = current + self.step;
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn date_key_uses_reference_offset() -> Result<()> {
        // 15:30 UTC is already the next day in Seoul.
        let now = datetime!(2026-03-01 15:30 UTC);
        assert_eq!(date_key(now, DEFAULT_REFERENCE_OFFSET)?, "2026-03-02");
        assert_eq!(utc_day(now)?, "2026-03-01");
        Ok(())
    }

    #[test]
    fn timestamps_are_fixed_width_utc() -> Result<()> {
        let a = timestamp(datetime!(2026-03-01 09:00:00 +09:00))?;
        let b = timestamp(datetime!(2026-03-01 00:00:00.5 UTC))?;
        assert_eq!(a, "2026-03-01T00:00:00.000000Z");
        assert_eq!(b, "2026-03-01T00:00:00.500000Z");
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn parses_offsets_and_instants() -> Result<()> {
        assert_eq!(parse_offset("+09:00"), Some(DEFAULT_REFERENCE_OFFSET));
        assert_eq!(parse_offset("-05:30"), UtcOffset::from_hms(-5, -30, 0).ok());
        assert_eq!(parse_offset("seoul"), None);
        let instant = parse_instant("2026-03-01T00:00:00Z")?;
        assert_eq!(instant, datetime!(2026-03-01 00:00 UTC));
        assert!(parse_instant("yesterday").is_err());
        Ok(())
    }
}
