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

//! Append-only record of words shown to the user, partitioned by UTC day.

use anyhow::Context;
use anyhow::Result;
use rusqlite::params;

use crate::clock;
use crate::clock::Clock;
use crate::store::Store;

pub const DEFAULT_EXPOSURE_LIMIT: usize = 50;

pub fn log_exposure(store: &Store, clock: &dyn Clock, word_id: &str, source: &str) -> Result<()> {
    let day = clock::utc_day(clock.now())?;
    store
        .conn
        .execute(
            "INSERT INTO exposures (date, word_id, source) VALUES (?1, ?2, ?3)",
            params![day, word_id, source],
        )
        .with_context(|| format!("log exposure for {word_id}"))?;
    Ok(())
}

/// Distinct word ids exposed today, most recent exposure first.
pub fn todays_word_ids(store: &Store, clock: &dyn Clock, limit: usize) -> Result<Vec<String>> {
    let day = clock::utc_day(clock.now())?;
    let mut stmt = store
        .conn
        .prepare(
            "SELECT word_id, MAX(id) AS last_id
             FROM exposures
             WHERE date = ?1
             GROUP BY word_id
             ORDER BY last_id DESC
             LIMIT ?2",
        )
        .context("prepare exposure query")?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(params![day, limit], |row| row.get::<_, String>(0))
        .context("query exposures")?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.context("read exposure row")?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn latest_exposure_wins_position() -> Result<()> {
        let store = Store::open_in_memory()?;
        let clock = FixedClock(datetime!(2026-03-01 10:00 UTC));
        log_exposure(&store, &clock, "en_1", "app")?;
        log_exposure(&store, &clock, "ja_2", "app")?;
        log_exposure(&store, &clock, "en_1", "widget")?;
        assert_eq!(
            todays_word_ids(&store, &clock, DEFAULT_EXPOSURE_LIMIT)?,
            vec!["en_1", "ja_2"]
        );
        assert_eq!(todays_word_ids(&store, &clock, 1)?, vec!["en_1"]);
        Ok(())
    }

    #[test]
    fn days_are_utc() -> Result<()> {
        let store = Store::open_in_memory()?;
        // Already the 2nd in Seoul, still the 1st in UTC.
        let late = FixedClock(datetime!(2026-03-01 20:00 UTC));
        log_exposure(&store, &late, "zh_1", "app")?;
        let next_day = FixedClock(datetime!(2026-03-02 01:00 UTC));
        log_exposure(&store, &next_day, "zh_2", "app")?;

        assert_eq!(todays_word_ids(&store, &late, 50)?, vec!["zh_1"]);
        assert_eq!(todays_word_ids(&store, &next_day, 50)?, vec!["zh_2"]);
        let day: String = store.conn.query_row(
            "SELECT date FROM exposures WHERE word_id = 'zh_1'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(day, "2026-03-01");
        Ok(())
    }
}
