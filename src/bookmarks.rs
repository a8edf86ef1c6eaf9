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

//! Saved words and their review timestamps.

use anyhow::Context;
use anyhow::Result;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::catalog;
use crate::clock;
use crate::clock::Clock;
use crate::model::Bookmark;
use crate::model::Word;
use crate::store::Store;

pub fn is_bookmarked(store: &Store, word_id: &str) -> Result<bool> {
    let found: Option<i64> = store
        .conn
        .query_row(
            "SELECT 1 FROM bookmarks WHERE word_id = ?1",
            [word_id],
            |row| row.get(0),
        )
        .optional()
        .context("check bookmark")?;
    Ok(found.is_some())
}

/// Saves `word_id`. Saving again restarts its review history.
pub fn upsert(store: &Store, clock: &dyn Clock, word_id: &str) -> Result<()> {
    let now = clock::timestamp(clock.now())?;
    store
        .conn
        .execute(
            "INSERT OR REPLACE INTO bookmarks (word_id, created_at, last_viewed_at) VALUES (?1, ?2, NULL)",
            params![word_id, now],
        )
        .with_context(|| format!("save bookmark {word_id}"))?;
    Ok(())
}

/// Returns whether a bookmark was removed.
pub fn remove(store: &Store, word_id: &str) -> Result<bool> {
    let removed = store
        .conn
        .execute("DELETE FROM bookmarks WHERE word_id = ?1", [word_id])
        .with_context(|| format!("remove bookmark {word_id}"))?;
    Ok(removed > 0)
}

/// No-op for words that are not saved.
pub fn touch_last_viewed(store: &Store, clock: &dyn Clock, word_id: &str) -> Result<()> {
    let now = clock::timestamp(clock.now())?;
    store
        .conn
        .execute(
            "UPDATE bookmarks SET last_viewed_at = ?1 WHERE word_id = ?2",
            params![now, word_id],
        )
        .with_context(|| format!("touch bookmark {word_id}"))?;
    Ok(())
}

pub fn get(store: &Store, word_id: &str) -> Result<Option<Bookmark>> {
    store
        .conn
        .query_row(
            "SELECT word_id, created_at, last_viewed_at FROM bookmarks WHERE word_id = ?1",
            [word_id],
            |row| {
                Ok(Bookmark {
                    word_id: row.get(0)?,
                    created_at: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    last_viewed_at: row.get(2)?,
                })
            },
        )
        .optional()
        .context("read bookmark")
}

/// Saved words in review order: never viewed first (oldest save first), then
/// by least recently viewed. Bookmarks whose word is gone from the catalog
/// are left out.
pub fn all_sorted(store: &Store) -> Result<Vec<Word>> {
    let sql = format!(
        "SELECT {}
         FROM bookmarks b
         JOIN words w ON w.id = b.word_id
         ORDER BY CASE WHEN b.last_viewed_at IS NULL THEN 0 ELSE 1 END,
                  b.last_viewed_at ASC,
                  b.created_at ASC,
                  b.word_id ASC",
        catalog::word_select(store, "w.")
    );
    catalog::query_words(store, &sql, [])
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;
    use crate::clock::FixedClock;
    use crate::clock::testing::SteppingClock;

    fn ids(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.id.as_str()).collect()
    }

    #[test]
    fn save_touch_and_remove() -> Result<()> {
        let store = Store::open_in_memory()?;
        let clock = FixedClock(datetime!(2026-03-01 08:00 UTC));
        assert!(!is_bookmarked(&store, "en_1")?);

        upsert(&store, &clock, "en_1")?;
        assert!(is_bookmarked(&store, "en_1")?);
        let saved = get(&store, "en_1")?.expect("bookmark");
        assert_eq!(saved.created_at, "2026-03-01T08:00:00.000000Z");
        assert!(saved.last_viewed_at.is_none());

        let later = FixedClock(datetime!(2026-03-02 08:00 UTC));
        touch_last_viewed(&store, &later, "en_1")?;
        let viewed = get(&store, "en_1")?.expect("bookmark");
        assert_eq!(
            viewed.last_viewed_at.as_deref(),
            Some("2026-03-02T08:00:00.000000Z")
        );

        // Saving again resets review history.
        upsert(&store, &later, "en_1")?;
        let resaved = get(&store, "en_1")?.expect("bookmark");
        assert_eq!(resaved.created_at, "2026-03-02T08:00:00.000000Z");
        assert!(resaved.last_viewed_at.is_none());

        touch_last_viewed(&store, &later, "ja_1")?;
        assert!(get(&store, "ja_1")?.is_none());

        assert!(remove(&store, "en_1")?);
        assert!(!remove(&store, "en_1")?);
        assert!(!is_bookmarked(&store, "en_1")?);
        Ok(())
    }

    #[test]
    fn review_order_puts_unviewed_first() -> Result<()> {
        let store = Store::open_in_memory()?;
        let clock = SteppingClock::new(datetime!(2026-03-01 00:00 UTC), Duration::minutes(1));
        upsert(&store, &clock, "en_1")?; // t0
        upsert(&store, &clock, "ja_1")?; // t1
        upsert(&store, &clock, "zh_1")?; // t2
        upsert(&store, &clock, "en_2")?; // t3
        touch_last_viewed(&store, &clock, "en_1")?; // t4
        touch_last_viewed(&store, &clock, "zh_1")?; // t5
        touch_last_viewed(&store, &clock, "en_1")?; // t6

        assert_eq!(
            ids(&all_sorted(&store)?),
            vec!["ja_1", "en_2", "zh_1", "en_1"]
        );
        Ok(())
    }

    #[test]
    fn dangling_bookmarks_are_hidden() -> Result<()> {
        let store = Store::open_in_memory()?;
        let clock = FixedClock(datetime!(2026-03-01 00:00 UTC));
        upsert(&store, &clock, "gone")?;
        upsert(&store, &clock, "zh_4")?;
        assert_eq!(ids(&all_sorted(&store)?), vec!["zh_4"]);
        assert!(is_bookmarked(&store, "gone")?);
        Ok(())
    }
}
