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

//! The daily feed: a sampled auto-pool per language selection, plus words the
//! user pulled in from outside (widget, lock screen, deep links).
//!
//! An auto-pool row, once written for a `(dateKey, languageKey)` pair, is
//! returned verbatim for the rest of that day. It is never recomputed, even
//! when the catalog or the recency data changes.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use anyhow::Context;
use anyhow::Result;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Serialize;
use time::UtcOffset;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::bookmarks;
use crate::catalog;
use crate::clock;
use crate::clock::Clock;
use crate::exposure;
use crate::model::InjectSource;
use crate::model::Lang;
use crate::model::WordDetail;
use crate::model::WordFilter;
use crate::settings;
use crate::shuffle::stable_shuffle;
use crate::store::Store;

pub const AUTO_PER_LANGUAGE: usize = 5;
pub const RECENT_POOL_WINDOW: usize = 7;
pub const INJECTED_LIMIT: usize = 200;

/// Exposure source recorded when the detail view opens a word.
pub const DETAIL_EXPOSURE_SOURCE: &str = "app";

#[derive(Debug, Clone)]
pub struct TodayConfig {
    pub auto_per_language: usize,
    /// How many of the most recent auto-pool rows feed the exclusion set.
    pub recent_pool_window: usize,
    pub injected_limit: usize,
    pub reference_offset: UtcOffset,
}

impl Default for TodayConfig {
    fn default() -> Self {
        Self {
            auto_per_language: AUTO_PER_LANGUAGE,
            recent_pool_window: RECENT_POOL_WINDOW,
            injected_limit: INJECTED_LIMIT,
            reference_offset: clock::DEFAULT_REFERENCE_OFFSET,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayFeed {
    pub date_key: String,
    pub language_key: String,
    pub injected_ids: Vec<String>,
    /// Auto-pool ids not already injected, in pool order.
    pub auto_ids: Vec<String>,
    /// The auto-pool as persisted.
    pub pool_ids: Vec<String>,
    pub all_ids: Vec<String>,
}

type PoolKey = (String, String);

/// One mutex per `(dateKey, languageKey)`, shared by every clone of an engine.
#[derive(Debug, Clone, Default)]
pub struct PoolLocks {
    inner: Arc<Mutex<HashMap<PoolKey, Arc<Mutex<()>>>>>,
}

impl PoolLocks {
    fn for_key(&self, date_key: &str, language_key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry((date_key.to_string(), language_key.to_string()))
            .or_default()
            .clone()
    }
}

/// Sorted, de-duplicated language codes joined with commas.
pub fn language_key(langs: &[Lang]) -> String {
    let mut codes: Vec<&str> = langs.iter().map(|lang| lang.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    codes.join(",")
}

fn seed_text(date_key: &str, language_key: &str) -> String {
    format!("{date_key}:{language_key}")
}

/// Decodes a persisted id list. Anything but a JSON array of strings reads as
/// empty.
fn decode_ids(raw: Option<&str>, date_key: &str, language_key: &str) -> Vec<String> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids,
        Err(err) => {
            warn!(date_key, language_key, error = %err, "malformed auto-pool word ids; treating as empty");
            Vec::new()
        }
    }
}

#[derive(Clone)]
pub struct TodayEngine {
    config: TodayConfig,
    clock: Arc<dyn Clock>,
    locks: PoolLocks,
}

impl TodayEngine {
    pub fn new(config: TodayConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            locks: PoolLocks::default(),
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn today_key(&self) -> Result<String> {
        clock::date_key(self.clock.now(), self.config.reference_offset)
    }

    /// Today's auto-pool for the selected languages, computed on first use.
    pub fn ensure_auto_pool_for_today(&self, store: &Store) -> Result<Vec<String>> {
        let date_key = self.today_key()?;
        let langs = settings::selected_languages(store)?;
        self.auto_pool_for(store, &date_key, &langs)
    }

    pub fn auto_pool_for(&self, store: &Store, date_key: &str, langs: &[Lang]) -> Result<Vec<String>> {
        let language_key = language_key(langs);
        let lock = self.locks.for_key(date_key, &language_key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = load_auto_pool(store, date_key, &language_key)? {
            debug!(date_key, %language_key, count = existing.len(), "reusing auto-pool");
            return Ok(existing);
        }

        let recent = recent_pool_ids(store, self.config.recent_pool_window)?;
        let seed = seed_text(date_key, &language_key);
        let mut sampled = Vec::new();
        for lang in langs {
            sampled.extend(self.pick_for_language(store, *lang, &recent, &seed)?);
        }
        let ids = stable_shuffle(&sampled, &seed);

        save_auto_pool(store, self.clock.as_ref(), date_key, &language_key, &ids)?;
        info!(date_key, %language_key, count = ids.len(), "computed auto-pool");
        Ok(ids)
    }

    fn pick_for_language(
        &self,
        store: &Store,
        lang: Lang,
        recent: &HashSet<String>,
        seed: &str,
    ) -> Result<Vec<String>> {
        let all: Vec<String> = catalog::get_by_filters(
            store,
            &WordFilter {
                langs: vec![lang],
                categories: Vec::new(),
            },
        )?
        .into_iter()
        .map(|word| word.id)
        .collect();

        let fresh: Vec<String> = all.iter().filter(|id| !recent.contains(*id)).cloned().collect();
        let quota = self.config.auto_per_language;
        let candidates = if fresh.len() >= quota {
            fresh
        } else {
            debug!(lang = %lang, fresh = fresh.len(), total = all.len(), "too few fresh words; ignoring recency");
            all
        };

        let mut picks = stable_shuffle(&candidates, seed);
        picks.truncate(quota);
        Ok(picks)
    }

    /// Puts `word_id` on today's feed. Re-injecting refreshes its position and
    /// source.
    pub fn inject_today_word(&self, store: &Store, word_id: &str, source: InjectSource) -> Result<()> {
        let now = self.clock.now();
        let date_key = clock::date_key(now, self.config.reference_offset)?;
        let seen_at = clock::timestamp(now)?;
        store
            .conn
            .execute(
                "INSERT INTO today_injected_items (date_key, word_id, source, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(date_key, word_id)
                 DO UPDATE SET last_seen_at = excluded.last_seen_at,
                               source = excluded.source",
                params![date_key, word_id, source.as_str(), seen_at],
            )
            .with_context(|| format!("inject {word_id}"))?;
        debug!(date_key, word_id, source = %source, "injected word");
        Ok(())
    }

    /// Most recently injected first.
    pub fn injected_ids_for(&self, store: &Store, date_key: &str) -> Result<Vec<String>> {
        let limit = i64::try_from(self.config.injected_limit).unwrap_or(i64::MAX);
        let mut stmt = store
            .conn
            .prepare(
                "SELECT word_id
                 FROM today_injected_items
                 WHERE date_key = ?1
                 ORDER BY last_seen_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .context("prepare injected query")?;
        let rows = stmt
            .query_map(params![date_key, limit], |row| row.get::<_, String>(0))
            .context("query injected items")?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.context("read injected row")?);
        }
        Ok(ids)
    }

    pub fn get_today_feed(&self, store: &Store) -> Result<TodayFeed> {
        let date_key = self.today_key()?;
        let langs = settings::selected_languages(store)?;
        let injected_ids = self.injected_ids_for(store, &date_key)?;
        let pool_ids = self.auto_pool_for(store, &date_key, &langs)?;

        let injected: HashSet<&str> = injected_ids.iter().map(String::as_str).collect();
        let auto_ids: Vec<String> = pool_ids
            .iter()
            .filter(|id| !injected.contains(id.as_str()))
            .cloned()
            .collect();
        let all_ids = injected_ids
            .iter()
            .chain(auto_ids.iter())
            .cloned()
            .collect();

        Ok(TodayFeed {
            date_key,
            language_key: language_key(&langs),
            injected_ids,
            auto_ids,
            pool_ids,
            all_ids,
        })
    }

    /// The detail-view flow. Records the exposure, refreshes the bookmark's
    /// review time, and injects the word when it arrived from outside the app.
    pub fn open_word(
        &self,
        store: &Store,
        word_id: &str,
        source: Option<InjectSource>,
    ) -> Result<Option<WordDetail>> {
        let word_id = word_id.trim();
        let Some(word) = catalog::get_by_id(store, word_id)? else {
            return Ok(None);
        };
        exposure::log_exposure(store, self.clock.as_ref(), word_id, DETAIL_EXPOSURE_SOURCE)?;

        let bookmarked = bookmarks::is_bookmarked(store, word_id)?;
        if bookmarked {
            bookmarks::touch_last_viewed(store, self.clock.as_ref(), word_id)?;
        }
        if let Some(source) = source {
            self.inject_today_word(store, word_id, source)?;
        }
        let examples = catalog::get_examples_by_word_id(store, word_id)?;

        Ok(Some(WordDetail {
            word,
            examples,
            bookmarked,
            injected: source,
        }))
    }
}

fn load_auto_pool(store: &Store, date_key: &str, language_key: &str) -> Result<Option<Vec<String>>> {
    let raw: Option<Option<String>> = store
        .conn
        .query_row(
            "SELECT word_ids FROM today_auto_pool WHERE date_key = ?1 AND language_key = ?2 LIMIT 1",
            params![date_key, language_key],
            |row| row.get(0),
        )
        .optional()
        .context("read auto-pool")?;
    Ok(raw.map(|raw| decode_ids(raw.as_deref(), date_key, language_key)))
}

fn save_auto_pool(
    store: &Store,
    clock: &dyn Clock,
    date_key: &str,
    language_key: &str,
    ids: &[String],
) -> Result<()> {
    let encoded = serde_json::to_string(ids).context("encode auto-pool")?;
    let created_at = clock::timestamp(clock.now())?;
    store
        .conn
        .execute(
            "INSERT OR REPLACE INTO today_auto_pool (date_key, language_key, word_ids, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![date_key, language_key, encoded, created_at],
        )
        .context("write auto-pool")?;
    Ok(())
}

/// Ids drawn into the `window` most recent auto-pools.
fn recent_pool_ids(store: &Store, window: usize) -> Result<HashSet<String>> {
    let limit = i64::try_from(window).unwrap_or(i64::MAX);
    let mut stmt = store
        .conn
        .prepare(
            "SELECT date_key, language_key, word_ids
             FROM today_auto_pool
             ORDER BY date_key DESC, language_key ASC
             LIMIT ?1",
        )
        .context("prepare recent auto-pool query")?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .context("query recent auto-pools")?;
    let mut ids = HashSet::new();
    for row in rows {
        let (date_key, language_key, raw) = row.context("read auto-pool row")?;
        ids.extend(decode_ids(raw.as_deref(), &date_key, &language_key));
    }
    Ok(ids)
}
