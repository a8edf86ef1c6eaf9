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

//! Picks one word from today's feed and hands it to the widget surface.
//!
//! The widget renderer is a separate program. It reads a small JSON snapshot
//! from a shared directory and is told to redraw through [`WidgetHost`].

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;
use tracing::info;

use crate::catalog;
use crate::exposure;
use crate::model::Lang;
use crate::model::Word;
use crate::store::Store;
use crate::today::TodayEngine;

pub const DEFAULT_SNAPSHOT_FILE: &str = "widget_word.json";

/// The shared container and the redraw signal, owned by the platform.
pub trait WidgetHost {
    fn container_dir(&self) -> Result<PathBuf>;
    fn reload_all_timelines(&self) -> Result<()>;
}

/// Host configured from `vocab.toml`: a directory plus an optional command
/// run after each write.
#[derive(Debug, Clone)]
pub struct CommandHost {
    pub dir: PathBuf,
    pub reload_command: Vec<String>,
}

impl WidgetHost for CommandHost {
    fn container_dir(&self) -> Result<PathBuf> {
        if !self.dir.is_dir() {
            anyhow::bail!("widget container {} does not exist", self.dir.display());
        }
        Ok(self.dir.clone())
    }

    fn reload_all_timelines(&self) -> Result<()> {
        let Some((program, args)) = self.reload_command.split_first() else {
            return Ok(());
        };
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("run widget reload command {program}"))?;
        if !status.success() {
            anyhow::bail!("widget reload command {program} exited with {status}");
        }
        Ok(())
    }
}

/// Used when no widget container is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl WidgetHost for NullHost {
    fn container_dir(&self) -> Result<PathBuf> {
        anyhow::bail!("no widget container configured")
    }

    fn reload_all_timelines(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WidgetSnapshot<'a> {
    pub id: &'a str,
    pub lang: Lang,
    pub word: &'a str,
    pub meaning_ko: &'a str,
}

impl<'a> From<&'a Word> for WidgetSnapshot<'a> {
    fn from(word: &'a Word) -> Self {
        Self {
            id: &word.id,
            lang: word.lang,
            word: &word.word,
            meaning_ko: &word.meaning_ko,
        }
    }
}

/// A uniformly random word from today's feed, or `None` when the feed is
/// empty. Words already exposed today (the `seen_limit` most recent) are
/// skipped unless every feed word has been seen.
pub fn pick_next_widget_word<R: Rng>(
    store: &Store,
    engine: &TodayEngine,
    seen_limit: usize,
    rng: &mut R,
) -> Result<Option<Word>> {
    let feed = engine.get_today_feed(store)?;
    let words = catalog::get_by_ids(store, &feed.all_ids)?;
    if words.is_empty() {
        return Ok(None);
    }

    let seen: HashSet<String> = exposure::todays_word_ids(store, engine.clock(), seen_limit)?
        .into_iter()
        .collect();
    let (unseen, already_seen): (Vec<Word>, Vec<Word>) =
        words.into_iter().partition(|word| !seen.contains(&word.id));
    let mut candidates = if unseen.is_empty() {
        debug!(count = already_seen.len(), "every feed word seen today; picking from the whole feed");
        already_seen
    } else {
        unseen
    };

    let index = rng.random_range(0..candidates.len());
    Ok(Some(candidates.swap_remove(index)))
}

/// Replaces the snapshot file, then asks the host to redraw. Returns the
/// written path.
pub fn write_widget_snapshot(host: &dyn WidgetHost, file_name: &str, word: &Word) -> Result<PathBuf> {
    let dir = host.container_dir()?;
    let path = dir.join(file_name);
    write_atomic(&dir, &path, &WidgetSnapshot::from(word))?;
    info!(path = %path.display(), word_id = %word.id, "wrote widget snapshot");
    host.reload_all_timelines()?;
    Ok(path)
}

fn write_atomic(dir: &Path, path: &Path, snapshot: &WidgetSnapshot<'_>) -> Result<()> {
    let payload = serde_json::to_vec(snapshot).context("encode widget snapshot")?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(&payload).context("write widget snapshot")?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::Value;
    use tempfile::tempdir;
    use time::macros::datetime;

    use super::*;
    use crate::clock::FixedClock;
    use crate::today::TodayConfig;

    const SEEN_LIMIT: usize = exposure::DEFAULT_EXPOSURE_LIMIT;

    fn engine() -> TodayEngine {
        TodayEngine::new(
            TodayConfig::default(),
            Arc::new(FixedClock(datetime!(2026-03-01 00:00 UTC))),
        )
    }

    #[test]
    fn picks_only_from_todays_feed() -> Result<()> {
        let store = Store::open_in_memory()?;
        let engine = engine();
        let feed: HashSet<String> = engine.get_today_feed(&store)?.all_ids.into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let word = pick_next_widget_word(&store, &engine, SEEN_LIMIT, &mut rng)?
                .expect("feed has words");
            assert!(feed.contains(&word.id));
        }
        Ok(())
    }

    #[test]
    fn empty_feed_picks_nothing() -> Result<()> {
        let store = Store::open_in_memory()?;
        store.conn.execute("DELETE FROM words WHERE lang = 'en'", [])?;
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pick_next_widget_word(&store, &engine(), SEEN_LIMIT, &mut rng)?.is_none());
        Ok(())
    }

    #[test]
    fn skips_words_seen_today() -> Result<()> {
        let store = Store::open_in_memory()?;
        let engine = engine();
        let feed = engine.get_today_feed(&store)?.all_ids;
        let (last, rest) = feed.split_last().expect("feed has words");
        for id in rest {
            exposure::log_exposure(&store, engine.clock(), id, "app")?;
        }

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let word = pick_next_widget_word(&store, &engine, SEEN_LIMIT, &mut rng)?
                .expect("feed has words");
            assert_eq!(&word.id, last);
        }
        Ok(())
    }

    #[test]
    fn falls_back_to_whole_feed_once_everything_is_seen() -> Result<()> {
        let store = Store::open_in_memory()?;
        let engine = engine();
        let feed: HashSet<String> = engine.get_today_feed(&store)?.all_ids.into_iter().collect();
        for id in &feed {
            exposure::log_exposure(&store, engine.clock(), id, "app")?;
        }

        let mut rng = StdRng::seed_from_u64(11);
        let word = pick_next_widget_word(&store, &engine, SEEN_LIMIT, &mut rng)?;
        assert!(word.is_some_and(|word| feed.contains(&word.id)));
        Ok(())
    }

    #[test]
    fn snapshot_has_exactly_four_fields() -> Result<()> {
        let store = Store::open_in_memory()?;
        let dir = tempdir()?;
        let host = CommandHost {
            dir: dir.path().to_path_buf(),
            reload_command: Vec::new(),
        };
        let word = catalog::get_by_id(&store, "ja_2")?.expect("seeded word");
        let path = write_widget_snapshot(&host, DEFAULT_SNAPSHOT_FILE, &word)?;
        assert_eq!(path, dir.path().join(DEFAULT_SNAPSHOT_FILE));

        let json: Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(
            json,
            serde_json::json!({"id": "ja_2", "lang": "ja", "word": "旅", "meaning_ko": "여행"})
        );

        let other = catalog::get_by_id(&store, "en_1")?.expect("seeded word");
        write_widget_snapshot(&host, DEFAULT_SNAPSHOT_FILE, &other)?;
        let json: Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(json["id"], "en_1");
        Ok(())
    }

    #[test]
    fn missing_container_is_an_error() -> Result<()> {
        let store = Store::open_in_memory()?;
        let word = catalog::get_by_id(&store, "en_1")?.expect("seeded word");
        assert!(write_widget_snapshot(&NullHost, DEFAULT_SNAPSHOT_FILE, &word).is_err());
        let gone = CommandHost {
            dir: std::env::temp_dir().join("vocab-missing-widget-container"),
            reload_command: Vec::new(),
        };
        assert!(write_widget_snapshot(&gone, DEFAULT_SNAPSHOT_FILE, &word).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failed_reload_is_reported_after_write() -> Result<()> {
        let store = Store::open_in_memory()?;
        let dir = tempdir()?;
        let host = CommandHost {
            dir: dir.path().to_path_buf(),
            reload_command: vec!["false".to_string()],
        };
        let word = catalog::get_by_id(&store, "en_1")?.expect("seeded word");
        assert!(write_widget_snapshot(&host, DEFAULT_SNAPSHOT_FILE, &word).is_err());
        assert!(dir.path().join(DEFAULT_SNAPSHOT_FILE).exists());
        Ok(())
    }
}
