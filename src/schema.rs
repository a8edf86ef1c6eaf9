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

//! Ordered schema steps and the reference seed data.
//!
//! Every step must be safe to re-run against a database that already contains
//! its effects: tables and indexes use `IF NOT EXISTS`, new columns are added
//! only when missing, seed rows are insert-if-absent, and backfills touch only
//! NULLs.

use anyhow::Context;
use anyhow::Result;
use rusqlite::Connection;

use crate::catalog::CatalogLayout;
use crate::catalog::NewExample;
use crate::catalog::NewWord;
use crate::model::Lang;
use crate::store::Store;

pub type MigrationFn = fn(&Connection, &str) -> Result<()>;

#[derive(Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    /// Receives the connection and the timestamp used for backfills.
    pub apply: MigrationFn,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "catalog",
        apply: create_catalog,
    },
    Migration {
        version: 2,
        name: "seed",
        apply: seed_catalog,
    },
    Migration {
        version: 3,
        name: "exposures_settings",
        apply: create_exposures_and_settings,
    },
    Migration {
        version: 4,
        name: "review_columns",
        apply: add_review_columns,
    },
    Migration {
        version: 5,
        name: "today_feed",
        apply: create_today_tables,
    },
];

pub fn latest_version(definitions: &[Migration]) -> i64 {
    definitions.iter().map(|m| m.version).max().unwrap_or(0)
}

fn create_catalog(conn: &Connection, _applied_at: &str) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS words (\n  id TEXT PRIMARY KEY,\n  lang TEXT,\n  word TEXT,\n  reading TEXT NULL,\n  meaning_ko TEXT,\n  category TEXT\n);\n\nCREATE TABLE IF NOT EXISTS examples (\n  id TEXT PRIMARY KEY,\n  word_id TEXT,\n  sentence_native TEXT,\n  sentence_ko TEXT,\n  context_tag TEXT\n);\n\nCREATE INDEX IF NOT EXISTS idx_examples_word ON examples(word_id);\n\nCREATE TABLE IF NOT EXISTS bookmarks (\n  word_id TEXT PRIMARY KEY,\n  created_at TEXT\n);",
    )
    .context("create catalog tables")?;
    Ok(())
}

fn seed_catalog(conn: &Connection, _applied_at: &str) -> Result<()> {
    // Older catalogs may use the JSON `categories` column.
    let layout = CatalogLayout::resolve(conn)?;
    for word in SEED_WORDS {
        layout.insert_word(conn, word)?;
    }
    for example in SEED_EXAMPLES {
        layout.insert_example(conn, example)?;
    }
    Ok(())
}

fn create_exposures_and_settings(conn: &Connection, _applied_at: &str) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS exposures (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  date TEXT NOT NULL,\n  word_id TEXT NOT NULL,\n  source TEXT NOT NULL\n);\n\nCREATE INDEX IF NOT EXISTS idx_exposures_date ON exposures(date, word_id);\n\nCREATE TABLE IF NOT EXISTS settings (\n  key TEXT PRIMARY KEY,\n  value TEXT\n);",
    )
    .context("create exposures and settings tables")?;
    Ok(())
}

fn add_review_columns(conn: &Connection, applied_at: &str) -> Result<()> {
    if !Store::column_exists(conn, "bookmarks", "last_viewed_at")? {
        conn.execute("ALTER TABLE bookmarks ADD COLUMN last_viewed_at TEXT", [])
            .context("add bookmarks.last_viewed_at column")?;
    }
    if !Store::column_exists(conn, "examples", "sentence_reading")? {
        conn.execute("ALTER TABLE examples ADD COLUMN sentence_reading TEXT", [])
            .context("add examples.sentence_reading column")?;
    }
    conn.execute(
        "UPDATE bookmarks SET created_at = ?1 WHERE created_at IS NULL",
        [applied_at],
    )
    .context("backfill bookmarks.created_at")?;
    Ok(())
}

fn create_today_tables(conn: &Connection, _applied_at: &str) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS today_auto_pool (\n  date_key TEXT NOT NULL,\n  language_key TEXT NOT NULL,\n  word_ids TEXT,\n  created_at TEXT NOT NULL,\n  PRIMARY KEY (date_key, language_key)\n);\n\nCREATE TABLE IF NOT EXISTS today_injected_items (\n  date_key TEXT NOT NULL,\n  word_id TEXT NOT NULL,\n  source TEXT NOT NULL,\n  last_seen_at TEXT NOT NULL,\n  PRIMARY KEY (date_key, word_id)\n);\n\nCREATE INDEX IF NOT EXISTS idx_injected_seen ON today_injected_items(date_key, last_seen_at);",
    )
    .context("create today feed tables")?;
    Ok(())
}

const SEED_WORDS: &[NewWord<'static>] = &[
    NewWord {
        id: "en_1",
        lang: Lang::En,
        word: "serene",
        reading: None,
        meaning_ko: "고요한",
        category: "emotion",
    },
    NewWord {
        id: "en_2",
        lang: Lang::En,
        word: "wander",
        reading: None,
        meaning_ko: "거닐다",
        category: "travel",
    },
    NewWord {
        id: "ja_1",
        lang: Lang::Ja,
        word: "おはよう",
        reading: Some("ohayou"),
        meaning_ko: "좋은 아침",
        category: "daily",
    },
    NewWord {
        id: "ja_2",
        lang: Lang::Ja,
        word: "旅",
        reading: Some("たび"),
        meaning_ko: "여행",
        category: "travel",
    },
    NewWord {
        id: "zh_1",
        lang: Lang::Zh,
        word: "你好",
        reading: Some("ni hao"),
        meaning_ko: "안녕",
        category: "daily",
    },
    NewWord {
        id: "zh_2",
        lang: Lang::Zh,
        word: "慢慢来",
        reading: Some("man man lai"),
        meaning_ko: "천천히",
        category: "emotion",
    },
    NewWord {
        id: "zh_3",
        lang: Lang::Zh,
        word: "机场",
        reading: Some("ji chang"),
        meaning_ko: "공항",
        category: "travel",
    },
    NewWord {
        id: "en_3",
        lang: Lang::En,
        word: "cozy",
        reading: None,
        meaning_ko: "아늑한",
        category: "daily",
    },
    NewWord {
        id: "ja_3",
        lang: Lang::Ja,
        word: "好き",
        reading: Some("すき"),
        meaning_ko: "좋아함",
        category: "emotion",
    },
    NewWord {
        id: "zh_4",
        lang: Lang::Zh,
        word: "味道",
        reading: Some("wei dao"),
        meaning_ko: "맛/향",
        category: "food",
    },
];

const SEED_EXAMPLES: &[NewExample<'static>] = &[
    NewExample {
        id: "ex_en_1",
        word_id: "en_1",
        sentence_native: "A serene morning by the lake.",
        sentence_reading: None,
        sentence_ko: "호숫가의 고요한 아침.",
        context_tag: "daily",
    },
    NewExample {
        id: "ex_ja_1",
        word_id: "ja_1",
        sentence_native: "おはよう、今日はいい天気だね。",
        sentence_reading: None,
        sentence_ko: "좋은 아침, 오늘은 날씨가 좋네.",
        context_tag: "daily",
    },
    NewExample {
        id: "ex_zh_3",
        word_id: "zh_3",
        sentence_native: "我在机场等你。",
        sentence_reading: None,
        sentence_ko: "나는 공항에서 너를 기다리고 있어.",
        context_tag: "travel",
    },
];
