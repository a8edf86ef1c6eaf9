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

//! Read access to the word dictionary.
//!
//! Catalogs shipped by older builds differ in a few columns: the category can
//! be a scalar `category` or a JSON-encoded `categories` list, and the meaning
//! column may be the legacy `meaning`. The differences are resolved once into
//! a [`CatalogLayout`] when a store opens, and every query is rendered from
//! that descriptor.

use std::collections::HashMap;

use anyhow::Context;
use anyhow::Result;
use rusqlite::Connection;
use rusqlite::Params;
use rusqlite::ToSql;
use rusqlite::params_from_iter;
use tracing::warn;

use crate::model::Example;
use crate::model::Lang;
use crate::model::Word;
use crate::model::WordFilter;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    /// `category TEXT`
    Scalar,
    /// `categories TEXT` holding a JSON array; the first entry is primary.
    JsonList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLayout {
    pub category: CategoryField,
    pub meaning_column: &'static str,
    pub has_reading: bool,
    pub has_sentence_reading: bool,
}

/// Borrowed word fields for inserts (seed data and catalog import).
#[derive(Debug, Clone, Copy)]
pub struct NewWord<'a> {
    pub id: &'a str,
    pub lang: Lang,
    pub word: &'a str,
    pub reading: Option<&'a str>,
    pub meaning_ko: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct NewExample<'a> {
    pub id: &'a str,
    pub word_id: &'a str,
    pub sentence_native: &'a str,
    pub sentence_reading: Option<&'a str>,
    pub sentence_ko: &'a str,
    pub context_tag: &'a str,
}

impl CatalogLayout {
    pub fn resolve(conn: &Connection) -> Result<Self> {
        let word_columns = Store::table_columns(conn, "words")?;
        if word_columns.is_empty() {
            anyhow::bail!("words table is missing");
        }
        let has = |name: &str| word_columns.iter().any(|c| c == name);

        let category = if has("category") {
            CategoryField::Scalar
        } else if has("categories") {
            CategoryField::JsonList
        } else {
            anyhow::bail!("words table has neither `category` nor `categories`");
        };
        let meaning_column = if has("meaning_ko") {
            "meaning_ko"
        } else if has("meaning") {
            "meaning"
        } else {
            anyhow::bail!("words table has no meaning column");
        };
        let has_reading = has("reading");
        let has_sentence_reading = Store::column_exists(conn, "examples", "sentence_reading")?;

        Ok(Self {
            category,
            meaning_column,
            has_reading,
            has_sentence_reading,
        })
    }

    /// Select list matching [`WordRow`]. `alias` is a table prefix such as
    /// `"w."`, or empty.
    fn word_columns(&self, alias: &str) -> String {
        let reading = if self.has_reading {
            format!("{alias}reading")
        } else {
            "NULL".to_string()
        };
        format!(
            "{alias}id, {alias}lang, {alias}word, {reading}, {alias}{meaning}, {category}",
            meaning = self.meaning_column,
            category = self.category_value(alias),
        )
    }

    fn category_value(&self, alias: &str) -> String {
        match self.category {
            CategoryField::Scalar => format!("{alias}category"),
            CategoryField::JsonList => format!(
                "CASE WHEN json_valid({alias}categories) THEN CAST(json_extract({alias}categories, '$[0]') AS TEXT) END"
            ),
        }
    }

    /// Invalid JSON lists read as empty.
    fn category_list(&self, alias: &str) -> String {
        format!("json_each(CASE WHEN json_valid({alias}categories) THEN {alias}categories ELSE '[]' END)")
    }

    fn category_predicate(&self, alias: &str, count: usize) -> String {
        let marks = placeholders(count);
        match self.category {
            CategoryField::Scalar => format!("{alias}category IN ({marks})"),
            CategoryField::JsonList => format!(
                "EXISTS (SELECT 1 FROM {} AS c WHERE c.value IN ({marks}))",
                self.category_list(alias)
            ),
        }
    }

    pub fn insert_word(&self, conn: &Connection, word: &NewWord<'_>) -> Result<usize> {
        let lang = word.lang.code();
        let mut columns = vec!["id", "lang", "word"];
        let mut marks = vec!["?", "?", "?"];
        let mut values: Vec<&dyn ToSql> = vec![&word.id, &lang, &word.word];
        if self.has_reading {
            columns.push("reading");
            marks.push("?");
            values.push(&word.reading);
        }
        columns.push(self.meaning_column);
        marks.push("?");
        values.push(&word.meaning_ko);
        match self.category {
            CategoryField::Scalar => {
                columns.push("category");
                marks.push("?");
            }
            CategoryField::JsonList => {
                columns.push("categories");
                marks.push("json_array(?)");
            }
        }
        values.push(&word.category);

        let sql = format!(
            "INSERT OR IGNORE INTO words ({}) VALUES ({})",
            columns.join(", "),
            marks.join(", ")
        );
        conn.execute(&sql, values.as_slice())
            .with_context(|| format!("insert word {}", word.id))
    }

    pub fn insert_example(&self, conn: &Connection, example: &NewExample<'_>) -> Result<usize> {
        let mut columns = vec!["id", "word_id", "sentence_native"];
        let mut values: Vec<&dyn ToSql> =
            vec![&example.id, &example.word_id, &example.sentence_native];
        if self.has_sentence_reading {
            columns.push("sentence_reading");
            values.push(&example.sentence_reading);
        }
        columns.push("sentence_ko");
        values.push(&example.sentence_ko);
        columns.push("context_tag");
        values.push(&example.context_tag);

        let sql = format!(
            "INSERT OR IGNORE INTO examples ({}) VALUES ({})",
            columns.join(", "),
            placeholders(columns.len())
        );
        conn.execute(&sql, values.as_slice())
            .with_context(|| format!("insert example {}", example.id))
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

struct WordRow {
    id: String,
    lang: String,
    word: Option<String>,
    reading: Option<String>,
    meaning: Option<String>,
    category: Option<String>,
}

impl WordRow {
    fn into_word(self, lang: Lang) -> Word {
        Word {
            id: self.id,
            lang,
            word: self.word.unwrap_or_default(),
            reading: self.reading,
            meaning_ko: self.meaning.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
        }
    }
}

/// Runs a query whose select list comes from [`CatalogLayout::word_columns`].
/// Rows with a language outside [`Lang`] are skipped.
pub(crate) fn query_words<P: Params>(store: &Store, sql: &str, params: P) -> Result<Vec<Word>> {
    let mut stmt = store.conn.prepare(sql).context("prepare word query")?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(WordRow {
                id: row.get(0)?,
                lang: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                word: row.get(2)?,
                reading: row.get(3)?,
                meaning: row.get(4)?,
                category: row.get(5)?,
            })
        })
        .context("query words")?;

    let mut words = Vec::new();
    for row in rows {
        let raw = row.context("read word row")?;
        match Lang::from_code(&raw.lang) {
            Some(lang) => words.push(raw.into_word(lang)),
            None => warn!(word_id = %raw.id, lang = %raw.lang, "skipping word with unknown language"),
        }
    }
    Ok(words)
}

pub(crate) fn word_select(store: &Store, alias: &str) -> String {
    store.layout().word_columns(alias)
}

pub fn get_by_id(store: &Store, id: &str) -> Result<Option<Word>> {
    let sql = format!(
        "SELECT {} FROM words WHERE id = ?1 LIMIT 1",
        word_select(store, "")
    );
    Ok(query_words(store, &sql, [id])?.into_iter().next())
}

/// Words for `ids`, in the order of `ids`. Unknown ids are dropped.
pub fn get_by_ids(store: &Store, ids: &[String]) -> Result<Vec<Word>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {} FROM words WHERE id IN ({})",
        word_select(store, ""),
        placeholders(ids.len())
    );
    let found: HashMap<String, Word> = query_words(store, &sql, params_from_iter(ids.iter()))?
        .into_iter()
        .map(|word| (word.id.clone(), word))
        .collect();
    Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
}

/// Any of `langs` AND any of `categories`; an empty list leaves that
/// dimension unconstrained. Results come back ordered by id so callers that
/// sample from them see a stable input.
pub fn get_by_filters(store: &Store, filter: &WordFilter) -> Result<Vec<Word>> {
    let mut clauses = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if !filter.langs.is_empty() {
        clauses.push(format!("words.lang IN ({})", placeholders(filter.langs.len())));
        values.extend(filter.langs.iter().map(|lang| lang.code().to_string()));
    }
    if !filter.categories.is_empty() {
        clauses.push(
            store
                .layout()
                .category_predicate("words.", filter.categories.len()),
        );
        values.extend(filter.categories.iter().cloned());
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM words{where_clause} ORDER BY words.id",
        word_select(store, "words.")
    );
    query_words(store, &sql, params_from_iter(values.iter()))
}

pub fn get_by_category(store: &Store, category: &str, langs: &[Lang]) -> Result<Vec<Word>> {
    get_by_filters(
        store,
        &WordFilter {
            langs: langs.to_vec(),
            categories: vec![category.to_string()],
        },
    )
}

pub fn get_examples_by_word_id(store: &Store, word_id: &str) -> Result<Vec<Example>> {
    query_examples(store, "WHERE word_id = ?1", [word_id])
}

/// Every example, for export.
pub(crate) fn all_examples(store: &Store) -> Result<Vec<Example>> {
    query_examples(store, "", [])
}

fn query_examples<P: Params>(store: &Store, where_clause: &str, params: P) -> Result<Vec<Example>> {
    let reading = if store.layout().has_sentence_reading {
        "sentence_reading"
    } else {
        "NULL"
    };
    let mut stmt = store
        .conn
        .prepare(&format!(
            "SELECT id, word_id, sentence_native, {reading}, sentence_ko, context_tag
             FROM examples
             {where_clause}
             ORDER BY id"
        ))
        .context("prepare examples query")?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(Example {
                id: row.get(0)?,
                word_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                sentence_native: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                sentence_reading: row.get(3)?,
                sentence_ko: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                context_tag: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })
        .context("query examples")?;
    let mut examples = Vec::new();
    for row in rows {
        examples.push(row.context("read example row")?);
    }
    Ok(examples)
}

/// Distinct non-empty categories among words in `langs` (all words when empty).
pub fn list_categories(store: &Store, langs: &[Lang]) -> Result<Vec<String>> {
    let lang_clause = if langs.is_empty() {
        String::new()
    } else {
        format!(" AND words.lang IN ({})", placeholders(langs.len()))
    };
    let sql = match store.layout().category {
        CategoryField::Scalar => format!(
            "SELECT DISTINCT words.category FROM words
             WHERE words.category IS NOT NULL AND words.category <> ''{lang_clause}
             ORDER BY 1"
        ),
        CategoryField::JsonList => format!(
            "SELECT DISTINCT CAST(c.value AS TEXT) FROM words, {} AS c
             WHERE c.value IS NOT NULL AND c.value <> ''{lang_clause}
             ORDER BY 1",
            store.layout().category_list("words.")
        ),
    };
    let mut stmt = store.conn.prepare(&sql).context("prepare categories query")?;
    let rows = stmt
        .query_map(params_from_iter(langs.iter().map(|lang| lang.code())), |row| {
            row.get::<_, String>(0)
        })
        .context("query categories")?;
    let mut categories = Vec::new();
    for row in rows {
        categories.push(row.context("read category")?);
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection as SqlConnection;
    use tempfile::tempdir;

    use super::*;
    use crate::store::StoreMode;

    fn ids(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.id.as_str()).collect()
    }

    #[test]
    fn get_by_id_returns_none_for_unknown() -> Result<()> {
        let store = Store::open_in_memory()?;
        let word = get_by_id(&store, "ja_2")?.expect("seeded word");
        assert_eq!(word.lang, Lang::Ja);
        assert_eq!(word.reading.as_deref(), Some("たび"));
        assert_eq!(word.meaning_ko, "여행");
        assert!(get_by_id(&store, "nope")?.is_none());
        Ok(())
    }

    #[test]
    fn get_by_ids_mirrors_input_order() -> Result<()> {
        let store = Store::open_in_memory()?;
        let wanted = vec![
            "zh_4".to_string(),
            "missing".to_string(),
            "en_1".to_string(),
            "ja_3".to_string(),
        ];
        let words = get_by_ids(&store, &wanted)?;
        assert_eq!(ids(&words), vec!["zh_4", "en_1", "ja_3"]);
        assert!(get_by_ids(&store, &[])?.is_empty());
        Ok(())
    }

    #[test]
    fn filters_are_or_within_and_across_dimensions() -> Result<()> {
        let store = Store::open_in_memory()?;
        let all = get_by_filters(&store, &WordFilter::default())?;
        assert_eq!(all.len(), 10);

        let travel_or_food_in_zh_or_en = get_by_filters(
            &store,
            &WordFilter {
                langs: vec![Lang::Zh, Lang::En],
                categories: vec!["travel".to_string(), "food".to_string()],
            },
        )?;
        assert_eq!(
            ids(&travel_or_food_in_zh_or_en),
            vec!["en_2", "zh_3", "zh_4"]
        );

        let by_category = get_by_category(&store, "daily", &[Lang::Ja])?;
        assert_eq!(ids(&by_category), vec!["ja_1"]);
        let any_lang = get_by_category(&store, "daily", &[])?;
        assert_eq!(ids(&any_lang), vec!["en_3", "ja_1", "zh_1"]);
        Ok(())
    }

    #[test]
    fn examples_and_categories() -> Result<()> {
        let store = Store::open_in_memory()?;
        let examples = get_examples_by_word_id(&store, "zh_3")?;
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].context_tag, "travel");
        assert!(examples[0].sentence_reading.is_none());
        assert!(get_examples_by_word_id(&store, "en_2")?.is_empty());

        assert_eq!(
            list_categories(&store, &[])?,
            vec!["daily", "emotion", "food", "travel"]
        );
        assert_eq!(
            list_categories(&store, &[Lang::En])?,
            vec!["daily", "emotion", "travel"]
        );
        Ok(())
    }

    #[test]
    fn unknown_languages_are_skipped() -> Result<()> {
        let store = Store::open_in_memory()?;
        store.conn.execute(
            "INSERT INTO words (id, lang, word, reading, meaning_ko, category) VALUES ('fr_1', 'fr', 'bonjour', NULL, '안녕', 'daily')",
            [],
        )?;
        assert!(get_by_id(&store, "fr_1")?.is_none());
        assert_eq!(get_by_filters(&store, &WordFilter::default())?.len(), 10);
        Ok(())
    }

    #[test]
    fn json_list_catalog_layout() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("vocab.db");
        let conn = SqlConnection::open(&db_path)?;
        conn.execute_batch(
            "CREATE TABLE words (\n  id TEXT PRIMARY KEY,\n  lang TEXT,\n  word TEXT,\n  meaning TEXT,\n  categories TEXT\n);\nINSERT INTO words VALUES ('en_9', 'en', 'brisk', '상쾌한', '[\"weather\",\"daily\"]');\nINSERT INTO words VALUES ('en_8', 'en', 'broken', '깨진', 'not json');",
        )?;
        drop(conn);

        let store = Store::open(&db_path, StoreMode::ReadWrite)?;
        let layout = store.layout();
        assert_eq!(layout.category, CategoryField::JsonList);
        assert_eq!(layout.meaning_column, "meaning");
        assert!(!layout.has_reading);

        let brisk = get_by_id(&store, "en_9")?.expect("legacy word");
        assert_eq!(brisk.category, "weather");
        assert_eq!(brisk.meaning_ko, "상쾌한");
        assert!(brisk.reading.is_none());

        // Seeded rows were written as one-element lists.
        let daily = get_by_category(&store, "daily", &[Lang::En])?;
        assert_eq!(ids(&daily), vec!["en_3", "en_9"]);

        let broken = get_by_id(&store, "en_8")?.expect("row with bad json");
        assert_eq!(broken.category, "");
        assert!(list_categories(&store, &[Lang::En])?.contains(&"weather".to_string()));
        Ok(())
    }
}
