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

//! Key/value user preferences: which languages and categories are selected.

use anyhow::Context;
use anyhow::Result;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::warn;

use crate::model::Lang;
use crate::store::Store;

pub const SELECTED_LANGUAGES: &str = "selected_languages";
pub const SELECTED_CATEGORIES: &str = "selected_categories";

pub fn get(store: &Store, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = store
        .conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("read setting {key}"))?;
    Ok(value.flatten())
}

pub fn set(store: &Store, key: &str, value: &str) -> Result<()> {
    store
        .conn
        .execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .with_context(|| format!("write setting {key}"))?;
    Ok(())
}

/// Known languages from a CSV, first occurrence kept.
pub fn parse_languages(csv: &str) -> Vec<Lang> {
    let mut langs = Vec::new();
    for part in csv.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match Lang::from_code(part) {
            Some(lang) if !langs.contains(&lang) => langs.push(lang),
            Some(_) => {}
            None => warn!(lang = part, "ignoring unknown language in settings"),
        }
    }
    langs
}

fn parse_categories<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut categories: Vec<String> = Vec::new();
    for part in parts {
        let part = part.as_ref().trim();
        if !part.is_empty() && !categories.iter().any(|c| c == part) {
            categories.push(part.to_string());
        }
    }
    categories
}

/// Never empty: falls back to English.
pub fn selected_languages(store: &Store) -> Result<Vec<Lang>> {
    let langs = get(store, SELECTED_LANGUAGES)?
        .map(|csv| parse_languages(&csv))
        .unwrap_or_default();
    if langs.is_empty() {
        return Ok(vec![Lang::En]);
    }
    Ok(langs)
}

/// Like [`selected_languages`] but an unset selection means every language.
pub fn selected_languages_or_all(store: &Store) -> Result<Vec<Lang>> {
    let langs = get(store, SELECTED_LANGUAGES)?
        .map(|csv| parse_languages(&csv))
        .unwrap_or_default();
    if langs.is_empty() {
        return Ok(Lang::ALL.to_vec());
    }
    Ok(langs)
}

/// Stores the normalized selection and returns it. An empty selection is
/// rejected so the feed always has a language to draw from.
pub fn set_selected_languages(store: &Store, langs: &[Lang]) -> Result<Vec<Lang>> {
    let mut normalized: Vec<Lang> = Vec::new();
    for lang in langs {
        if !normalized.contains(lang) {
            normalized.push(*lang);
        }
    }
    if normalized.is_empty() {
        anyhow::bail!("select at least one language");
    }
    let csv = normalized
        .iter()
        .map(|lang| lang.code())
        .collect::<Vec<_>>()
        .join(",");
    set(store, SELECTED_LANGUAGES, &csv)?;
    Ok(normalized)
}

/// Empty means no category constraint.
pub fn selected_categories(store: &Store) -> Result<Vec<String>> {
    Ok(get(store, SELECTED_CATEGORIES)?
        .map(|csv| parse_categories(csv.split(',')))
        .unwrap_or_default())
}

pub fn set_selected_categories(store: &Store, categories: &[String]) -> Result<Vec<String>> {
    let normalized = parse_categories(categories);
    set(store, SELECTED_CATEGORIES, &normalized.join(","))?;
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_default_to_english() -> Result<()> {
        let store = Store::open_in_memory()?;
        assert_eq!(selected_languages(&store)?, vec![Lang::En]);
        assert_eq!(selected_languages_or_all(&store)?, Lang::ALL.to_vec());

        set(&store, SELECTED_LANGUAGES, " , fr ,")?;
        assert_eq!(selected_languages(&store)?, vec![Lang::En]);
        Ok(())
    }

    #[test]
    fn language_selection_is_normalized() -> Result<()> {
        let store = Store::open_in_memory()?;
        let saved = set_selected_languages(&store, &[Lang::Zh, Lang::Ja, Lang::Zh])?;
        assert_eq!(saved, vec![Lang::Zh, Lang::Ja]);
        assert_eq!(get(&store, SELECTED_LANGUAGES)?.as_deref(), Some("zh,ja"));
        assert_eq!(selected_languages(&store)?, vec![Lang::Zh, Lang::Ja]);
        assert!(set_selected_languages(&store, &[]).is_err());
        assert_eq!(get(&store, SELECTED_LANGUAGES)?.as_deref(), Some("zh,ja"));

        set(&store, SELECTED_LANGUAGES, "ja, xx ,en,ja")?;
        assert_eq!(selected_languages(&store)?, vec![Lang::Ja, Lang::En]);
        Ok(())
    }

    #[test]
    fn categories_round_trip() -> Result<()> {
        let store = Store::open_in_memory()?;
        assert!(selected_categories(&store)?.is_empty());
        let saved = set_selected_categories(
            &store,
            &[" travel".to_string(), String::new(), "food".to_string(), "travel".to_string()],
        )?;
        assert_eq!(saved, vec!["travel", "food"]);
        assert_eq!(selected_categories(&store)?, vec!["travel", "food"]);

        set_selected_categories(&store, &[])?;
        assert!(selected_categories(&store)?.is_empty());
        Ok(())
    }
}
