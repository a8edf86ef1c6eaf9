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

//! Shared domain types used by the catalog, the feed engine, and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Ja,
    Zh,
}

impl Lang {
    pub const ALL: [Lang; 3] = [Lang::En, Lang::Ja, Lang::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ja => "ja",
            Lang::Zh => "zh",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "en" => Some(Lang::En),
            "ja" => Some(Lang::Ja),
            "zh" => Some(Lang::Zh),
            _ => None,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lang::from_code(s).ok_or_else(|| format!("unknown language {s:?} (expected en, ja or zh)"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    pub id: String,
    pub lang: Lang,
    pub word: String,
    pub reading: Option<String>,
    pub meaning_ko: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    pub id: String,
    pub word_id: String,
    pub sentence_native: String,
    pub sentence_reading: Option<String>,
    pub sentence_ko: String,
    pub context_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub word_id: String,
    pub created_at: String,
    pub last_viewed_at: Option<String>,
}

/// Where a word surfaced from outside the app's own sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectSource {
    Widget,
    Lockscreen,
    Deeplink,
}

impl InjectSource {
    pub fn as_str(self) -> &'static str {
        match self {
            InjectSource::Widget => "widget",
            InjectSource::Lockscreen => "lockscreen",
            InjectSource::Deeplink => "deeplink",
        }
    }
}

impl fmt::Display for InjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InjectSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "widget" => Ok(InjectSource::Widget),
            "lockscreen" => Ok(InjectSource::Lockscreen),
            "deeplink" => Ok(InjectSource::Deeplink),
            other => Err(format!(
                "unknown source {other:?} (expected widget, lockscreen or deeplink)"
            )),
        }
    }
}

/// Everything the detail view needs after opening a word.
#[derive(Debug, Clone, Serialize)]
pub struct WordDetail {
    pub word: Word,
    pub examples: Vec<Example>,
    pub bookmarked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injected: Option<InjectSource>,
}

#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    pub langs: Vec<Lang>,
    pub categories: Vec<String>,
}
