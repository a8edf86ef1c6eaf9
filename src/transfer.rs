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

//! JSONL import/export of the reference catalog (words and examples).

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::catalog;
use crate::catalog::NewExample;
use crate::catalog::NewWord;
use crate::model::Example;
use crate::model::Lang;
use crate::model::Word;
use crate::model::WordFilter;
use crate::store::Store;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Line {
    Word {
        id: String,
        lang: Lang,
        word: String,
        #[serde(default)]
        reading: Option<String>,
        meaning_ko: String,
        #[serde(default)]
        category: String,
    },
    Example {
        id: String,
        word_id: String,
        sentence_native: String,
        #[serde(default)]
        sentence_reading: Option<String>,
        sentence_ko: String,
        #[serde(default)]
        context_tag: String,
    },
}

impl From<Word> for Line {
    fn from(word: Word) -> Self {
        Line::Word {
            id: word.id,
            lang: word.lang,
            word: word.word,
            reading: word.reading,
            meaning_ko: word.meaning_ko,
            category: word.category,
        }
    }
}

impl From<Example> for Line {
    fn from(example: Example) -> Self {
        Line::Example {
            id: example.id,
            word_id: example.word_id,
            sentence_native: example.sentence_native,
            sentence_reading: example.sentence_reading,
            sentence_ko: example.sentence_ko,
            context_tag: example.context_tag,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub words: usize,
    pub examples: usize,
    /// Rows already present, left untouched by an import.
    pub skipped: usize,
}

pub fn export_store(store: &Store, mut writer: impl Write) -> Result<TransferStats> {
    let mut stats = TransferStats::default();
    for word in catalog::get_by_filters(store, &WordFilter::default())? {
        let line = serde_json::to_string(&Line::from(word))?;
        writeln!(writer, "{line}")?;
        stats.words += 1;
    }
    for example in catalog::all_examples(store)? {
        let line = serde_json::to_string(&Line::from(example))?;
        writeln!(writer, "{line}")?;
        stats.examples += 1;
    }
    writer.flush()?;
    Ok(stats)
}

/// Inserts every line that is not already present. A malformed line aborts
/// the whole import.
pub fn import_store(store: &Store, reader: impl std::io::Read) -> Result<TransferStats> {
    let mut stats = TransferStats::default();
    let mut buf = BufReader::new(reader);

    store.conn.execute_batch("BEGIN IMMEDIATE")?;
    let res = (|| -> Result<()> {
        let layout = store.layout();
        let mut line = String::new();
        let mut line_no = 0usize;
        loop {
            line.clear();
            let bytes = buf.read_line(&mut line)?;
            if bytes == 0 {
                break;
            }
            line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed: Line = serde_json::from_str(trimmed)
                .with_context(|| format!("parse import line {line_no}: {trimmed}"))?;
            let inserted = match &parsed {
                Line::Word {
                    id,
                    lang,
                    word,
                    reading,
                    meaning_ko,
                    category,
                } => {
                    if id.trim().is_empty() {
                        anyhow::bail!("import line {line_no}: word id is empty");
                    }
                    let inserted = layout.insert_word(
                        &store.conn,
                        &NewWord {
                            id,
                            lang: *lang,
                            word,
                            reading: reading.as_deref(),
                            meaning_ko,
                            category,
                        },
                    )?;
                    stats.words += inserted;
                    inserted
                }
                Line::Example {
                    id,
                    word_id,
                    sentence_native,
                    sentence_reading,
                    sentence_ko,
                    context_tag,
                } => {
                    if id.trim().is_empty() {
                        anyhow::bail!("import line {line_no}: example id is empty");
                    }
                    let inserted = layout.insert_example(
                        &store.conn,
                        &NewExample {
                            id,
                            word_id,
                            sentence_native,
                            sentence_reading: sentence_reading.as_deref(),
                            sentence_ko,
                            context_tag,
                        },
                    )?;
                    stats.examples += inserted;
                    inserted
                }
            };
            if inserted == 0 {
                stats.skipped += 1;
            }
        }
        Ok(())
    })();

    if let Err(err) = res {
        store.conn.execute_batch("ROLLBACK")?;
        return Err(err);
    }

    store.conn.execute_batch("COMMIT")?;
    info!(
        words = stats.words,
        examples = stats.examples,
        skipped = stats.skipped,
        "imported catalog"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_then_import_into_fresh_store() -> Result<()> {
        let source = Store::open_in_memory()?;
        let mut buf = Vec::new();
        let exported = export_store(&source, &mut buf)?;
        assert_eq!(exported.words, 10);
        assert_eq!(exported.examples, 3);

        let text = String::from_utf8(buf.clone())?;
        let first = text.lines().next().expect("one line per row");
        let value: serde_json::Value = serde_json::from_str(first)?;
        assert_eq!(value["type"], "word");
        assert_eq!(value["id"], "en_1");

        // The seed already holds every row.
        let target = Store::open_in_memory()?;
        let stats = import_store(&target, buf.as_slice())?;
        assert_eq!(stats.words, 0);
        assert_eq!(stats.skipped, 13);
        Ok(())
    }

    #[test]
    fn import_adds_new_rows() -> Result<()> {
        let store = Store::open_in_memory()?;
        let input = concat!(
            r#"{"type":"word","id":"ja_4","lang":"ja","word":"海","reading":"うみ","meaning_ko":"바다","category":"travel"}"#,
            "\n\n",
            r#"{"type":"example","id":"ex_ja_4","word_id":"ja_4","sentence_native":"海が見える。","sentence_reading":"うみがみえる。","sentence_ko":"바다가 보인다.","context_tag":"travel"}"#,
            "\n",
        );
        let stats = import_store(&store, input.as_bytes())?;
        assert_eq!(
            stats,
            TransferStats {
                words: 1,
                examples: 1,
                skipped: 0
            }
        );
        let word = catalog::get_by_id(&store, "ja_4")?.expect("imported word");
        assert_eq!(word.reading.as_deref(), Some("うみ"));
        let examples = catalog::get_examples_by_word_id(&store, "ja_4")?;
        assert_eq!(examples[0].sentence_reading.as_deref(), Some("うみがみえる。"));
        Ok(())
    }

    #[test]
    fn malformed_line_rolls_back() -> Result<()> {
        let store = Store::open_in_memory()?;
        let input = concat!(
            r#"{"type":"word","id":"en_9","lang":"en","word":"brisk","meaning_ko":"상쾌한","category":"daily"}"#,
            "\n",
            r#"{"type":"word","id":"fr_1","lang":"fr","word":"bonjour","meaning_ko":"안녕"}"#,
            "\n",
        );
        let err = import_store(&store, input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(catalog::get_by_id(&store, "en_9")?.is_none());
        Ok(())
    }
}
