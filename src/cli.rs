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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::model::InjectSource;
use crate::model::Lang;

#[derive(Parser, Debug)]
#[command(name = "vocab", version, about = "Daily vocabulary feed on a local store")]
pub struct Cli {
    /// Pin the clock to an RFC3339 instant
    #[arg(long, global = true, value_name = "RFC3339")]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct JsonFlag {
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new store
    Init {
        /// Directory to hold the store
        path: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show today's feed
    Today(JsonFlag),

    /// Show today's auto-pool for the selected languages
    Pool(JsonFlag),

    /// Put a word on today's feed
    Inject(InjectArgs),

    /// Open a deep link (scheme://word/<id>)
    Open(OpenArgs),

    /// Open a word's detail view
    Show(ShowArgs),

    /// List words
    Words(WordsArgs),

    /// List categories for the selected languages
    Categories(JsonFlag),

    /// List words in one category
    Category(CategoryArgs),

    /// Words seen today, most recent first
    Seen(SeenArgs),

    /// Bookmark a word
    Save(WordIdArgs),

    /// Remove a bookmark
    Unsave(WordIdArgs),

    /// Bookmarked words in review order
    Saved(JsonFlag),

    /// Pick a word and write the widget snapshot
    Widget(JsonFlag),

    /// Show or set the selected languages
    Langs(LangsArgs),

    /// Show or set the selected categories
    Cats(CatsArgs),

    /// Run integrity checks
    Doctor(JsonFlag),

    /// Export the catalog as JSONL
    Export(ExportArgs),

    /// Import a JSONL catalog
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct InjectArgs {
    /// Word id
    pub id: String,

    /// Where the word came from
    #[arg(long, default_value = "deeplink")]
    pub source: InjectSource,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Deep link URL
    pub url: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Word id
    pub id: String,

    /// Treat the visit as coming from outside the app
    #[arg(long)]
    pub source: Option<InjectSource>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WordsArgs {
    /// Languages (repeatable); defaults to the selected languages
    #[arg(long)]
    pub lang: Vec<Lang>,

    /// Categories (repeatable); defaults to the selected categories
    #[arg(long)]
    pub category: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CategoryArgs {
    /// Category name
    pub name: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SeenArgs {
    /// Max ids to return
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WordIdArgs {
    /// Word id
    pub id: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LangsArgs {
    #[command(subcommand)]
    pub action: Option<LangsAction>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum LangsAction {
    /// Replace the selection
    Set {
        #[arg(required = true)]
        langs: Vec<Lang>,
    },
}

#[derive(Args, Debug)]
pub struct CatsArgs {
    #[command(subcommand)]
    pub action: Option<CatsAction>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum CatsAction {
    /// Replace the selection; no names clears it
    Set { categories: Vec<String> },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (defaults to stdout)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output JSON stats (requires --out)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Input file (JSONL)
    pub path: PathBuf,

    /// Output JSON stats
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_now_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vocab",
            "inject",
            "ja_1",
            "--source",
            "widget",
            "--now",
            "2026-03-01T00:00:00Z",
        ])
        .expect("valid arguments");
        assert_eq!(cli.now.as_deref(), Some("2026-03-01T00:00:00Z"));
        match cli.command {
            Commands::Inject(args) => {
                assert_eq!(args.id, "ja_1");
                assert_eq!(args.source, InjectSource::Widget);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["vocab", "inject", "ja_1", "--source", "nope"]).is_err());
    }
}
