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

mod bookmarks;
mod catalog;
mod cli;
mod clock;
mod config;
mod deeplink;
mod exposure;
mod model;
mod output;
mod schema;
mod settings;
mod shuffle;
mod store;
mod today;
mod transfer;
mod widget;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::CatsAction;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::LangsAction;
use crate::clock::Clock;
use crate::clock::FixedClock;
use crate::clock::SystemClock;
use crate::config::ConfigCtx;
use crate::model::InjectSource;
use crate::model::Lang;
use crate::model::Word;
use crate::model::WordDetail;
use crate::model::WordFilter;
use crate::output::JsonResponse;
use crate::output::StatsOut;
use crate::output::print_json;
use crate::output::word_line;
use crate::store::Store;
use crate::store::StoreMode;
use crate::today::TodayEngine;

const WIDGET_WRITE_FAILED: &str = "widget_write_failed";

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VOCAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("warning: tracing init failed: {err}");
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let clock = clock_from(cli.now.as_deref())?;
    match cli.command {
        Commands::Init { path, json } => handle_result(cmd_init(path, json), json),
        Commands::Today(flag) => handle_result(cmd_today(clock, flag.json), flag.json),
        Commands::Pool(flag) => handle_result(cmd_pool(clock, flag.json), flag.json),
        Commands::Inject(args) => handle_result(
            cmd_inject(clock, &args.id, args.source, args.json),
            args.json,
        ),
        Commands::Open(args) => handle_result(cmd_open(clock, &args.url, args.json), args.json),
        Commands::Show(args) => handle_result(
            cmd_show(clock, &args.id, args.source, args.json),
            args.json,
        ),
        Commands::Words(args) => handle_result(
            cmd_words(args.lang, args.category, args.json),
            args.json,
        ),
        Commands::Categories(flag) => handle_result(cmd_categories(flag.json), flag.json),
        Commands::Category(args) => {
            handle_result(cmd_category(&args.name, args.json), args.json)
        }
        Commands::Seen(args) => handle_result(cmd_seen(clock, args.limit, args.json), args.json),
        Commands::Save(args) => handle_result(cmd_save(clock, &args.id, args.json), args.json),
        Commands::Unsave(args) => handle_result(cmd_unsave(&args.id, args.json), args.json),
        Commands::Saved(flag) => handle_result(cmd_saved(flag.json), flag.json),
        Commands::Widget(flag) => handle_result(cmd_widget(clock, flag.json), flag.json),
        Commands::Langs(args) => handle_result(cmd_langs(args.action, args.json), args.json),
        Commands::Cats(args) => handle_result(cmd_cats(args.action, args.json), args.json),
        Commands::Doctor(flag) => handle_result(cmd_doctor(flag.json), flag.json),
        Commands::Export(args) => handle_result(cmd_export(args.out, args.json), args.json),
        Commands::Import(args) => handle_result(cmd_import(args.path, args.json), args.json),
    }
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let resp = JsonResponse::error("error", &format!("{err:#}"));
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn clock_from(now: Option<&str>) -> Result<Arc<dyn Clock>> {
    match now {
        Some(text) => Ok(Arc::new(FixedClock(clock::parse_instant(text)?))),
        None => Ok(Arc::new(SystemClock)),
    }
}

struct App {
    ctx: ConfigCtx,
    store: Store,
}

impl App {
    fn open(mode: StoreMode) -> Result<Self> {
        let ctx = ConfigCtx::load_from_cwd()?;
        let store = Store::open(&ctx.store_path(), mode)?;
        Ok(Self { ctx, store })
    }

    fn engine(&self, clock: Arc<dyn Clock>) -> TodayEngine {
        TodayEngine::new(self.ctx.config.today_config(), clock)
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

fn print_words(words: &[Word]) {
    for word in words {
        println!("{}", word_line(word));
    }
}

fn require_word(store: &Store, id: &str) -> Result<Word> {
    catalog::get_by_id(store, id.trim())?.with_context(|| format!("word not found: {id}"))
}

fn cmd_init(path: Option<PathBuf>, json: bool) -> Result<()> {
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&root).with_context(|| format!("create dir {root:?}"))?;

    let config = config::load_global_config()?;
    let store_path = if config.store_path.is_absolute() {
        config.store_path.clone()
    } else {
        root.join(&config.store_path)
    };
    Store::init(&store_path)?;

    if json {
        let resp = JsonResponse::ok().with_data(json!({
            "store_path": store_path.display().to_string(),
            "schema_version": schema::latest_version(schema::MIGRATIONS),
        }));
        print_json(&resp)?;
    } else {
        println!("Initialized vocab store at {}", store_path.display());
    }
    Ok(())
}

fn cmd_today(clock: Arc<dyn Clock>, json: bool) -> Result<()> {
    let started = Instant::now();
    let app = App::open(StoreMode::ReadWrite)?;
    let feed = app.engine(clock).get_today_feed(&app.store)?;
    let words = catalog::get_by_ids(&app.store, &feed.all_ids)?;

    if json {
        let resp = JsonResponse::ok()
            .with_date_key(&feed.date_key)
            .with_feed(serde_json::to_value(&feed)?)
            .with_words(&words)?
            .with_stats(StatsOut {
                took_ms: elapsed_ms(started),
                total: words.len() as i64,
                store: None,
            });
        print_json(&resp)?;
    } else {
        println!("Today {} [{}]", feed.date_key, feed.language_key);
        for word in &words {
            let marker = if feed.injected_ids.contains(&word.id) {
                "*"
            } else {
                " "
            };
            println!("{marker} {}", word_line(word));
        }
    }
    Ok(())
}

fn cmd_pool(clock: Arc<dyn Clock>, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let engine = app.engine(clock);
    let date_key = engine.today_key()?;
    let langs = settings::selected_languages(&app.store)?;
    let ids = engine.auto_pool_for(&app.store, &date_key, &langs)?;
    let words = catalog::get_by_ids(&app.store, &ids)?;

    if json {
        let resp = JsonResponse::ok()
            .with_date_key(&date_key)
            .with_data(json!({
                "language_key": today::language_key(&langs),
                "word_ids": ids,
            }))
            .with_words(&words)?;
        print_json(&resp)?;
    } else {
        println!("Pool {date_key} [{}]", today::language_key(&langs));
        print_words(&words);
    }
    Ok(())
}

fn cmd_inject(clock: Arc<dyn Clock>, id: &str, source: InjectSource, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let word = require_word(&app.store, id)?;
    let engine = app.engine(clock);
    engine.inject_today_word(&app.store, &word.id, source)?;
    let date_key = engine.today_key()?;

    if json {
        let resp = JsonResponse::ok()
            .with_date_key(&date_key)
            .with_data(json!({"word_id": word.id, "source": source}));
        print_json(&resp)?;
    } else {
        println!("Injected {} ({source}) into {date_key}", word.id);
    }
    Ok(())
}

fn print_detail(detail: &WordDetail, json: bool) -> Result<()> {
    if json {
        let resp = JsonResponse::ok().with_data(serde_json::to_value(detail)?);
        print_json(&resp)?;
        return Ok(());
    }
    println!("{}", word_line(&detail.word));
    if detail.bookmarked {
        println!("saved");
    }
    for example in &detail.examples {
        println!("  {}", example.sentence_native);
        if let Some(reading) = &example.sentence_reading {
            println!("  {reading}");
        }
        println!("  {}", example.sentence_ko);
    }
    Ok(())
}

fn cmd_open(clock: Arc<dyn Clock>, url: &str, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let link = deeplink::parse_deep_link(&app.ctx.config.deep_link_scheme, url)
        .with_context(|| format!("not a word link: {url}"))?;
    let detail = app
        .engine(clock)
        .open_word(&app.store, &link.word_id, Some(link.source))?
        .with_context(|| format!("word not found: {}", link.word_id))?;
    print_detail(&detail, json)
}

fn cmd_show(clock: Arc<dyn Clock>, id: &str, source: Option<InjectSource>, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let detail = app
        .engine(clock)
        .open_word(&app.store, id, source)?
        .with_context(|| format!("word not found: {id}"))?;
    print_detail(&detail, json)
}

fn cmd_words(langs: Vec<Lang>, categories: Vec<String>, json: bool) -> Result<()> {
    let started = Instant::now();
    let app = App::open(StoreMode::ReadOnly)?;
    let filter = WordFilter {
        langs: if langs.is_empty() {
            settings::selected_languages_or_all(&app.store)?
        } else {
            langs
        },
        categories: if categories.is_empty() {
            settings::selected_categories(&app.store)?
        } else {
            categories
        },
    };
    let words = catalog::get_by_filters(&app.store, &filter)?;

    if json {
        let resp = JsonResponse::ok()
            .with_words(&words)?
            .with_stats(StatsOut {
                took_ms: elapsed_ms(started),
                total: words.len() as i64,
                store: None,
            });
        print_json(&resp)?;
    } else {
        print_words(&words);
    }
    Ok(())
}

fn cmd_categories(json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadOnly)?;
    let langs = settings::selected_languages_or_all(&app.store)?;
    let categories = catalog::list_categories(&app.store, &langs)?;

    if json {
        let resp = JsonResponse::ok()
            .with_results(categories.into_iter().map(serde_json::Value::from).collect());
        print_json(&resp)?;
    } else {
        for category in categories {
            println!("{category}");
        }
    }
    Ok(())
}

fn cmd_category(name: &str, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadOnly)?;
    let langs = settings::selected_languages_or_all(&app.store)?;
    let words = catalog::get_by_category(&app.store, name.trim(), &langs)?;

    if json {
        let resp = JsonResponse::ok().with_words(&words)?;
        print_json(&resp)?;
    } else {
        print_words(&words);
    }
    Ok(())
}

fn cmd_seen(clock: Arc<dyn Clock>, limit: Option<usize>, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadOnly)?;
    let limit = limit.unwrap_or(app.ctx.config.exposure_limit);
    let ids = exposure::todays_word_ids(&app.store, clock.as_ref(), limit)?;
    let words = catalog::get_by_ids(&app.store, &ids)?;

    if json {
        let resp = JsonResponse::ok()
            .with_date_key(&clock::utc_day(clock.now())?)
            .with_data(json!({"word_ids": ids}))
            .with_words(&words)?;
        print_json(&resp)?;
    } else {
        print_words(&words);
    }
    Ok(())
}

fn cmd_save(clock: Arc<dyn Clock>, id: &str, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let word = require_word(&app.store, id)?;
    bookmarks::upsert(&app.store, clock.as_ref(), &word.id)?;
    let bookmark = bookmarks::get(&app.store, &word.id)?;

    if json {
        let resp = JsonResponse::ok().with_data(serde_json::to_value(&bookmark)?);
        print_json(&resp)?;
    } else {
        println!("Saved {}", word.id);
    }
    Ok(())
}

fn cmd_unsave(id: &str, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let removed = bookmarks::remove(&app.store, id.trim())?;

    if json {
        let resp = JsonResponse::ok().with_data(json!({"word_id": id.trim(), "removed": removed}));
        print_json(&resp)?;
    } else if removed {
        println!("Removed {}", id.trim());
    } else {
        println!("{} was not saved", id.trim());
    }
    Ok(())
}

fn cmd_saved(json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadOnly)?;
    let words = bookmarks::all_sorted(&app.store)?;

    if json {
        let resp = JsonResponse::ok().with_words(&words)?;
        print_json(&resp)?;
    } else {
        print_words(&words);
    }
    Ok(())
}

fn cmd_widget(clock: Arc<dyn Clock>, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let engine = app.engine(clock);
    let Some(word) = widget::pick_next_widget_word(
        &app.store,
        &engine,
        app.ctx.config.exposure_limit,
        &mut rand::rng(),
    )? else {
        if json {
            let resp = JsonResponse::ok()
                .with_data(json!({"word": null}))
                .with_warnings(vec!["today's feed is empty; widget left unchanged".to_string()]);
            print_json(&resp)?;
        } else {
            println!("Today's feed is empty; widget left unchanged");
        }
        return Ok(());
    };

    let host = app.ctx.config.widget_host();
    let written = widget::write_widget_snapshot(host.as_ref(), &app.ctx.config.widget.snapshot_file, &word);
    match (written, json) {
        (Ok(path), true) => {
            let resp = JsonResponse::ok().with_data(json!({
                "word": widget::WidgetSnapshot::from(&word),
                "path": path.display().to_string(),
            }));
            print_json(&resp)
        }
        (Ok(path), false) => {
            println!("{}", word_line(&word));
            println!("Wrote {}", path.display());
            Ok(())
        }
        (Err(err), true) => {
            let resp = JsonResponse::error(WIDGET_WRITE_FAILED, &format!("{err:#}"))
                .with_hint("set widget.app_group_dir in vocab.toml, then retry");
            print_json(&resp)
        }
        (Err(err), false) => Err(err.context("failed to update widget")),
    }
}

fn cmd_langs(action: Option<LangsAction>, json: bool) -> Result<()> {
    let langs = match action {
        Some(LangsAction::Set { langs }) => {
            let app = App::open(StoreMode::ReadWrite)?;
            settings::set_selected_languages(&app.store, &langs)?
        }
        None => {
            let app = App::open(StoreMode::ReadOnly)?;
            settings::selected_languages(&app.store)?
        }
    };

    if json {
        let resp = JsonResponse::ok().with_data(json!({
            "languages": langs,
            "language_key": today::language_key(&langs),
        }));
        print_json(&resp)?;
    } else {
        let codes: Vec<&str> = langs.iter().map(|lang| lang.code()).collect();
        println!("{}", codes.join(","));
    }
    Ok(())
}

fn cmd_cats(action: Option<CatsAction>, json: bool) -> Result<()> {
    let categories = match action {
        Some(CatsAction::Set { categories }) => {
            let app = App::open(StoreMode::ReadWrite)?;
            settings::set_selected_categories(&app.store, &categories)?
        }
        None => {
            let app = App::open(StoreMode::ReadOnly)?;
            settings::selected_categories(&app.store)?
        }
    };

    if json {
        let resp = JsonResponse::ok().with_data(json!({"categories": categories}));
        print_json(&resp)?;
    } else if categories.is_empty() {
        println!("(all categories)");
    } else {
        println!("{}", categories.join(","));
    }
    Ok(())
}

fn cmd_doctor(json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadOnly)?;
    let report = app.store.integrity_check()?;

    if json {
        let resp = JsonResponse::ok()
            .with_data(json!({
                "integrity": report.status,
                "schema_version": report.schema_version,
            }))
            .with_stats(StatsOut {
                took_ms: 0,
                total: report.stats.words,
                store: Some(report.stats),
            });
        print_json(&resp)?;
    } else {
        println!("Integrity: {}", report.status);
        println!("Schema version: {}", report.schema_version);
        println!("Words: {}", report.stats.words);
        println!("Examples: {}", report.stats.examples);
        println!("Bookmarks: {}", report.stats.bookmarks);
        println!("Exposures: {}", report.stats.exposures);
        println!("DB size: {} bytes", report.stats.db_size_bytes);
    }
    Ok(())
}

fn cmd_export(out: Option<PathBuf>, json: bool) -> Result<()> {
    if json && out.is_none() {
        anyhow::bail!("--json requires --out for export");
    }
    let app = App::open(StoreMode::ReadOnly)?;

    let stats = if let Some(path) = out {
        let file =
            std::fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
        transfer::export_store(&app.store, file)?
    } else {
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        transfer::export_store(&app.store, handle)?
    };

    if json {
        let resp = JsonResponse::ok()
            .with_data(serde_json::to_value(stats)?)
            .with_stats(StatsOut {
                took_ms: 0,
                total: (stats.words + stats.examples) as i64,
                store: None,
            });
        print_json(&resp)?;
    }
    Ok(())
}

fn cmd_import(path: PathBuf, json: bool) -> Result<()> {
    let app = App::open(StoreMode::ReadWrite)?;
    let file = std::fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let stats = transfer::import_store(&app.store, file)?;

    if json {
        let resp = JsonResponse::ok()
            .with_data(serde_json::to_value(stats)?)
            .with_stats(StatsOut {
                took_ms: 0,
                total: (stats.words + stats.examples) as i64,
                store: None,
            });
        print_json(&resp)?;
    } else {
        println!(
            "Imported {} words, {} examples ({} already present)",
            stats.words, stats.examples, stats.skipped
        );
    }
    Ok(())
}
