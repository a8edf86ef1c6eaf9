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

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use time::UtcOffset;
use tracing::warn;

use crate::clock;
use crate::deeplink;
use crate::exposure;
use crate::today;
use crate::today::TodayConfig;
use crate::widget;
use crate::widget::CommandHost;
use crate::widget::NullHost;
use crate::widget::WidgetHost;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub auto_per_language: usize,
    pub recent_pool_window: usize,
    pub exposure_limit: usize,
    pub injected_limit: usize,
    pub reference_utc_offset: String,
    pub deep_link_scheme: String,
    pub widget: WidgetConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("vocab.db"),
            auto_per_language: today::AUTO_PER_LANGUAGE,
            recent_pool_window: today::RECENT_POOL_WINDOW,
            exposure_limit: exposure::DEFAULT_EXPOSURE_LIMIT,
            injected_limit: today::INJECTED_LIMIT,
            reference_utc_offset: "+09:00".to_string(),
            deep_link_scheme: deeplink::DEFAULT_SCHEME.to_string(),
            widget: WidgetConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub app_group_dir: Option<PathBuf>,
    pub snapshot_file: String,
    /// argv run after every snapshot write.
    pub reload_command: Vec<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            app_group_dir: None,
            snapshot_file: widget::DEFAULT_SNAPSHOT_FILE.to_string(),
            reload_command: Vec::new(),
        }
    }
}

impl Config {
    pub fn reference_offset(&self) -> UtcOffset {
        match clock::parse_offset(&self.reference_utc_offset) {
            Some(offset) => offset,
            None => {
                warn!(
                    value = %self.reference_utc_offset,
                    "invalid reference_utc_offset; using +09:00"
                );
                clock::DEFAULT_REFERENCE_OFFSET
            }
        }
    }

    pub fn today_config(&self) -> TodayConfig {
        TodayConfig {
            auto_per_language: self.auto_per_language,
            recent_pool_window: self.recent_pool_window,
            injected_limit: self.injected_limit,
            reference_offset: self.reference_offset(),
        }
    }

    pub fn widget_host(&self) -> Box<dyn WidgetHost> {
        match &self.widget.app_group_dir {
            Some(dir) => Box::new(CommandHost {
                dir: dir.clone(),
                reload_command: self.widget.reload_command.clone(),
            }),
            None => Box::new(NullHost),
        }
    }

    fn normalize(&mut self) {
        self.auto_per_language = self.auto_per_language.max(1);
        self.exposure_limit = self.exposure_limit.max(1);
        self.injected_limit = self.injected_limit.max(1);
        if self.widget.snapshot_file.trim().is_empty() {
            self.widget.snapshot_file = widget::DEFAULT_SNAPSHOT_FILE.to_string();
        }
        if self.deep_link_scheme.trim().is_empty() {
            self.deep_link_scheme = deeplink::DEFAULT_SCHEME.to_string();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
}

impl ConfigCtx {
    pub fn load_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd)
    }

    pub fn load_from(start: &Path) -> Result<Self> {
        let config = load_global_config()?;
        let root = find_store_root(start, &config.store_path)
            .ok_or_else(|| anyhow::anyhow!("store not found; run `vocab init` first"))?;
        Ok(Self { root, config })
    }

    pub fn store_path(&self) -> PathBuf {
        if self.config.store_path.is_absolute() {
            self.config.store_path.clone()
        } else {
            self.root.join(&self.config.store_path)
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("AppData").join("Roaming"));
        }
        return None;
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("vocab").join("vocab.toml"))
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

pub fn find_store_root(start: &Path, store_path: &Path) -> Option<PathBuf> {
    if store_path.is_absolute() {
        return store_path
            .exists()
            .then(|| store_path.parent().unwrap_or(store_path).to_path_buf());
    }

    let mut cur = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        let candidate = cur.join(store_path);
        if candidate.exists() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => return None,
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config = toml::from_str(&text).context("parse vocab.toml")?;
    config.normalize();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use tempfile::tempdir;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn config_path(config_root: &Path) -> PathBuf {
        let base = if cfg!(target_os = "macos") {
            config_root.join("Library").join("Application Support")
        } else {
            config_root.to_path_buf()
        };
        base.join("vocab").join("vocab.toml")
    }

    fn with_env<T>(config_root: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let old_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        let old_home = std::env::var("HOME").ok();
        let old_appdata = std::env::var("APPDATA").ok();
        set_env_var("XDG_CONFIG_HOME", config_root);
        set_env_var("HOME", config_root);
        set_env_var("APPDATA", config_root);
        let result = f();
        match old_xdg {
            Some(val) => set_env_var("XDG_CONFIG_HOME", val),
            None => remove_env_var("XDG_CONFIG_HOME"),
        }
        match old_home {
            Some(val) => set_env_var("HOME", val),
            None => remove_env_var("HOME"),
        }
        match old_appdata {
            Some(val) => set_env_var("APPDATA", val),
            None => remove_env_var("APPDATA"),
        }
        result
    }

    fn set_env_var(key: &str, value: impl AsRef<std::ffi::OsStr>) {
        unsafe {
            std::env::set_var(key, value);
        }
    }

    fn remove_env_var(key: &str) {
        unsafe {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn find_store_root_walks_up() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("home");
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(root.join("vocab.db"), "stub").expect("write db");

        let found = find_store_root(&nested, Path::new("vocab.db"));
        let expected = root.canonicalize().unwrap_or(root);
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn load_from_errors_when_store_missing() {
        let config_dir = tempdir().expect("config dir");
        let work_dir = tempdir().expect("work dir");
        with_env(config_dir.path(), || {
            let err = ConfigCtx::load_from(work_dir.path()).unwrap_err();
            assert!(err.to_string().contains("store not found"));
        });
    }

    #[test]
    fn global_config_overrides_and_clamps() {
        let config_dir = tempdir().expect("config dir");
        let work_dir = tempdir().expect("work dir");
        let path = config_path(config_dir.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let group_dir = config_dir.path().join("group");
        std::fs::create_dir_all(&group_dir).expect("mkdir");
        std::fs::write(
            &path,
            format!(
                "store_path = \"data/words.db\"\nauto_per_language = 0\nreference_utc_offset = \"nowhere\"\n\n[widget]\napp_group_dir = {:?}\n",
                group_dir.display().to_string()
            ),
        )
        .expect("write config");
        std::fs::create_dir_all(work_dir.path().join("data")).expect("mkdir");
        std::fs::write(work_dir.path().join("data").join("words.db"), "stub").expect("write db");

        with_env(config_dir.path(), || {
            let ctx = ConfigCtx::load_from(work_dir.path()).expect("config loads");
            assert_eq!(ctx.config.auto_per_language, 1);
            assert_eq!(ctx.config.recent_pool_window, 7);
            assert_eq!(ctx.config.widget.snapshot_file, "widget_word.json");
            assert_eq!(ctx.config.reference_offset(), clock::DEFAULT_REFERENCE_OFFSET);
            assert!(ctx.store_path().ends_with("data/words.db"));

            let host = ctx.config.widget_host();
            assert_eq!(host.container_dir().expect("configured dir"), group_dir);
        });
    }

    #[test]
    fn defaults_without_config_file() {
        let config = Config::default();
        let today = config.today_config();
        assert_eq!(today.auto_per_language, 5);
        assert_eq!(today.injected_limit, 200);
        assert_eq!(today.reference_offset, clock::DEFAULT_REFERENCE_OFFSET);
        assert_eq!(config.deep_link_scheme, "vocab");
        assert!(config.widget.app_group_dir.is_none());
        assert!(config.widget_host().container_dir().is_err());
    }
}
