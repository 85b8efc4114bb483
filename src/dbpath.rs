use crate::scheme::SCHEME_VERSION;
use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "index.redb";
pub const META_FILE: &str = "meta.toml";
pub const LOCK_FILE: &str = "LOCK";

const APP: &str = "schemestore";
const META_FORMAT: u32 = 1;

/// A bare name lives under the platform data directory; anything with a
/// path separator is used as given.
pub fn resolve_store_dir(db: &str) -> Result<PathBuf> {
    if db.contains('/') || db.contains('\\') {
        return Ok(PathBuf::from(db));
    }
    let proj = ProjectDirs::from("io", APP, APP)
        .ok_or_else(|| anyhow!("Unable to determine platform data directory"))?;
    Ok(proj.data_dir().join(db))
}

/// Contents of `meta.toml`. Only the keys this crate writes are understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMeta {
    pub format: u32,
    pub app: String,
    pub scheme_format: u32,
}

impl StoreMeta {
    pub fn current() -> Self {
        Self {
            format: META_FORMAT,
            app: APP.to_string(),
            scheme_format: SCHEME_VERSION,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "# schemestore metadata\nformat = {}\napp = \"{}\"\ndb_kind = \"redb\"\nscheme_format = {}\n",
            self.format, self.app, self.scheme_format
        )
    }

    /// Flat `key = value` lines; comments, blank lines and unknown keys are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut format = None;
        let mut app = None;
        let mut scheme_format = None;

        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow!("{META_FILE}:{}: expected key = value", n + 1))?;
            let value = value.trim();
            let number = || {
                value
                    .parse::<u32>()
                    .with_context(|| format!("{META_FILE}:{}: {} is not a number", n + 1, key.trim()))
            };
            match key.trim() {
                "format" => format = Some(number()?),
                "scheme_format" => scheme_format = Some(number()?),
                "app" => app = Some(value.trim_matches('"').to_string()),
                _ => {}
            }
        }

        Ok(Self {
            format: format.ok_or_else(|| anyhow!("{META_FILE} has no format"))?,
            app: app.ok_or_else(|| anyhow!("{META_FILE} has no app"))?,
            scheme_format: scheme_format.ok_or_else(|| anyhow!("{META_FILE} has no scheme_format"))?,
        })
    }

    /// A store written by another tool, or by a newer release whose schemes
    /// this build cannot decode, is refused before it is opened.
    pub fn check_compatible(&self) -> Result<()> {
        if self.app != APP {
            bail!("Store belongs to {:?}, not {APP}", self.app);
        }
        if self.format != META_FORMAT {
            bail!("Unsupported store format {} (expected {META_FORMAT})", self.format);
        }
        if self.scheme_format > SCHEME_VERSION {
            bail!(
                "Store uses scheme format {}, this build reads up to {SCHEME_VERSION}",
                self.scheme_format
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreDirState {
    /// Directory exists but is empty, or it was created just now.
    Empty,
    /// Directory holds a compatible store.
    Existing(StoreMeta),
}

/// Missing or empty directories are new stores. A non-empty directory must
/// hold `index.redb` plus a `meta.toml` this build accepts.
pub fn inspect_store_dir(store_dir: &Path) -> Result<StoreDirState> {
    if !store_dir.exists() {
        fs::create_dir_all(store_dir)
            .with_context(|| format!("Failed to create {}", store_dir.display()))?;
        return Ok(StoreDirState::Empty);
    }
    if !store_dir.is_dir() {
        bail!("Store path exists but is not a directory");
    }

    let mut entries = fs::read_dir(store_dir)
        .with_context(|| format!("Failed to read directory {}", store_dir.display()))?;
    if entries.next().is_none() {
        return Ok(StoreDirState::Empty);
    }

    let meta_path = store_dir.join(META_FILE);
    if !store_dir.join(DB_FILE).is_file() || !meta_path.is_file() {
        bail!("Directory exists but does not look like a scheme store (expected {META_FILE} and {DB_FILE})");
    }
    let text = fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read {}", meta_path.display()))?;
    let meta = StoreMeta::parse(&text)?;
    meta.check_compatible()
        .with_context(|| format!("Refusing to open {}", store_dir.display()))?;
    Ok(StoreDirState::Existing(meta))
}
