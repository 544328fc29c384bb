use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use config::{Config as HierarchicalConfig, Environment};
use pokedex_catalog::debounce::DEFAULT_SEARCH_DEBOUNCE;
use pokedex_catalog::{
    CatalogClientConfig,
    DEFAULT_CATALOG_URL,
    DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
    POKEDEX_CATALOG_MOCK_VAR,
    SessionConfig,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xdg::BaseDirectories;

/// Name of pokedex managed directories (config, data)
const POKEDEX_DIR_NAME: &str = "pokedex";
const POKEDEX_CONFIG_DIR_VAR: &str = "POKEDEX_CONFIG_DIR";
const POKEDEX_ENV_PREFIX: &str = "POKEDEX_";
pub const POKEDEX_CONFIG_FILE: &str = "pokedex.toml";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// The URL of the catalog API
    // Using a URL here adds an extra trailing slash,
    // so just use a String.
    pub catalog_url: String,

    /// Number of entries requested per page
    pub page_size: u32,

    /// How long search input has to be stable before results update
    pub search_debounce_ms: u64,

    /// Directory where favorites are stored (default: `$XDG_DATA_HOME/pokedex`)
    pub data_dir: PathBuf,

    /// Directory the configuration file is loaded from (default:
    /// `$XDG_CONFIG_HOME/pokedex`)
    pub config_dir: PathBuf,

    /// Sent instead of the default `User-Agent`
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Additional headers sent with every catalog request
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl Config {
    /// Creates a [Config] from the environment and config files
    ///
    /// Sources are layered, later ones taking precedence:
    /// built-in defaults, `/etc/pokedex/pokedex.toml`, files found in the XDG
    /// config directories, the file in `$POKEDEX_CONFIG_DIR` and finally
    /// `POKEDEX_*` environment variables.
    pub fn parse() -> Result<Config> {
        let pokedex_dirs = BaseDirectories::with_prefix(POKEDEX_DIR_NAME);

        let data_dir = pokedex_dirs
            .get_data_home()
            .context("Could not determine data directory")?;

        let config_dir = match env::var(POKEDEX_CONFIG_DIR_VAR) {
            Ok(v) => {
                debug!("`${POKEDEX_CONFIG_DIR_VAR}` set: {v}");
                PathBuf::from(v)
            },
            Err(_) => {
                let config_dir = pokedex_dirs
                    .get_config_home()
                    .context("Could not determine config directory")?;
                debug!("`${POKEDEX_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                config_dir
            },
        };

        let mut files = vec![
            PathBuf::from("/etc")
                .join(POKEDEX_DIR_NAME)
                .join(POKEDEX_CONFIG_FILE),
        ];
        files.extend(pokedex_dirs.find_config_files(POKEDEX_CONFIG_FILE));
        files.push(config_dir.join(POKEDEX_CONFIG_FILE));

        Self::from_sources(&data_dir, &config_dir, &files, env::vars())
    }

    /// Layer `files` and `vars` over the defaults.
    ///
    /// Missing files are skipped, only variables prefixed with `POKEDEX_` are
    /// considered.
    pub(crate) fn from_sources(
        data_dir: &Path,
        config_dir: &Path,
        files: &[PathBuf],
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Config> {
        let mut builder = HierarchicalConfig::builder()
            .set_default("catalog_url", DEFAULT_CATALOG_URL)?
            .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .set_default(
                "search_debounce_ms",
                DEFAULT_SEARCH_DEBOUNCE.as_millis() as i64,
            )?
            .set_default("data_dir", data_dir.to_string_lossy().into_owned())?
            // Config dir is added to the config for completeness;
            // the config file cannot change the config dir.
            .set_override("config_dir", config_dir.to_string_lossy().into_owned())?;

        for file in files {
            debug!(file = %file.display(), "adding config source");
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        // override via env variables
        let pokedex_envs = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(POKEDEX_ENV_PREFIX)
                    .map(|k| (k.to_owned(), v))
            })
            .filter(|(k, _)| {
                ![POKEDEX_CONFIG_DIR_VAR, POKEDEX_CATALOG_MOCK_VAR]
                    .iter()
                    .any(|reserved| reserved.strip_prefix(POKEDEX_ENV_PREFIX) == Some(k.as_str()))
            })
            .collect::<HashMap<_, _>>();

        let builder = builder.add_source(
            Environment::default()
                .source(Some(pokedex_envs))
                .try_parsing(true),
        );

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("Could not parse config")?;

        if !(1..=MAX_PAGE_SIZE).contains(&config.page_size) {
            bail!(
                "'page_size' must be between 1 and {MAX_PAGE_SIZE}, got {}",
                config.page_size
            );
        }
        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            page_size: self.page_size,
            search_debounce: Duration::from_millis(self.search_debounce_ms),
        }
    }

    pub fn client_config(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: self.catalog_url.clone(),
            extra_headers: self.extra_headers.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}
