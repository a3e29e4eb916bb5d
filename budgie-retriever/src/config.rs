//! Project configuration and the `.budgie/` directory layout
//!
//! ```text
//! project/
//! └── .budgie/
//!     ├── budgie.config.json   model names, similarity threshold, server URL
//!     ├── budgie.system.md     system prompt for chat
//!     ├── embeddings.json      the index, always next to the config file
//!     └── docs/                documents to index
//! ```

use crate::retrieval::search::{DEFAULT_SIMILARITY_THRESHOLD, SearchConfig};
use budgie_embed::{DEFAULT_BASE_URL, EmbedConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const BUDGIE_DIR: &str = ".budgie";
pub const CONFIG_FILE: &str = "budgie.config.json";
pub const SYSTEM_FILE: &str = "budgie.system.md";
pub const DOCS_DIR: &str = "docs";
pub const INDEX_FILE: &str = "embeddings.json";

const DEFAULT_SYSTEM_PROMPT: &str = "You are Budgie, a helpful assistant. \
Answer questions using the documentation context you are given when it is relevant, \
and say so when you do not know the answer.\n";

const DEFAULT_DOCS_README: &str = "# Documentation\n\n\
Put the documents you want Budgie to search in this directory, then run:\n\n\
```bash\nbudgie-retriever generate-embeddings\n```\n";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("embedding-model not specified in config file")]
    MissingEmbeddingModel,

    #[error("no .budgie directory found in {} or any parent directories", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("{} already exists", .0.display())]
    AlreadyInitialized(PathBuf),
}

/// Contents of `budgie.config.json`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgieConfig {
    /// Chat model
    #[serde(default)]
    pub model: String,
    #[serde(default, rename = "embedding-model")]
    pub embedding_model: String,
    /// Minimum similarity for retrieved passages; 0 means the default
    #[serde(default, rename = "cosine-limit")]
    pub cosine_limit: f32,
    #[serde(default)]
    pub temperature: f32,
    /// OpenAI-compatible server for both chat and embeddings
    #[serde(default, rename = "baseURL")]
    pub base_url: String,
}

impl BudgieConfig {
    /// The configuration written by `init`.
    pub fn scaffold() -> Self {
        Self {
            model: "ai/qwen2.5:latest".to_string(),
            embedding_model: "ai/mxbai-embed-large".to_string(),
            cosine_limit: DEFAULT_SIMILARITY_THRESHOLD,
            temperature: 0.5,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Reads and parses `path`. A zero or missing `cosine-limit` becomes
    /// [`DEFAULT_SIMILARITY_THRESHOLD`].
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.cosine_limit == 0.0 {
            config.cosine_limit = DEFAULT_SIMILARITY_THRESHOLD;
        }
        Ok(config)
    }

    pub fn require_embedding_model(&self) -> Result<&str, ConfigError> {
        let model = self.embedding_model.trim();
        if model.is_empty() {
            return Err(ConfigError::MissingEmbeddingModel);
        }
        Ok(model)
    }

    /// Client settings for the embedding server. An empty `baseURL` falls
    /// back to [`DEFAULT_BASE_URL`].
    pub fn embed_config(&self) -> Result<EmbedConfig, ConfigError> {
        let model = self.require_embedding_model()?;
        let base_url = match self.base_url.trim() {
            "" => DEFAULT_BASE_URL,
            url => url,
        };
        Ok(EmbedConfig::new(model).with_base_url(base_url))
    }

    pub fn search_config(&self, paths: &ProjectPaths) -> SearchConfig {
        SearchConfig::new(paths.index_path()).with_threshold(self.cosine_limit)
    }
}

/// Where a project's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub config_file: PathBuf,
    pub system_file: PathBuf,
    pub docs_dir: PathBuf,
}

impl ProjectPaths {
    /// The standard layout under `root/.budgie`.
    pub fn in_root(root: &Path) -> Self {
        let budgie_dir = root.join(BUDGIE_DIR);
        Self {
            config_file: budgie_dir.join(CONFIG_FILE),
            system_file: budgie_dir.join(SYSTEM_FILE),
            docs_dir: budgie_dir.join(DOCS_DIR),
        }
    }

    /// The index is stored next to the config file.
    pub fn index_path(&self) -> PathBuf {
        self.config_file
            .parent()
            .map(|dir| dir.join(INDEX_FILE))
            .unwrap_or_else(|| PathBuf::from(INDEX_FILE))
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Write { path, source }
}

/// Walks up from `start` to the nearest directory containing `.budgie/`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let start = std::path::absolute(start).map_err(|source| ConfigError::Read {
        path: start.to_path_buf(),
        source,
    })?;
    start
        .ancestors()
        .find(|dir| dir.join(BUDGIE_DIR).is_dir())
        .map(Path::to_path_buf)
        .ok_or(ConfigError::ProjectNotFound(start))
}

/// Creates `.budgie/` under `root` with a default config, system prompt and
/// docs directory. Refuses to touch an existing `.budgie`.
pub async fn init_project(root: &Path) -> Result<ProjectPaths, ConfigError> {
    let budgie_dir = root.join(BUDGIE_DIR);
    let exists = tokio::fs::try_exists(&budgie_dir)
        .await
        .map_err(|source| ConfigError::Read {
            path: budgie_dir.clone(),
            source,
        })?;
    if exists {
        return Err(ConfigError::AlreadyInitialized(budgie_dir));
    }

    let paths = ProjectPaths::in_root(root);

    tokio::fs::create_dir_all(&paths.docs_dir)
        .await
        .map_err(write_error(&paths.docs_dir))?;

    let config_json = serde_json::to_string_pretty(&BudgieConfig::scaffold()).map_err(|source| {
        ConfigError::Parse {
            path: paths.config_file.clone(),
            source,
        }
    })?;
    tokio::fs::write(&paths.config_file, config_json + "\n")
        .await
        .map_err(write_error(&paths.config_file))?;
    tokio::fs::write(&paths.system_file, DEFAULT_SYSTEM_PROMPT)
        .await
        .map_err(write_error(&paths.system_file))?;

    let readme = paths.docs_dir.join("README.md");
    tokio::fs::write(&readme, DEFAULT_DOCS_README)
        .await
        .map_err(write_error(&readme))?;

    info!("Initialized project in {}", budgie_dir.display());
    Ok(paths)
}
