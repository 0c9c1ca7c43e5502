use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::FsCatalogOptions;
use crate::core::Version;

const CONFIG_DIR: &str = "plugin-mirror";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("max_versions must be at least 1 (got {0})")]
    InvalidMaxVersions(usize),
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("the download dir is not empty: {}", .0.display())]
    DestinationNotEmpty(PathBuf),
    #[error("the download path is not a directory: {}", .0.display())]
    DestinationNotDirectory(PathBuf),
    #[error("cannot prepare download dir {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置文件（全部可选，命令行优先）
///
/// ```toml
/// version = "2.361"
/// max_versions = 2
/// download = "/srv/mirror"
/// repository = "/srv/m2/repository"
/// threads = 8
/// plugin_extensions = ["hpi", "jpi"]
/// platform_extension = "war"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub version: Option<Version>,
    pub max_versions: Option<usize>,
    pub download: Option<PathBuf>,
    pub repository: Option<PathBuf>,
    pub threads: Option<usize>,
    pub plugin_extensions: Option<Vec<String>>,
    pub platform_extension: Option<String>,
}

impl FileConfig {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 命令行值覆盖文件值
    pub fn merge(self, cli: FileConfig) -> FileConfig {
        FileConfig {
            version: cli.version.or(self.version),
            max_versions: cli.max_versions.or(self.max_versions),
            download: cli.download.or(self.download),
            repository: cli.repository.or(self.repository),
            threads: cli.threads.or(self.threads),
            plugin_extensions: cli.plugin_extensions.or(self.plugin_extensions),
            platform_extension: cli.platform_extension.or(self.platform_extension),
        }
    }

    pub fn repository(&self) -> Result<PathBuf, ConfigError> {
        self.repository.clone().ok_or(ConfigError::Missing("repository"))
    }

    pub fn catalog_options(&self) -> FsCatalogOptions {
        let mut options = FsCatalogOptions::default();
        if let Some(exts) = &self.plugin_extensions {
            options.plugin_extensions = exts.clone();
        }
        if let Some(ext) = &self.platform_extension {
            options.platform_extension = ext.clone();
        }
        options
    }
}

/// 校验后的镜像配置
#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub version: Version,
    pub max_versions: NonZeroUsize,
    pub download: PathBuf,
    pub repository: PathBuf,
    pub threads: Option<usize>,
    pub catalog: FsCatalogOptions,
}

impl TryFrom<FileConfig> for MirrorConfig {
    type Error = ConfigError;

    fn try_from(cfg: FileConfig) -> Result<Self, Self::Error> {
        let max = cfg.max_versions.unwrap_or(1);
        let max_versions = NonZeroUsize::new(max).ok_or(ConfigError::InvalidMaxVersions(max))?;
        Ok(Self {
            catalog: cfg.catalog_options(),
            repository: cfg.repository()?,
            version: cfg.version.ok_or(ConfigError::Missing("version"))?,
            download: cfg.download.ok_or(ConfigError::Missing("download"))?,
            threads: cfg.threads,
            max_versions,
        })
    }
}

/// 显式路径必须存在；否则尝试 `<config_dir>/plugin-mirror/config.toml`，不存在则为空配置
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE)) {
            Some(p) if p.is_file() => p,
            _ => return Ok(FileConfig::default()),
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("Loaded config from {}", path.display());
    FileConfig::parse(&path, &text)
}

/// 目标目录预检：不存在则创建；存在则必须为空目录
pub fn prepare_destination(path: &Path) -> Result<(), ConfigError> {
    let io_err = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        tracing::info!("creating download dir: {}", path.display());
        std::fs::create_dir_all(path).map_err(io_err)?;
        return Ok(());
    }
    if !path.is_dir() {
        return Err(ConfigError::DestinationNotDirectory(path.to_path_buf()));
    }
    let mut entries = std::fs::read_dir(path).map_err(io_err)?;
    if entries.next().is_some() {
        return Err(ConfigError::DestinationNotEmpty(path.to_path_buf()));
    }
    Ok(())
}
