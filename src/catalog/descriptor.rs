use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::Version;

/// 插件描述文件（与载荷同目录的 `<artifactId>-<version>.toml`）
///
/// ```toml
/// required_platform = "1.300"
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct Descriptor {
    #[serde(alias = "jenkins_version")]
    pub required_platform: Version,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("descriptor {} not readable: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("descriptor {} malformed: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn sidecar_path(payload: &Path) -> PathBuf {
    payload.with_extension("toml")
}

pub fn read_descriptor(path: &Path) -> Result<Descriptor, DescriptorError> {
    let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| DescriptorError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
