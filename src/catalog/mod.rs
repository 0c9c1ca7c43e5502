pub mod descriptor;
pub mod fs;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{ArtifactRef, PlatformRelease, PluginHistory, Version};

pub use fs::{FsCatalog, FsCatalogOptions};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// 索引无法打开/查询：整次运行失败
    #[error("catalog unavailable at {}: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },
    /// 描述文件读取失败：过滤阶段跳过该制品
    #[error("problem reading descriptor of {artifact}: {reason}")]
    Descriptor { artifact: String, reason: String },
    /// 载荷无法定位
    #[error("cannot resolve {artifact}: {reason}")]
    Resolve { artifact: String, reason: String },
}

/// 插件目录能力：列出插件历史，并把制品解析为本地文件
///
/// 过滤视图（`view`）通过组合包装任意实现，不修改被包装者。
pub trait PluginCatalog: Send + Sync {
    fn list_plugins(&self) -> Result<Vec<PluginHistory>, CatalogError>;

    fn resolve_artifact(&self, artifact: &ArtifactRef) -> Result<PathBuf, CatalogError> {
        artifact.resolve()
    }
}

/// 平台发布能力（并非所有视图都提供）
pub trait PlatformCatalog: Send + Sync {
    fn list_platform_releases(&self) -> Result<BTreeMap<Version, PlatformRelease>, CatalogError>;
}

impl<T: PluginCatalog + ?Sized> PluginCatalog for Arc<T> {
    fn list_plugins(&self) -> Result<Vec<PluginHistory>, CatalogError> {
        (**self).list_plugins()
    }

    fn resolve_artifact(&self, artifact: &ArtifactRef) -> Result<PathBuf, CatalogError> {
        (**self).resolve_artifact(artifact)
    }
}

impl<T: PluginCatalog + ?Sized> PluginCatalog for &T {
    fn list_plugins(&self) -> Result<Vec<PluginHistory>, CatalogError> {
        (**self).list_plugins()
    }

    fn resolve_artifact(&self, artifact: &ArtifactRef) -> Result<PathBuf, CatalogError> {
        (**self).resolve_artifact(artifact)
    }
}

impl<T: PlatformCatalog + ?Sized> PlatformCatalog for Arc<T> {
    fn list_platform_releases(&self) -> Result<BTreeMap<Version, PlatformRelease>, CatalogError> {
        (**self).list_platform_releases()
    }
}

impl<T: PlatformCatalog + ?Sized> PlatformCatalog for &T {
    fn list_platform_releases(&self) -> Result<BTreeMap<Version, PlatformRelease>, CatalogError> {
        (**self).list_platform_releases()
    }
}
