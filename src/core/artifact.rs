use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::CatalogError;
use crate::core::version::Version;

/// 制品的惰性访问句柄（由 catalog 实现）
///
/// 描述文件与载荷都可能读取失败，因此全部延迟到真正需要时才访问。
pub trait ArtifactHandle: Send + Sync + fmt::Debug {
    /// 读取声明的最低平台版本
    fn required_platform_version(&self) -> Result<Version, CatalogError>;

    /// 解析为本地文件路径
    fn resolve(&self) -> Result<PathBuf, CatalogError>;
}

/// 某个插件的一次发布
#[derive(Clone, Debug)]
pub struct ArtifactRef {
    pub plugin_id: String,
    pub group_id: String,
    pub version: Version,
    /// 载荷扩展名（hpi / jpi ...），决定镜像内文件名
    pub extension: String,
    handle: Arc<dyn ArtifactHandle>,
}

impl ArtifactRef {
    pub fn new(
        plugin_id: impl Into<String>,
        group_id: impl Into<String>,
        version: Version,
        extension: impl Into<String>,
        handle: Arc<dyn ArtifactHandle>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            group_id: group_id.into(),
            version,
            extension: extension.into(),
            handle,
        }
    }

    pub fn required_platform_version(&self) -> Result<Version, CatalogError> {
        self.handle.required_platform_version()
    }

    pub fn resolve(&self) -> Result<PathBuf, CatalogError> {
        self.handle.resolve()
    }

    /// `group:artifact:version`
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.plugin_id, self.version)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.gav(), self.extension)
    }
}

/// 单个插件的全部已知发布
///
/// 不变量：`artifacts` 中每个值的 `version` 等于它的 key（只能经由 `add_artifact` 插入）。
#[derive(Clone, Debug, Default)]
pub struct PluginHistory {
    pub plugin_id: String,
    pub groups: BTreeSet<String>,
    artifacts: BTreeMap<Version, ArtifactRef>,
}

impl PluginHistory {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            groups: BTreeSet::new(),
            artifacts: BTreeMap::new(),
        }
    }

    /// 同 id、同 group 元数据的空副本（过滤视图用它构造新 history，原 history 不动）
    pub fn derive_empty(&self) -> Self {
        Self {
            plugin_id: self.plugin_id.clone(),
            groups: self.groups.clone(),
            artifacts: BTreeMap::new(),
        }
    }

    /// 插入一个发布；同版本已存在时保留先到者，返回 false
    pub fn add_artifact(&mut self, artifact: ArtifactRef) -> bool {
        self.groups.insert(artifact.group_id.clone());
        if self.artifacts.contains_key(&artifact.version) {
            return false;
        }
        self.artifacts.insert(artifact.version.clone(), artifact);
        true
    }

    pub fn artifacts(&self) -> &BTreeMap<Version, ArtifactRef> {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn latest(&self) -> Option<&ArtifactRef> {
        self.artifacts.values().next_back()
    }

    /// 新版本在前
    pub fn newest_first(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.artifacts.values().rev()
    }
}

/// 平台（core）发布
#[derive(Clone, Debug)]
pub struct PlatformRelease {
    pub version: Version,
    handle: Arc<dyn ArtifactHandle>,
}

impl PlatformRelease {
    pub fn new(version: Version, handle: Arc<dyn ArtifactHandle>) -> Self {
        Self { version, handle }
    }

    pub fn resolve(&self) -> Result<PathBuf, CatalogError> {
        self.handle.resolve()
    }
}
