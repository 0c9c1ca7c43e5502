use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::catalog::{CatalogError, PlatformCatalog, PluginCatalog};
use crate::core::{ArtifactRef, PlatformRelease, PluginHistory, Version};
use crate::view::{is_compatible, retain_newest};

/// 双上限视图固定保留的版本数
pub const RETAINED_VERSIONS: usize = 2;

/// 双上限视图：插件兼容上限 + 平台版本下界
///
/// - 插件：每个插件保留至多 2 个与 `cap_plugin` 兼容的最新版本
/// - `cap_plugin` 为 `None` 时不做兼容性检查，直接保留最新 2 个版本（有意为之，不读取描述文件）
/// - 平台发布：仅暴露版本 >= `cap_core` 的条目（包含边界）
pub struct CappedCatalog<C> {
    base: C,
    cap_plugin: Option<Version>,
    cap_core: Version,
}

impl<C> CappedCatalog<C> {
    pub fn new(base: C, cap_plugin: Option<Version>, cap_core: Version) -> Self {
        Self {
            base,
            cap_plugin,
            cap_core,
        }
    }

    /// 两个上限相同
    pub fn uniform(base: C, cap: Version) -> Self {
        Self::new(base, Some(cap.clone()), cap)
    }

    fn cap_history(&self, history: &PluginHistory) -> PluginHistory {
        match &self.cap_plugin {
            None => retain_newest(history, RETAINED_VERSIONS, |_| true),
            Some(cap) => retain_newest(history, RETAINED_VERSIONS, |artifact| {
                is_compatible(artifact, cap)
            }),
        }
    }
}

impl<C: PluginCatalog> PluginCatalog for CappedCatalog<C> {
    fn list_plugins(&self) -> Result<Vec<PluginHistory>, CatalogError> {
        let plugins = self.base.list_plugins()?;
        Ok(plugins
            .par_iter()
            .map(|h| self.cap_history(h))
            .filter(|h| !h.is_empty())
            .collect())
    }

    fn resolve_artifact(&self, artifact: &ArtifactRef) -> Result<PathBuf, CatalogError> {
        self.base.resolve_artifact(artifact)
    }
}

impl<C: PlatformCatalog> PlatformCatalog for CappedCatalog<C> {
    fn list_platform_releases(&self) -> Result<BTreeMap<Version, PlatformRelease>, CatalogError> {
        let mut releases = self.base.list_platform_releases()?;
        Ok(releases.split_off(&self.cap_core))
    }
}
