use std::num::NonZeroUsize;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::catalog::{CatalogError, PluginCatalog};
use crate::core::{ArtifactRef, PluginHistory, Version};
use crate::view::{is_compatible, retain_newest};

/// 单上限视图：每个插件只保留与 `cap` 兼容的最新 `max_versions` 个版本
///
/// - 结果是新构造的 history，被包装的 catalog 不受影响
/// - 过滤后为空的插件整体剔除
/// - 输出顺序与底层顺序一致（rayon collect 保序），结果可复现
///
/// 不提供平台发布查询（未实现 `PlatformCatalog`）。
pub struct LimitedCatalog<C> {
    base: C,
    cap: Version,
    max_versions: NonZeroUsize,
}

impl<C: PluginCatalog> LimitedCatalog<C> {
    pub fn new(base: C, cap: Version, max_versions: NonZeroUsize) -> Self {
        Self {
            base,
            cap,
            max_versions,
        }
    }

    fn cap_and_limit(&self, history: &PluginHistory) -> PluginHistory {
        retain_newest(history, self.max_versions.get(), |artifact| {
            is_compatible(artifact, &self.cap)
        })
    }
}

impl<C: PluginCatalog> PluginCatalog for LimitedCatalog<C> {
    fn list_plugins(&self) -> Result<Vec<PluginHistory>, CatalogError> {
        let plugins = self.base.list_plugins()?;
        let total = plugins.len();

        let capped: Vec<PluginHistory> = plugins
            .par_iter()
            .map(|h| self.cap_and_limit(h))
            .filter(|h| !h.is_empty())
            .collect();

        tracing::info!(
            "Capped view (<= {}, max {} per plugin): {}/{} plugins retained",
            self.cap,
            self.max_versions,
            capped.len(),
            total
        );
        Ok(capped)
    }

    fn resolve_artifact(&self, artifact: &ArtifactRef) -> Result<PathBuf, CatalogError> {
        self.base.resolve_artifact(artifact)
    }
}
