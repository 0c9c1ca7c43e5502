use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{CatalogError, PlatformCatalog, PluginCatalog};

#[derive(Clone, Debug, Serialize)]
pub struct PluginEntry {
    pub plugin_id: String,
    pub groups: Vec<String>,
    /// 新版本在前
    pub versions: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlatformEntry {
    pub version: String,
    /// 无法定位时为空
    pub path: Option<PathBuf>,
}

/// 视图内容报告（`list` 子命令）：保留的插件版本 + 暴露的平台发布
#[derive(Clone, Debug, Serialize)]
pub struct CatalogReport {
    pub plugins: Vec<PluginEntry>,
    pub platform: Vec<PlatformEntry>,
}

impl CatalogReport {
    pub fn collect<C>(catalog: &C) -> Result<Self, CatalogError>
    where
        C: PluginCatalog + PlatformCatalog,
    {
        let plugins: Vec<PluginEntry> = catalog
            .list_plugins()?
            .iter()
            .map(|h| PluginEntry {
                plugin_id: h.plugin_id.clone(),
                groups: h.groups.iter().cloned().collect(),
                versions: h.newest_first().map(|a| a.version.to_string()).collect(),
            })
            .collect();
        let platform: Vec<PlatformEntry> = catalog
            .list_platform_releases()?
            .values()
            .map(|release| PlatformEntry {
                version: release.version.to_string(),
                path: release
                    .resolve()
                    .map_err(|e| tracing::warn!("platform {}: {}", release.version, e))
                    .ok(),
            })
            .collect();
        Ok(Self { plugins, platform })
    }
}

impl fmt::Display for CatalogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.plugins {
            writeln!(f, "{:<40} {}", p.plugin_id, p.versions.join(", "))?;
        }
        writeln!(f)?;
        writeln!(f, "number of plugins  = {}", self.plugins.len())?;
        let platform: Vec<&str> = self.platform.iter().map(|p| p.version.as_str()).collect();
        writeln!(f, "platform releases  = {}", platform.join(", "))?;
        Ok(())
    }
}
