pub mod capped;
pub mod limited;

pub use capped::CappedCatalog;
pub use limited::LimitedCatalog;

use crate::core::{ArtifactRef, PluginHistory, Version};

/// 按版本从新到旧遍历，收满 `limit` 个即停止（后面的制品不再读取描述文件）
pub(crate) fn retain_newest<F>(history: &PluginHistory, limit: usize, mut admit: F) -> PluginHistory
where
    F: FnMut(&ArtifactRef) -> bool,
{
    let mut kept = history.derive_empty();
    for artifact in history.newest_first() {
        if kept.len() >= limit {
            break;
        }
        if admit(artifact) {
            kept.add_artifact(artifact.clone());
        }
    }
    kept
}

/// 声明的最低平台版本 <= cap；描述文件读取失败时跳过该制品
pub(crate) fn is_compatible(artifact: &ArtifactRef, cap: &Version) -> bool {
    match artifact.required_platform_version() {
        Ok(required) => required <= *cap,
        Err(e) => {
            tracing::warn!("ERROR: problem reading {} (skipped): {}", artifact, e);
            false
        }
    }
}
