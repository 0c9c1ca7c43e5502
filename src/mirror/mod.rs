pub mod builder;
pub mod layout;
pub mod materialize;

use std::path::PathBuf;

use crate::catalog::{CatalogError, FsCatalog, PluginCatalog};
use crate::config::{prepare_destination, MirrorConfig};
use crate::core::ExecutionStrategy;
use crate::view::LimitedCatalog;

pub use builder::{MirrorBuilder, MirrorReport, PluginFailure};
pub use layout::MirrorLayout;
pub use materialize::{link_or_copy, Materialized};

/// 单个制品镜像失败的原因；只影响所在插件
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error(transparent)]
    Resolve(#[from] CatalogError),
    #[error("repository corrupted: file does not exist: {}", .0.display())]
    Corrupted(PathBuf),
    #[error("unsafe {kind} {value:?} for a mirror path")]
    UnsafePath { kind: &'static str, value: String },
    #[error("could not link or copy {artifact} -> {}: {source}", dst.display())]
    Io {
        artifact: String,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 完整流程：目标目录预检 -> 打开仓库 -> 上限视图 -> 并行镜像
///
/// 目标目录非空时在任何镜像工作开始前拒绝。
pub fn build_mirror(config: &MirrorConfig) -> anyhow::Result<MirrorReport> {
    prepare_destination(&config.download)?;

    let catalog = FsCatalog::open(&config.repository, config.catalog.clone())?;
    let view = LimitedCatalog::new(catalog, config.version.clone(), config.max_versions);
    let plugins = view.list_plugins()?;

    let mut builder = MirrorBuilder::new(&view, &config.download);
    if let Some(threads) = config.threads {
        builder = builder.with_strategy(ExecutionStrategy::fixed(threads));
    }
    Ok(builder.build(&plugins))
}
