use std::path::PathBuf;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::PluginCatalog;
use crate::core::{AdaptiveScheduler, ArtifactRef, ExecutionStrategy, PluginHistory, Task};
use crate::mirror::layout::MirrorLayout;
use crate::mirror::materialize::{link_or_copy, Materialized};
use crate::mirror::MirrorError;
use crate::stats::{MirrorStats, MirrorSummary};

#[derive(Clone, Debug, Serialize)]
pub struct PluginFailure {
    pub plugin_id: String,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MirrorReport {
    pub summary: MirrorSummary,
    pub failures: Vec<PluginFailure>,
}

/// 镜像构建器：把过滤后的插件集合落地到镜像目录
///
/// - 插件之间并行（rayon pool），同一插件内的版本顺序处理
/// - 单个插件失败只记录并跳过，不影响其他插件
/// - 计数器为原子累加，不在 I/O 期间持锁
pub struct MirrorBuilder<C> {
    catalog: C,
    layout: MirrorLayout,
    stats: MirrorStats,
    strategy: Option<ExecutionStrategy>,
}

impl<C: PluginCatalog> MirrorBuilder<C> {
    pub fn new(catalog: C, root: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            layout: MirrorLayout::new(root),
            stats: MirrorStats::new(),
            strategy: None,
        }
    }

    /// 固定执行策略（默认由 `AdaptiveScheduler` 决定）
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// 落地单个制品，返回落地方式
    pub fn mirror_artifact(&self, artifact: &ArtifactRef) -> Result<Materialized, MirrorError> {
        let dst = self.layout.destination(artifact)?;
        let src = self.catalog.resolve_artifact(artifact)?;

        let is_file = std::fs::metadata(&src)
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(MirrorError::Corrupted(src));
        }

        let io_err = |source: std::io::Error| MirrorError::Io {
            artifact: artifact.to_string(),
            dst: dst.clone(),
            source,
        };
        let outcome = link_or_copy(&src, &dst).map_err(io_err)?;
        let bytes = std::fs::metadata(&dst).map_err(io_err)?.len();

        self.stats.record_version(outcome, bytes);
        tracing::debug!("{:?} {} ({} bytes)", outcome, dst.display(), bytes);
        Ok(outcome)
    }

    /// 顺序落地一个插件的全部保留版本；遇到第一个错误即放弃该插件（已落地的保留）
    pub fn mirror_plugin(&self, history: &PluginHistory) -> Result<usize, MirrorError> {
        if history.is_empty() {
            return Ok(0);
        }
        tracing::info!("=> {}", history.plugin_id);

        for artifact in history.artifacts().values() {
            self.mirror_artifact(artifact)?;
        }
        self.stats.record_plugin();
        Ok(history.len())
    }

    pub fn build(&self, plugins: &[PluginHistory]) -> MirrorReport {
        let failures = Mutex::new(Vec::new());
        let strategy = self.strategy.unwrap_or_else(|| {
            let mut scheduler = AdaptiveScheduler::new();
            scheduler.adjust_parallelism();
            scheduler.select_strategy(&Task::Mirror {
                plugins: plugins.len(),
            })
        });
        tracing::info!(
            "Mirroring {} plugins into {} ({} workers)",
            plugins.len(),
            self.layout.root().display(),
            strategy.workers()
        );

        let run_one = |history: &PluginHistory| {
            if let Err(e) = self.mirror_plugin(history) {
                let label = history
                    .latest()
                    .map(|a| a.gav())
                    .unwrap_or_else(|| history.plugin_id.clone());
                tracing::warn!("SKIPPING {} (ERROR: {})", label, e);
                self.stats.record_failure();
                failures.lock().push(PluginFailure {
                    plugin_id: history.plugin_id.clone(),
                    error: e.to_string(),
                });
            }
        };

        match strategy {
            ExecutionStrategy::Serial => plugins.iter().for_each(&run_one),
            ExecutionStrategy::Parallel { workers } => {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("mirror-{}", i))
                    .build()
                {
                    Ok(pool) => pool.install(|| plugins.par_iter().for_each(&run_one)),
                    Err(e) => {
                        tracing::warn!("Failed to build worker pool ({}), using global pool", e);
                        plugins.par_iter().for_each(&run_one);
                    }
                }
            }
        }

        let mut failures = failures.into_inner();
        failures.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
        MirrorReport {
            summary: self.stats.snapshot(),
            failures,
        }
    }
}
