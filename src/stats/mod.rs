use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::mirror::Materialized;

/// 镜像过程中的全局计数器（多个 worker 并发累加）
///
/// 各计数器独立原子递增，彼此之间不要求事务一致性。
#[derive(Debug, Default)]
pub struct MirrorStats {
    plugins: AtomicU64,
    versions: AtomicU64,
    bytes: AtomicU64,
    linked: AtomicU64,
    copied: AtomicU64,
    unchanged: AtomicU64,
    failed_plugins: AtomicU64,
}

impl MirrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_version(&self, outcome: Materialized, bytes: u64) {
        self.versions.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        let counter = match outcome {
            Materialized::Linked => &self.linked,
            Materialized::Copied => &self.copied,
            Materialized::Unchanged => &self.unchanged,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_plugin(&self) {
        self.plugins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_plugins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MirrorSummary {
        MirrorSummary {
            plugins: self.plugins.load(Ordering::Relaxed),
            versions: self.versions.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            linked: self.linked.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            failed_plugins: self.failed_plugins.load(Ordering::Relaxed),
        }
    }
}

/// 运行结束时读取的一次性快照
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MirrorSummary {
    pub plugins: u64,
    pub versions: u64,
    pub bytes: u64,
    pub linked: u64,
    pub copied: u64,
    pub unchanged: u64,
    pub failed_plugins: u64,
}

impl MirrorSummary {
    pub fn megabytes(&self) -> u64 {
        self.bytes / (1024 * 1024)
    }
}

pub fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

impl fmt::Display for MirrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "number of plugins  = {}", self.plugins)?;
        writeln!(f, "number of versions = {}", self.versions)?;
        writeln!(
            f,
            "number of Mb       = {} ({})",
            self.megabytes(),
            human_bytes(self.bytes)
        )?;
        writeln!(
            f,
            "linked/copied/unchanged = {}/{}/{}",
            self.linked, self.copied, self.unchanged
        )?;
        if self.failed_plugins > 0 {
            writeln!(f, "skipped plugins    = {}", self.failed_plugins)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(MirrorStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_version(Materialized::Linked, 3);
                    }
                    stats.record_plugin();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let s = stats.snapshot();
        assert_eq!(s.plugins, 8);
        assert_eq!(s.versions, 8000);
        assert_eq!(s.bytes, 24000);
        assert_eq!(s.linked, 8000);
    }

    #[test]
    fn outcome_counters_are_separate() {
        let stats = MirrorStats::new();
        stats.record_version(Materialized::Linked, 1);
        stats.record_version(Materialized::Copied, 1);
        stats.record_version(Materialized::Unchanged, 1);
        stats.record_failure();
        let s = stats.snapshot();
        assert_eq!((s.linked, s.copied, s.unchanged), (1, 1, 1));
        assert_eq!(s.versions, 3);
        assert_eq!(s.failed_plugins, 1);
    }

    #[test]
    fn summary_prints_megabytes() {
        let s = MirrorSummary {
            plugins: 1,
            versions: 2,
            bytes: 15 * 1024 * 1024,
            ..MirrorSummary::default()
        };
        let text = s.to_string();
        assert!(text.contains("number of plugins  = 1"));
        assert!(text.contains("number of versions = 2"));
        assert!(text.contains("number of Mb       = 15 (15.00 MB)"));
        assert!(!text.contains("skipped"));
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
