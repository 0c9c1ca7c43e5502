use std::sync::atomic::{AtomicUsize, Ordering};
use sysinfo::System;

/// 少于该数量的插件直接串行处理，避免建池开销
const SERIAL_THRESHOLD: usize = 4;

/// 自适应调度器：根据负载与内存压力决定 worker pool 大小
pub struct AdaptiveScheduler {
    target_parallelism: AtomicUsize,
    system: System,
}

impl Default for AdaptiveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveScheduler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        Self {
            target_parallelism: AtomicUsize::new(num_cpus::get()),
            system: sys,
        }
    }

    /// 动态调整并行度
    ///
    /// 镜像任务以阻塞 I/O 为主，系统空闲时允许超过核心数。
    pub fn adjust_parallelism(&mut self) -> usize {
        self.system.refresh_memory();

        let load = System::load_average().one;
        let cpu_count = num_cpus::get() as f64;
        let mem_free = self.system.available_memory();
        let total_mem = self.system.total_memory();
        let mem_pressure = if total_mem == 0 {
            0.0
        } else {
            1.0 - (mem_free as f64 / total_mem as f64)
        };

        let new_parallelism = if load < cpu_count * 0.3 && mem_pressure < 0.5 {
            (cpu_count * 2.0) as usize
        } else if load > cpu_count * 0.8 || mem_pressure > 0.8 {
            (cpu_count * 0.5) as usize
        } else {
            cpu_count as usize
        }
        .max(1);

        let old = self.target_parallelism.swap(new_parallelism, Ordering::Relaxed);

        if old != new_parallelism {
            tracing::debug!(
                "Adaptive parallelism: {} -> {} (load: {:.2}, mem_pressure: {:.2})",
                old,
                new_parallelism,
                load,
                mem_pressure
            );
        }

        new_parallelism
    }

    /// 根据任务规模选择执行策略
    pub fn select_strategy(&self, task: &Task) -> ExecutionStrategy {
        match task {
            Task::Mirror { plugins } if *plugins < SERIAL_THRESHOLD => ExecutionStrategy::Serial,
            Task::Mirror { plugins } => ExecutionStrategy::Parallel {
                workers: self
                    .target_parallelism
                    .load(Ordering::Relaxed)
                    .min(*plugins)
                    .max(1),
            },
        }
    }
}

pub enum Task {
    Mirror { plugins: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Serial,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    /// 显式指定线程数时跳过自适应
    pub fn fixed(workers: usize) -> Self {
        if workers <= 1 {
            ExecutionStrategy::Serial
        } else {
            ExecutionStrategy::Parallel { workers }
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            ExecutionStrategy::Serial => 1,
            ExecutionStrategy::Parallel { workers } => *workers,
        }
    }
}
