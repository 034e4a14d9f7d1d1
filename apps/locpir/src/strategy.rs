//! Execution strategies of a lookup.
//!
//! A strategy only decides where the independent parts of a lookup run, every strategy computes
//! the same result and reports the same errors.
//!
//! | strategy           | records | predicate comparisons | comparator gates | mask        | reduction        |
//! |--------------------|---------|-----------------------|------------------|-------------|------------------|
//! | `Sequential`       | in turn | in turn               | in turn          | in turn     | left fold        |
//! | `ParallelRecords`  | threads | in turn               | in turn          | in turn     | accelerator tree |
//! | `ParallelCircuits` | threads | threads               | in turn          | accelerator | accelerator tree |
//! | `Accelerated`      | threads | threads               | accelerator      | accelerator | accelerator tree |
//!
//! Without an accelerator, `ParallelRecords` and `ParallelCircuits` run the accelerator stages on
//! the thread pool, `Accelerated` refuses to start.

use crate::backend::{AcceleratorConfig, AcceleratorDevice, Backend, Scheduler};
use crate::circuits::CircuitPlan;
use crate::error::{Error, ErrorKind, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStrategy {
    #[default]
    Sequential,
    ParallelRecords,
    ParallelCircuits,
    Accelerated,
}

impl ExecutionStrategy {
    pub const ALL: [Self; 4] = [
        Self::Sequential,
        Self::ParallelRecords,
        Self::ParallelCircuits,
        Self::Accelerated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::ParallelRecords => "parallel-records",
            Self::ParallelCircuits => "parallel-circuits",
            Self::Accelerated => "accelerated",
        }
    }
}

impl Display for ExecutionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ExecutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| {
                Error::new(format!(
                    "Unknown execution strategy `{s}`, expected one of: {}",
                    Self::ALL.map(Self::name).join(", ")
                ))
            })
    }
}

/// Everything needed to run lookups: the strategy, the number of worker threads and the
/// accelerator to use, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub strategy: ExecutionStrategy,
    /// Worker threads of the CPU pool, ignored by the sequential strategy
    pub threads: usize,
    pub accelerator: Option<AcceleratorConfig>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::Sequential,
            threads: std::thread::available_parallelism().map_or(1, usize::from),
            accelerator: None,
        }
    }
}

impl ExecutionConfig {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_accelerator(mut self, accelerator: AcceleratorConfig) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| Error::new(format!("Toml error: {err}")))
    }
}

/// Where each stage of a lookup runs
#[derive(Clone, Debug, Default)]
pub struct ExecutionPlan {
    pub records: Scheduler,
    pub circuit: CircuitPlan,
    pub mask: Backend,
    pub reduction: Backend,
}

/// A validated [`ExecutionConfig`] owning its thread pool and accelerator.
///
/// Building a context is the costly part, it is meant to be reused across lookups.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    config: ExecutionConfig,
    plan: ExecutionPlan,
    accelerator: Option<Arc<AcceleratorDevice>>,
}

impl ExecutionContext {
    pub fn new(config: ExecutionConfig) -> Result<Self> {
        if config.strategy == ExecutionStrategy::Sequential {
            return Ok(Self {
                config,
                plan: ExecutionPlan::default(),
                accelerator: None,
            });
        }

        if config.threads == 0 {
            return Err(ErrorKind::InvalidThreadCount.into());
        }
        if config.strategy == ExecutionStrategy::Accelerated && config.accelerator.is_none() {
            return Err(ErrorKind::AcceleratorRequired.into());
        }

        let pool = Arc::new(build_pool(config.threads)?);
        let accelerator = config
            .accelerator
            .map(AcceleratorDevice::new)
            .transpose()?
            .map(Arc::new);

        let threads = Scheduler::Threads(pool.clone());
        let offload = match &accelerator {
            Some(device) => Backend::Accelerator(device.clone()),
            None => Backend::Parallel(pool),
        };

        let plan = match config.strategy {
            ExecutionStrategy::Sequential => ExecutionPlan::default(),
            ExecutionStrategy::ParallelRecords => ExecutionPlan {
                records: threads,
                circuit: CircuitPlan::default(),
                mask: Backend::Sequential,
                reduction: offload,
            },
            ExecutionStrategy::ParallelCircuits => ExecutionPlan {
                records: threads.clone(),
                circuit: CircuitPlan::new(threads, Backend::Sequential),
                mask: offload.clone(),
                reduction: offload,
            },
            ExecutionStrategy::Accelerated => ExecutionPlan {
                records: threads.clone(),
                circuit: CircuitPlan::new(threads, offload.clone()),
                mask: offload.clone(),
                reduction: offload,
            },
        };

        tracing::debug!(
            strategy = %config.strategy,
            threads = config.threads,
            accelerator = accelerator.is_some(),
            "execution context ready"
        );

        Ok(Self {
            config,
            plan,
            accelerator,
        })
    }

    /// Runs everything on the calling thread
    pub fn sequential() -> Self {
        Self {
            config: ExecutionConfig::new(ExecutionStrategy::Sequential).with_threads(1),
            plan: ExecutionPlan::default(),
            accelerator: None,
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.config.strategy
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn accelerator(&self) -> Option<&AcceleratorDevice> {
        self.accelerator.as_deref()
    }
}

fn build_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("locpir-worker-{index}"))
        .build()
        .map_err(|err| Error::new(format!("Cannot start the worker pool: {err}")))
}
