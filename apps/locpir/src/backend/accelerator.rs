//! Batched gate offload device.
//!
//! A launch hands the device a batch of independent gates. The batch is cut into waves of at
//! most `wave_size` gates, each wave is spread over the device lanes and every wave completes
//! before the next one starts. The launch returns once the whole batch is done.
//!
//! The lanes are served by a dedicated worker pool owned by the device, i.e. the host fallback
//! of an offload region when no board is attached. Callers only see launches and results, so a
//! board driver can replace the pool without touching the circuits.

use super::GateOp;
use crate::error::{Error, ErrorKind, Result};
use crate::gates::BooleanGates;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorConfig {
    /// Number of gates the device evaluates concurrently
    pub lanes: usize,
    /// Maximum number of gates of one wave
    pub wave_size: usize,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            lanes: 32,
            wave_size: 1024,
        }
    }
}

impl AcceleratorConfig {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            ..Default::default()
        }
    }

    pub fn with_wave_size(mut self, wave_size: usize) -> Self {
        self.wave_size = wave_size;
        self
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| Error::new(format!("Toml error: {err}")))
    }
}

pub struct AcceleratorDevice {
    config: AcceleratorConfig,
    lanes: ThreadPool,
    launches: AtomicUsize,
    evaluated_gates: AtomicUsize,
}

impl std::fmt::Debug for AcceleratorDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratorDevice")
            .field("config", &self.config)
            .field("launches", &self.launch_count())
            .field("evaluated_gates", &self.evaluated_gates())
            .finish()
    }
}

impl AcceleratorDevice {
    pub fn new(config: AcceleratorConfig) -> Result<Self> {
        if config.lanes == 0 {
            return Err(ErrorKind::InvalidThreadCount.into());
        }
        if config.wave_size == 0 {
            return Err(Error::new(
                "The accelerator wave size must be strictly positive".to_string(),
            ));
        }

        let lanes = ThreadPoolBuilder::new()
            .num_threads(config.lanes)
            .thread_name(|lane| format!("locpir-accelerator-{lane}"))
            .build()
            .map_err(|err| Error::new(format!("Cannot start the accelerator lanes: {err}")))?;

        tracing::debug!(
            lanes = config.lanes,
            wave_size = config.wave_size,
            "accelerator ready"
        );

        Ok(Self {
            config,
            lanes,
            launches: AtomicUsize::new(0),
            evaluated_gates: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &AcceleratorConfig {
        &self.config
    }

    /// Evaluates a batch of independent gates, outputs are in batch order.
    pub fn launch<G: BooleanGates>(&self, gates: &G, batch: &[GateOp<'_, G::Bit>]) -> Vec<G::Bit> {
        self.launches.fetch_add(1, Ordering::Relaxed);
        self.evaluated_gates
            .fetch_add(batch.len(), Ordering::Relaxed);

        let waves = batch.len().div_ceil(self.config.wave_size);
        tracing::trace!(ops = batch.len(), waves, "accelerator launch");

        let mut outputs = Vec::with_capacity(batch.len());
        for wave in batch.chunks(self.config.wave_size) {
            let mut wave_outputs = Vec::with_capacity(wave.len());
            self.lanes.install(|| {
                wave.par_iter()
                    .map(|op| op.evaluate(gates))
                    .collect_into_vec(&mut wave_outputs)
            });
            outputs.append(&mut wave_outputs);
        }
        outputs
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }

    pub fn evaluated_gates(&self) -> usize {
        self.evaluated_gates.load(Ordering::Relaxed)
    }
}

impl Drop for AcceleratorDevice {
    fn drop(&mut self) {
        tracing::debug!(
            launches = self.launch_count(),
            gates = self.evaluated_gates(),
            "accelerator released"
        );
    }
}
