//! Simulation configuration and builder API.
//!
//! A [`SimConfig`] can be built in code with [`SimConfig::builder`] or
//! loaded from a TOML file. Every field has a default, so a config file
//! only needs the values it changes:
//!
//! ```toml
//! policy = "srtf"
//! seed = 42
//! workers = 4
//!
//! [[scripts]]
//! initial_burst = 3
//! after_burst = [{ io = 2 }, "finish"]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::policy::PolicyKind;
use crate::pool::Runtime;
use crate::rng::DEFAULT_SEED;
use crate::types::{Burst, Tick};
use crate::worker::{ScriptStep, WorkerScript};

/// Number of workers in a default run.
pub const DEFAULT_WORKERS: usize = 10;

/// How long the dispatcher waits for the running worker's report.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub policy: PolicyKind,
    /// Round-robin quantum. `None` uses the policy default.
    pub quantum: Option<Burst>,
    pub seed: u32,
    /// Worker count. Ignored when `scripts` is non-empty.
    pub workers: usize,
    /// Real time between ticks. Zero runs ticks back to back.
    pub tick_interval_ms: u64,
    pub read_timeout_ms: u64,
    pub runtime: Runtime,
    /// Abort the run if it has not finished after this many ticks.
    pub max_ticks: Option<Tick>,
    /// Fixed worker behaviors; one worker per entry.
    pub scripts: Vec<WorkerScript>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            policy: PolicyKind::default(),
            quantum: None,
            seed: DEFAULT_SEED,
            workers: DEFAULT_WORKERS,
            tick_interval_ms: 0,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            runtime: Runtime::default(),
            max_ticks: None,
            scripts: Vec::new(),
        }
    }
}

impl SimConfig {
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder {
            config: SimConfig::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<SimConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<SimConfig> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn effective_quantum(&self) -> Burst {
        self.quantum
            .unwrap_or_else(|| self.policy.default_quantum())
    }

    pub fn nr_workers(&self) -> usize {
        if self.scripts.is_empty() {
            self.workers
        } else {
            self.scripts.len()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.nr_workers() > 0, "at least one worker is required");
        if self.policy.uses_quantum() {
            ensure!(
                self.effective_quantum() > 0,
                "quantum must be positive, got {}",
                self.effective_quantum()
            );
        }
        for (i, script) in self.scripts.iter().enumerate() {
            if script.initial_burst <= 0 {
                bail!(
                    "script {i}: initial burst must be positive, got {}",
                    script.initial_burst
                );
            }
            for (j, step) in script.after_burst.iter().enumerate() {
                if let ScriptStep::Io(burst) = *step {
                    ensure!(
                        burst > 0,
                        "script {i}, step {j}: burst after I/O must be positive, got {burst}"
                    );
                }
            }
        }
        if let Some(0) = self.max_ticks {
            bail!("max_ticks must be positive");
        }
        Ok(())
    }
}

/// Builder for constructing configs.
#[derive(Debug, Clone)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn quantum(mut self, quantum: Burst) -> Self {
        self.config.quantum = Some(quantum);
        self
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.config.runtime = runtime;
        self
    }

    pub fn max_ticks(mut self, ticks: Tick) -> Self {
        self.config.max_ticks = Some(ticks);
        self
    }

    /// Add a scripted worker. Once any script is present, only scripted
    /// workers run.
    pub fn script(mut self, script: WorkerScript) -> Self {
        self.config.scripts.push(script);
        self
    }

    pub fn build(self) -> SimConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SimConfig::default();
        assert_eq!(c.policy, PolicyKind::Rr);
        assert_eq!(c.effective_quantum(), 5);
        assert_eq!(c.seed, 82);
        assert_eq!(c.nr_workers(), 10);
        assert!(c.validate().is_ok());

        let srtf = SimConfig::builder().policy(PolicyKind::Srtf).build();
        assert_eq!(srtf.effective_quantum(), 1);
    }

    #[test]
    fn test_partial_toml() {
        let c = SimConfig::from_toml(
            "policy = \"srtf\"\nseed = 42\nruntime = \"inline\"\n\n\
             [[scripts]]\ninitial_burst = 3\nafter_burst = [{ io = 2 }]\n",
        )
        .unwrap();
        assert_eq!(c.policy, PolicyKind::Srtf);
        assert_eq!(c.seed, 42);
        assert_eq!(c.runtime, Runtime::Inline);
        assert_eq!(c.nr_workers(), 1);
        assert_eq!(c.scripts[0].after_burst, vec![ScriptStep::Io(2)]);
        assert_eq!(c.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_toml_round_trip() {
        let c = SimConfig::builder()
            .policy(PolicyKind::Rr)
            .quantum(3)
            .seed(7)
            .max_ticks(500)
            .build();
        let text = c.to_toml().unwrap();
        assert_eq!(SimConfig::from_toml(&text).unwrap(), c);
    }

    #[test]
    fn test_validation() {
        assert!(SimConfig::builder().workers(0).build().validate().is_err());
        assert!(SimConfig::builder().quantum(0).build().validate().is_err());
        // SRTF does not care about the quantum.
        assert!(SimConfig::builder()
            .policy(PolicyKind::Srtf)
            .quantum(0)
            .build()
            .validate()
            .is_ok());
        assert!(SimConfig::builder()
            .script(WorkerScript::finish_after(0))
            .build()
            .validate()
            .is_err());
        assert!(SimConfig::from_toml("workers = \"many\"").is_err());
    }

    #[test]
    fn test_rejects_non_positive_io_burst() {
        let err = SimConfig::builder()
            .policy(PolicyKind::Srtf)
            .script(WorkerScript::finish_after(2))
            .script(
                WorkerScript::finish_after(1)
                    .then(ScriptStep::Io(3))
                    .then(ScriptStep::Io(-1)),
            )
            .build()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("script 1, step 1"), "{err}");

        let err = SimConfig::from_toml(
            "policy = \"srtf\"\n\n[[scripts]]\ninitial_burst = 1\nafter_burst = [{ io = 0 }]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("got 0"), "{err}");

        assert!(SimConfig::builder()
            .script(WorkerScript::finish_after(1).then(ScriptStep::Io(1)))
            .build()
            .validate()
            .is_ok());
    }
}
