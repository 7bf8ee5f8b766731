use std::time::{Duration, Instant};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::services::run_config::RunConfiguration;

/// Per-run state threaded through the runner instead of process-wide
/// globals. Two runs with separate contexts never share anything.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    seed: u64,
    iteration_budget: Option<usize>,
    timeout: Option<Duration>,
}

impl RunContext {
    pub fn new(seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            seed,
            iteration_budget: None,
            timeout: None,
        }
    }

    /// Uses the configured seed, or draws one from the thread RNG so the
    /// run can still be replayed from the recorded value.
    pub fn from_config(config: &RunConfiguration) -> Self {
        let seed = config
            .seed
            .unwrap_or_else(|| rand::thread_rng().r#gen::<u64>());
        Self::new(seed).with_config_limits(config)
    }

    /// Fills an unset iteration budget or timeout from `config`. Limits
    /// already on the context take precedence.
    pub fn with_config_limits(mut self, config: &RunConfiguration) -> Self {
        self.iteration_budget = self.iteration_budget.or(config.iteration_budget);
        self.timeout = self
            .timeout
            .or_else(|| config.timeout_ms.map(Duration::from_millis));
        self
    }

    pub fn with_iteration_budget(mut self, budget: usize) -> Self {
        self.iteration_budget = Some(budget);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn iteration_budget(&self) -> Option<usize> {
        self.iteration_budget
    }

    /// Number of iterations to attempt for a request of `requested`.
    pub fn target_iterations(&self, requested: usize) -> usize {
        match self.iteration_budget {
            Some(budget) => requested.min(budget),
            None => requested,
        }
    }

    /// Wall-clock deadline for a run starting at `started`.
    pub fn deadline_from(&self, started: Instant) -> Option<Instant> {
        self.timeout.map(|timeout| started + timeout)
    }
}

/// Derives `count` independent sub-seeds from one top-level seed. The
/// sequence only depends on `seed`, so iteration `i` always gets the same
/// stream regardless of scheduling.
pub fn derive_iteration_seeds(seed: u64, count: usize) -> Vec<u64> {
    let mut master = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| master.next_u64()).collect()
}
