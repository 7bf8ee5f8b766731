use std::path::Path;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::plan::{PlanSpec, PlanValidationError};
use crate::services::distribution_sampler::{
    BetaPertSampler, DistributionError, LogNormalSampler, ThreePointSampler,
};
use crate::services::percentiles::PercentileSummary;
use crate::services::plan_yaml::{PlanYamlError, load_plan_from_yaml_file};
use crate::services::risk_event_sampler::sample_risk_event;
use crate::services::run_config::{RunConfigError, RunConfiguration};
use crate::services::run_context::{RunContext, derive_iteration_seeds};
use crate::services::simulation_types::{
    DriverSamples, RiskFrequency, Scenario, SimulationResult, SummaryStats,
};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("failed to load plan: {0}")]
    LoadPlan(#[from] PlanYamlError),
    #[error("structural validation failed: {0}")]
    StructuralValidation(#[from] PlanValidationError),
    #[error("invalid run configuration: {0}")]
    Config(#[from] RunConfigError),
    #[error("iterations must be greater than zero")]
    InvalidIterations,
    #[error("sampling task {task} failed: {source}")]
    Distribution {
        task: String,
        source: DistributionError,
    },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub fn simulate_plan_from_yaml_file<P: AsRef<Path>>(
    path: P,
    config: &RunConfiguration,
) -> Result<SimulationResult, SimulationError> {
    let plan = load_plan_from_yaml_file(path)?;
    run_simulation(&plan, config)
}

/// Runs `plan` with the default PERT duration and lognormal cost samplers.
pub fn run_simulation(
    plan: &PlanSpec,
    config: &RunConfiguration,
) -> Result<SimulationResult, SimulationError> {
    SimulationRunner::new().run(plan, config)
}

/// Success thresholds after applying the configured buffer and tolerance.
#[derive(Debug, Clone, Copy)]
struct SuccessLimits {
    deadline: Option<f64>,
    budget: Option<f64>,
}

impl SuccessLimits {
    fn new(plan: &PlanSpec, config: &RunConfiguration) -> Self {
        Self {
            deadline: plan.deadline.map(|deadline| deadline + config.deadline_buffer),
            budget: plan.budget.map(|budget| budget * config.budget_tolerance),
        }
    }

    fn is_delayed(&self, total_duration: f64) -> bool {
        self.deadline.is_some_and(|limit| total_duration > limit)
    }

    fn is_over_budget(&self, total_cost: f64) -> bool {
        self.budget.is_some_and(|limit| total_cost > limit)
    }
}

/// Pre-allocated slot one iteration writes into.
#[derive(Debug, Clone, Copy, Default)]
struct IterationRecord {
    total_duration: f64,
    total_cost: f64,
    success: bool,
    delayed: bool,
    over_budget: bool,
    critical_fired: bool,
}

impl IterationRecord {
    fn from_scenario(scenario: &Scenario<'_>, limits: &SuccessLimits) -> Self {
        Self {
            total_duration: scenario.total_duration,
            total_cost: scenario.total_cost,
            success: scenario.success,
            delayed: limits.is_delayed(scenario.total_duration),
            over_budget: limits.is_over_budget(scenario.total_cost),
            critical_fired: scenario.critical_fired(),
        }
    }
}

/// Row-major driver values for the whole run, one allocation per series.
/// Iteration `i` owns row `i` of each buffer.
struct DriverBuffers {
    task_count: usize,
    risk_count: usize,
    risk_width: usize,
    task_durations: Vec<f64>,
    task_costs: Vec<f64>,
    risk_triggers: Vec<bool>,
}

/// The slice of `DriverBuffers` owned by one iteration.
struct DriverRow<'a> {
    task_durations: &'a mut [f64],
    task_costs: &'a mut [f64],
    risk_triggers: &'a mut [bool],
}

impl DriverBuffers {
    fn new(plan: &PlanSpec, iterations: usize) -> Self {
        let task_count = plan.tasks.len();
        let risk_count = plan.risks.len();
        // A plan without risks still needs one row per iteration.
        let risk_width = risk_count.max(1);
        Self {
            task_count,
            risk_count,
            risk_width,
            task_durations: vec![0.0; iterations * task_count],
            task_costs: vec![0.0; iterations * task_count],
            risk_triggers: vec![false; iterations * risk_width],
        }
    }

    fn rows(&mut self) -> Vec<DriverRow<'_>> {
        let risk_count = self.risk_count;
        self.task_durations
            .chunks_mut(self.task_count)
            .zip(self.task_costs.chunks_mut(self.task_count))
            .zip(self.risk_triggers.chunks_mut(self.risk_width))
            .map(|((task_durations, task_costs), risk_triggers)| DriverRow {
                task_durations,
                task_costs,
                risk_triggers: &mut risk_triggers[..risk_count],
            })
            .collect()
    }

    /// Per-driver columns over the first `completed` iterations.
    fn into_samples(self, plan: &PlanSpec, completed: usize) -> DriverSamples {
        let column = |buffer: &[f64], width: usize, index: usize| -> Vec<f64> {
            (0..completed).map(|row| buffer[row * width + index]).collect()
        };
        let task_durations = (0..self.task_count)
            .map(|task| column(&self.task_durations, self.task_count, task))
            .collect();
        let task_costs = (0..self.task_count)
            .map(|task| column(&self.task_costs, self.task_count, task))
            .collect();
        let risk_triggers = (0..self.risk_count)
            .map(|risk| {
                (0..completed)
                    .map(|row| self.risk_triggers[row * self.risk_width + risk])
                    .collect()
            })
            .collect();

        DriverSamples {
            task_ids: plan.tasks.iter().map(|task| task.id.clone()).collect(),
            risk_ids: plan.risks.iter().map(|risk| risk.id.clone()).collect(),
            task_durations,
            task_costs,
            risk_triggers,
        }
    }
}

pub struct SimulationRunner<D = BetaPertSampler, C = LogNormalSampler> {
    duration_sampler: D,
    cost_sampler: C,
}

impl SimulationRunner {
    pub fn new() -> Self {
        Self::with_samplers(BetaPertSampler, LogNormalSampler)
    }
}

impl Default for SimulationRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, C> SimulationRunner<D, C>
where
    D: ThreePointSampler + Sync,
    C: ThreePointSampler + Sync,
{
    pub fn with_samplers(duration_sampler: D, cost_sampler: C) -> Self {
        Self {
            duration_sampler,
            cost_sampler,
        }
    }

    pub fn run(
        &self,
        plan: &PlanSpec,
        config: &RunConfiguration,
    ) -> Result<SimulationResult, SimulationError> {
        let context = RunContext::from_config(config);
        self.run_with_context(plan, config, &context)
    }

    /// Validates once, then executes the iterations in batches. The
    /// outcome only depends on the plan, the configuration and the context
    /// seed, never on the worker count or scheduling order.
    ///
    /// The context seed replaces `config.seed`. An iteration budget or
    /// timeout left unset on the context is taken from `config`.
    pub fn run_with_context(
        &self,
        plan: &PlanSpec,
        config: &RunConfiguration,
        context: &RunContext,
    ) -> Result<SimulationResult, SimulationError> {
        config.validate()?;
        plan.validate()?;

        let context = &context.clone().with_config_limits(config);
        let target = context.target_iterations(config.num_runs);
        if target == 0 {
            return Err(SimulationError::InvalidIterations);
        }

        info!(
            run_id = %context.run_id(),
            plan = %plan.name,
            requested = config.num_runs,
            target,
            seed = context.seed(),
            "starting simulation"
        );

        let seeds = derive_iteration_seeds(context.seed(), target);
        let limits = SuccessLimits::new(plan, config);
        let mut records = vec![IterationRecord::default(); target];
        let mut buffers = DriverBuffers::new(plan, target);
        let started = Instant::now();
        let deadline = context.deadline_from(started);

        let completed = {
            let mut rows = buffers.rows();
            let mut slots = Slots {
                records: &mut records,
                rows: &mut rows,
                seeds: &seeds,
            };
            match config.worker_threads {
                Some(threads) if config.parallel => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()?;
                    pool.install(|| {
                        self.execute_batches(plan, &limits, &mut slots, config, deadline)
                    })?
                }
                _ => self.execute_batches(plan, &limits, &mut slots, config, deadline)?,
            }
        };

        records.truncate(completed);
        if completed < config.num_runs {
            warn!(
                run_id = %context.run_id(),
                completed,
                requested = config.num_runs,
                "simulation stopped early, result is partial"
            );
        }

        let drivers = buffers.into_samples(plan, completed);
        let result = aggregate(plan, config, context, &records, drivers);
        info!(
            run_id = %result.run_id,
            runs = result.num_runs,
            success_probability = result.success_probability,
            recommendation = %result.recommendation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );
        Ok(result)
    }

    fn execute_batches(
        &self,
        plan: &PlanSpec,
        limits: &SuccessLimits,
        slots: &mut Slots<'_, '_>,
        config: &RunConfiguration,
        deadline: Option<Instant>,
    ) -> Result<usize, SimulationError> {
        let mut completed = 0;
        let batches = slots
            .records
            .chunks_mut(config.batch_size)
            .zip(slots.rows.chunks_mut(config.batch_size))
            .zip(slots.seeds.chunks(config.batch_size));

        for (batch, ((records, rows), seeds)) in batches.enumerate() {
            if completed > 0 && deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }

            if config.parallel {
                records
                    .par_iter_mut()
                    .zip(rows.par_iter_mut())
                    .zip(seeds.par_iter())
                    .try_for_each(|((record, row), seed)| {
                        self.fill_slot(plan, limits, *seed, record, row)
                    })?;
            } else {
                for ((record, row), seed) in records.iter_mut().zip(rows.iter_mut()).zip(seeds) {
                    self.fill_slot(plan, limits, *seed, record, row)?;
                }
            }

            completed += records.len();
            debug!(batch, completed, "batch finished");
        }

        Ok(completed)
    }

    fn fill_slot(
        &self,
        plan: &PlanSpec,
        limits: &SuccessLimits,
        seed: u64,
        record: &mut IterationRecord,
        row: &mut DriverRow<'_>,
    ) -> Result<(), SimulationError> {
        let scenario = self.run_iteration(plan, limits, seed, row)?;
        *record = IterationRecord::from_scenario(&scenario, limits);
        Ok(())
    }

    fn run_iteration<'plan>(
        &self,
        plan: &'plan PlanSpec,
        limits: &SuccessLimits,
        seed: u64,
        row: &mut DriverRow<'_>,
    ) -> Result<Scenario<'plan>, SimulationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut total_duration = 0.0;
        let mut total_cost = 0.0;
        for (idx, task) in plan.tasks.iter().enumerate() {
            let duration = self
                .duration_sampler
                .sample(&task.duration, &mut rng)
                .map_err(|source| SimulationError::Distribution {
                    task: task.id.clone(),
                    source,
                })?;
            let cost = self
                .cost_sampler
                .sample(&task.cost, &mut rng)
                .map_err(|source| SimulationError::Distribution {
                    task: task.id.clone(),
                    source,
                })?;
            total_duration += duration;
            total_cost += cost;
            row.task_durations[idx] = duration;
            row.task_costs[idx] = cost;
        }

        let mut triggered_risks = Vec::new();
        for (idx, risk) in plan.risks.iter().enumerate() {
            let impact = sample_risk_event(risk, &mut rng);
            row.risk_triggers[idx] = impact.triggered;
            if impact.triggered {
                total_duration += impact.duration;
                total_cost += impact.cost;
                triggered_risks.push(risk);
            }
        }

        let mut scenario = Scenario {
            total_duration,
            total_cost,
            success: false,
            triggered_risks,
        };
        scenario.success = !limits.is_delayed(total_duration)
            && !limits.is_over_budget(total_cost)
            && !scenario.critical_fired();
        Ok(scenario)
    }
}

/// Mutable per-iteration storage handed to the batch loop.
struct Slots<'r, 'b> {
    records: &'r mut [IterationRecord],
    rows: &'r mut [DriverRow<'b>],
    seeds: &'r [u64],
}

fn aggregate(
    plan: &PlanSpec,
    config: &RunConfiguration,
    context: &RunContext,
    records: &[IterationRecord],
    drivers: DriverSamples,
) -> SimulationResult {
    let num_runs = records.len();
    let runs = num_runs as f64;
    let fraction = |count: usize| count as f64 / runs;

    let success_count = records.iter().filter(|record| record.success).count();
    let failure_count = num_runs - success_count;
    let delayed = records.iter().filter(|record| record.delayed).count();
    let over_budget = records.iter().filter(|record| record.over_budget).count();
    let critical = records.iter().filter(|record| record.critical_fired).count();

    let durations: Vec<f64> = records.iter().map(|record| record.total_duration).collect();
    let costs: Vec<f64> = records.iter().map(|record| record.total_cost).collect();

    let risk_frequencies = plan
        .risks
        .iter()
        .zip(&drivers.risk_triggers)
        .map(|(risk, triggers)| RiskFrequency {
            id: risk.id.clone(),
            frequency: fraction(triggers.iter().filter(|triggered| **triggered).count()),
        })
        .collect();

    let success_probability = fraction(success_count);
    SimulationResult {
        run_id: context.run_id(),
        plan_name: plan.name.clone(),
        seed: context.seed(),
        requested_runs: config.num_runs,
        num_runs,
        partial: num_runs < config.num_runs,
        success_count,
        failure_count,
        success_probability,
        failure_probability: fraction(failure_count),
        delay_probability: fraction(delayed),
        budget_overrun_probability: fraction(over_budget),
        critical_risk_probability: fraction(critical),
        duration_percentiles: PercentileSummary::from_unsorted(&durations),
        cost_percentiles: PercentileSummary::from_unsorted(&costs),
        duration_stats: SummaryStats::from_values(&durations),
        cost_stats: SummaryStats::from_values(&costs),
        risk_frequencies,
        recommendation: config.thresholds.classify(success_probability),
        durations,
        costs,
        drivers,
    }
}
