use rand::Rng;

use crate::domain::estimate::ThreePointEstimate;
use crate::domain::plan::{PlanSpec, RiskEvent, Severity, Task};
use crate::services::distribution_sampler::{DistributionError, ThreePointSampler};

// A mock ThreePointSampler that always returns the most likely value
pub struct MockSampler;
impl ThreePointSampler for MockSampler {
    fn sample<R: Rng + ?Sized>(
        &self,
        estimate: &ThreePointEstimate,
        _rng: &mut R,
    ) -> Result<f64, DistributionError> {
        Ok(estimate.likely)
    }
}

pub fn build_task(id: &str, duration: (f64, f64, f64), cost: (f64, f64, f64)) -> Task {
    Task {
        id: id.to_string(),
        name: id.to_string(),
        duration: ThreePointEstimate::new(duration.0, duration.1, duration.2),
        cost: ThreePointEstimate::new(cost.0, cost.1, cost.2),
    }
}

pub fn build_risk(
    id: &str,
    probability: f64,
    impact_duration: f64,
    impact_cost: f64,
    severity: Severity,
) -> RiskEvent {
    RiskEvent {
        id: id.to_string(),
        name: id.to_string(),
        probability,
        impact_duration,
        impact_cost,
        severity,
    }
}

/// Two tasks, one medium risk, deadline 90 and budget 250000.
pub fn reference_plan() -> PlanSpec {
    let mut plan = PlanSpec::new("Reference");
    plan.deadline = Some(90.0);
    plan.budget = Some(250_000.0);
    plan.tasks.push(build_task(
        "T1",
        (15.0, 20.0, 30.0),
        (40_000.0, 50_000.0, 70_000.0),
    ));
    plan.tasks.push(build_task(
        "T2",
        (30.0, 45.0, 65.0),
        (80_000.0, 120_000.0, 160_000.0),
    ));
    plan.risks
        .push(build_risk("R1", 0.4, 15.0, 20_000.0, Severity::Medium));
    plan
}
