use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::estimate::ThreePointEstimate;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanValidationError {
    #[error("plan has no tasks")]
    NoTasks,
    #[error("task at position {0} has an empty id")]
    EmptyTaskId(usize),
    #[error("duplicate task id {0}")]
    DuplicateTaskId(String),
    #[error("task {task} has an invalid {field} estimate (min {min}, likely {likely}, max {max})")]
    InvalidEstimate {
        task: String,
        field: &'static str,
        min: f64,
        likely: f64,
        max: f64,
    },
    #[error("risk event at position {0} has an empty id")]
    EmptyRiskId(usize),
    #[error("duplicate risk event id {0}")]
    DuplicateRiskId(String),
    #[error("risk event {risk} has probability {probability} outside [0, 1]")]
    InvalidProbability { risk: String, probability: f64 },
    #[error("risk event {risk} has an invalid {field} impact {value}")]
    InvalidImpact {
        risk: String,
        field: &'static str,
        value: f64,
    },
    #[error("invalid deadline {0}")]
    InvalidDeadline(f64),
    #[error("invalid budget {0}")]
    InvalidBudget(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub duration: ThreePointEstimate,
    pub cost: ThreePointEstimate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskEvent {
    pub id: String,
    pub name: String,
    pub probability: f64,
    pub impact_duration: f64,
    pub impact_cost: f64,
    pub severity: Severity,
}

impl RiskEvent {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// A plan as handed over by the upstream plan extraction. Read-only during a
/// simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSpec {
    pub name: String,
    pub deadline: Option<f64>,
    pub budget: Option<f64>,
    pub tasks: Vec<Task>,
    pub risks: Vec<RiskEvent>,
}

impl PlanSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deadline: None,
            budget: None,
            tasks: Vec::new(),
            risks: Vec::new(),
        }
    }

    /// Checks every structural invariant and reports the first violation.
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        if self.tasks.is_empty() {
            return Err(PlanValidationError::NoTasks);
        }
        if let Some(deadline) = self.deadline {
            if !deadline.is_finite() || deadline <= 0.0 {
                return Err(PlanValidationError::InvalidDeadline(deadline));
            }
        }
        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(PlanValidationError::InvalidBudget(budget));
            }
        }

        let mut task_ids = HashSet::with_capacity(self.tasks.len());
        for (position, task) in self.tasks.iter().enumerate() {
            if task.id.trim().is_empty() {
                return Err(PlanValidationError::EmptyTaskId(position));
            }
            if !task_ids.insert(task.id.as_str()) {
                return Err(PlanValidationError::DuplicateTaskId(task.id.clone()));
            }
            check_estimate(&task.id, "duration", &task.duration)?;
            check_estimate(&task.id, "cost", &task.cost)?;
        }

        let mut risk_ids = HashSet::with_capacity(self.risks.len());
        for (position, risk) in self.risks.iter().enumerate() {
            if risk.id.trim().is_empty() {
                return Err(PlanValidationError::EmptyRiskId(position));
            }
            if !risk_ids.insert(risk.id.as_str()) {
                return Err(PlanValidationError::DuplicateRiskId(risk.id.clone()));
            }
            if !(0.0..=1.0).contains(&risk.probability) {
                return Err(PlanValidationError::InvalidProbability {
                    risk: risk.id.clone(),
                    probability: risk.probability,
                });
            }
            check_impact(&risk.id, "duration", risk.impact_duration)?;
            check_impact(&risk.id, "cost", risk.impact_cost)?;
        }

        Ok(())
    }
}

fn check_estimate(
    task: &str,
    field: &'static str,
    estimate: &ThreePointEstimate,
) -> Result<(), PlanValidationError> {
    if estimate.is_consistent() {
        return Ok(());
    }
    Err(PlanValidationError::InvalidEstimate {
        task: task.to_string(),
        field,
        min: estimate.min,
        likely: estimate.likely,
        max: estimate.max,
    })
}

fn check_impact(risk: &str, field: &'static str, value: f64) -> Result<(), PlanValidationError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(PlanValidationError::InvalidImpact {
        risk: risk.to_string(),
        field,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_risk, build_task};

    fn valid_plan() -> PlanSpec {
        let mut plan = PlanSpec::new("Demo");
        plan.deadline = Some(30.0);
        plan.budget = Some(1000.0);
        plan.tasks.push(build_task("T1", (1.0, 2.0, 3.0), (10.0, 20.0, 30.0)));
        plan.risks
            .push(build_risk("R1", 0.5, 1.0, 5.0, Severity::Low));
        plan
    }

    #[test]
    fn valid_plan_passes_validation() {
        assert_eq!(valid_plan().validate(), Ok(()));
    }

    #[test]
    fn plan_without_tasks_is_rejected() {
        let mut plan = valid_plan();
        plan.tasks.clear();
        assert_eq!(plan.validate(), Err(PlanValidationError::NoTasks));
    }

    #[test]
    fn inverted_duration_estimate_names_task_and_field() {
        let mut plan = valid_plan();
        plan.tasks[0].duration = ThreePointEstimate::new(5.0, 2.0, 8.0);

        let error = plan.validate().unwrap_err();
        assert!(matches!(
            error,
            PlanValidationError::InvalidEstimate { ref task, field: "duration", .. } if task == "T1"
        ));
    }

    #[test]
    fn negative_cost_is_rejected() {
        let mut plan = valid_plan();
        plan.tasks[0].cost = ThreePointEstimate::new(-1.0, 0.0, 1.0);
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::InvalidEstimate { field: "cost", .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut plan = valid_plan();
        plan.tasks.push(build_task("T1", (1.0, 1.0, 1.0), (1.0, 1.0, 1.0)));
        assert_eq!(
            plan.validate(),
            Err(PlanValidationError::DuplicateTaskId("T1".to_string()))
        );

        let mut plan = valid_plan();
        plan.risks
            .push(build_risk("R1", 0.1, 0.0, 0.0, Severity::Medium));
        assert_eq!(
            plan.validate(),
            Err(PlanValidationError::DuplicateRiskId("R1".to_string()))
        );
    }

    #[test]
    fn out_of_range_risk_probability_is_rejected() {
        let mut plan = valid_plan();
        plan.risks[0].probability = 1.2;
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::InvalidProbability { .. })
        ));

        plan.risks[0].probability = f64::NAN;
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn non_positive_deadline_and_budget_are_rejected() {
        let mut plan = valid_plan();
        plan.deadline = Some(0.0);
        assert_eq!(plan.validate(), Err(PlanValidationError::InvalidDeadline(0.0)));

        let mut plan = valid_plan();
        plan.budget = Some(-5.0);
        assert_eq!(plan.validate(), Err(PlanValidationError::InvalidBudget(-5.0)));
    }

    #[test]
    fn unconstrained_plan_is_valid() {
        let mut plan = valid_plan();
        plan.deadline = None;
        plan.budget = None;
        assert_eq!(plan.validate(), Ok(()));
    }
}
