use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::estimate::ThreePointEstimate;
use crate::domain::plan::{PlanSpec, RiskEvent, Severity, Task};

#[derive(Error, Debug)]
pub enum PlanYamlError {
    #[error("failed to read plan yaml: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse plan yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Serialize, Deserialize)]
struct PlanRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deadline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    budget: Option<f64>,
    tasks: Vec<TaskRecord>,
    #[serde(default)]
    risks: Vec<RiskRecord>,
}

#[derive(Serialize, Deserialize)]
struct TaskRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    duration: ThreePointEstimate,
    cost: ThreePointEstimate,
}

#[derive(Serialize, Deserialize)]
struct RiskRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    probability: f64,
    #[serde(default)]
    impact_duration: f64,
    #[serde(default)]
    impact_cost: f64,
    severity: Severity,
}

/// Reads a plan document. The plan is not validated here; the runner does
/// that once before iterating.
pub fn load_plan_from_yaml_file<P: AsRef<Path>>(path: P) -> Result<PlanSpec, PlanYamlError> {
    let contents = std::fs::read_to_string(path)?;
    deserialize_plan_from_yaml_str(&contents)
}

pub fn deserialize_plan_from_yaml_str(input: &str) -> Result<PlanSpec, PlanYamlError> {
    let record: PlanRecord = serde_yaml::from_str(input)?;
    let tasks = record
        .tasks
        .into_iter()
        .map(|task| Task {
            name: task.name.unwrap_or_else(|| task.id.clone()),
            id: task.id,
            duration: task.duration,
            cost: task.cost,
        })
        .collect();
    let risks = record
        .risks
        .into_iter()
        .map(|risk| RiskEvent {
            name: risk.name.unwrap_or_else(|| risk.id.clone()),
            id: risk.id,
            probability: risk.probability,
            impact_duration: risk.impact_duration,
            impact_cost: risk.impact_cost,
            severity: risk.severity,
        })
        .collect();

    Ok(PlanSpec {
        name: record.name,
        deadline: record.deadline,
        budget: record.budget,
        tasks,
        risks,
    })
}

pub fn serialize_plan_to_yaml<W: Write>(writer: &mut W, plan: &PlanSpec) -> io::Result<()> {
    let record = PlanRecord {
        name: plan.name.clone(),
        deadline: plan.deadline,
        budget: plan.budget,
        tasks: plan
            .tasks
            .iter()
            .map(|task| TaskRecord {
                id: task.id.clone(),
                name: Some(task.name.clone()),
                duration: task.duration,
                cost: task.cost,
            })
            .collect(),
        risks: plan
            .risks
            .iter()
            .map(|risk| RiskRecord {
                id: risk.id.clone(),
                name: Some(risk.name.clone()),
                probability: risk.probability,
                impact_duration: risk.impact_duration,
                impact_cost: risk.impact_cost,
                severity: risk.severity,
            })
            .collect(),
    };

    let yaml = serde_yaml::to_string(&record).map_err(io::Error::other)?;
    writer.write_all(yaml.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::reference_plan;

    const PLAN_YAML: &str = r#"
name: Website relaunch
deadline: 90
budget: 250000
tasks:
  - id: T1
    name: Design
    duration: { min: 15, likely: 20, max: 30 }
    cost: { min: 40000, likely: 50000, max: 70000 }
  - id: T2
    duration: { min: 30, likely: 45, max: 65 }
    cost: { min: 80000, likely: 120000, max: 160000 }
risks:
  - id: R1
    name: Vendor delay
    probability: 0.4
    impact_duration: 15
    impact_cost: 20000
    severity: medium
"#;

    #[test]
    fn deserialize_plan_reads_all_fields() {
        let plan = deserialize_plan_from_yaml_str(PLAN_YAML).unwrap();
        assert_eq!(plan.name, "Website relaunch");
        assert_eq!(plan.deadline, Some(90.0));
        assert_eq!(plan.budget, Some(250_000.0));
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].name, "Design");
        assert_eq!(plan.tasks[1].name, "T2");
        assert_eq!(plan.tasks[1].duration, ThreePointEstimate::new(30.0, 45.0, 65.0));
        assert_eq!(plan.risks[0].severity, Severity::Medium);
        assert_eq!(plan.risks[0].impact_cost, 20_000.0);
    }

    #[test]
    fn deadline_budget_and_risks_are_optional() {
        let yaml = "name: Minimal\ntasks:\n  - id: A\n    duration: {min: 1, likely: 2, max: 3}\n    cost: {min: 1, likely: 1, max: 1}\n";
        let plan = deserialize_plan_from_yaml_str(yaml).unwrap();
        assert_eq!(plan.deadline, None);
        assert_eq!(plan.budget, None);
        assert!(plan.risks.is_empty());
    }

    #[test]
    fn unknown_severity_is_a_parse_error() {
        let yaml = PLAN_YAML.replace("severity: medium", "severity: catastrophic");
        assert!(matches!(
            deserialize_plan_from_yaml_str(&yaml),
            Err(PlanYamlError::Parse(_))
        ));
    }

    #[test]
    fn serialized_plan_reads_back_unchanged() {
        let plan = reference_plan();
        let mut buffer = Vec::new();
        serialize_plan_to_yaml(&mut buffer, &plan).unwrap();
        let yaml = String::from_utf8(buffer).unwrap();
        assert!(yaml.contains("severity: medium"));
        assert_eq!(deserialize_plan_from_yaml_str(&yaml).unwrap(), plan);
    }
}
