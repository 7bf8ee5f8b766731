pub mod distribution_sampler;
pub mod histogram;
pub mod output_formatter;
pub mod percentiles;
pub mod plan_yaml;
pub mod risk_event_sampler;
pub mod run_config;
pub mod run_context;
pub mod sensitivity;
pub mod simulation;
pub mod simulation_types;
