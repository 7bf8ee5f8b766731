use rand::Rng;

use crate::domain::plan::RiskEvent;

/// Impact of one risk event in one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskImpact {
    pub triggered: bool,
    pub duration: f64,
    pub cost: f64,
}

impl RiskImpact {
    pub const NONE: RiskImpact = RiskImpact {
        triggered: false,
        duration: 0.0,
        cost: 0.0,
    };
}

/// One Bernoulli trial for `risk`. Always consumes exactly one uniform draw,
/// so the random stream does not depend on earlier outcomes.
///
/// Events are sampled independently of each other and of task estimates;
/// correlated risks are not modelled.
pub fn sample_risk_event<R: Rng + ?Sized>(risk: &RiskEvent, rng: &mut R) -> RiskImpact {
    let draw: f64 = rng.r#gen();
    if draw < risk.probability {
        RiskImpact {
            triggered: true,
            duration: risk.impact_duration,
            cost: risk.impact_cost,
        }
    } else {
        RiskImpact::NONE
    }
}
