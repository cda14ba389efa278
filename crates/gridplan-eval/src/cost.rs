//! Cost evaluator.
//!
//! ```text
//! cost = construction + operational
//!
//! construction = Σ_{activated sites} c_site + Σ_{used links} c_link
//! operational  = Σ_{used links} flow · c_unit
//!              + Σ_{activated sites} ρ · p_site · load_site     (only with a reliability penalty)
//! ```
//!
//! The reliability penalty rate ρ comes from the instance's
//! [`CostModel`](gridplan_core::CostModel); without one the second term is 0.
//! Costs are defined for infeasible solutions too, so optimizers can combine
//! them with the feasibility verdict however they like.

use gridplan_core::{EvaluationPolicy, GridError, GridResult, Instance, Solution};
use serde::Serialize;

use crate::aggregation::{resolve_used_links, validated_loads, SiteLoads};
use crate::reliability::{probabilities_from_loads, FailureProbabilities};

/// Cost components of a solution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Fixed cost of activated sites and used links
    pub construction: f64,
    /// Flow-weighted cable operating cost
    pub flow: f64,
    /// Expected cost of load carried by sites that may fail
    pub reliability_penalty: f64,
}

impl CostBreakdown {
    pub fn operational(&self) -> f64 {
        self.flow + self.reliability_penalty
    }

    pub fn total(&self) -> f64 {
        self.construction + self.operational()
    }
}

/// Fixed cost of every activated site and every used link.
///
/// Summed in ascending id order; independent of flow magnitudes.
pub fn construction_cost(instance: &Instance, solution: &Solution) -> GridResult<f64> {
    let mut total = 0.0;
    for &id in &solution.activated_sites {
        let site = instance.site(id).ok_or_else(|| {
            GridError::Constraint(format!("activated site {id} is not in the instance"))
        })?;
        total += site.construction_cost;
    }

    total += resolve_used_links(instance, solution)?
        .iter()
        .map(|(link, _)| link.construction_cost)
        .sum::<f64>();
    Ok(total)
}

/// Flow cost plus, when the instance prices it, the reliability penalty.
pub fn operational_cost(
    instance: &Instance,
    solution: &Solution,
    loads: &SiteLoads,
    probabilities: &FailureProbabilities,
) -> GridResult<f64> {
    let (flow, penalty) = operational_components(instance, solution, loads, probabilities)?;
    Ok(flow + penalty)
}

/// Objective value: construction plus operational cost.
pub fn cost(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<f64> {
    let loads = validated_loads(instance, solution, policy)?;
    let probabilities = probabilities_from_loads(instance, solution, &loads)?;
    let total = construction_cost(instance, solution)?
        + operational_cost(instance, solution, &loads, &probabilities)?;
    tracing::trace!(total, "evaluated solution cost");
    Ok(total)
}

/// All cost components of a solution.
pub fn cost_breakdown(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<CostBreakdown> {
    let loads = validated_loads(instance, solution, policy)?;
    let probabilities = probabilities_from_loads(instance, solution, &loads)?;
    cost_breakdown_with(instance, solution, &loads, &probabilities)
}

/// Cost components from precomputed loads and probabilities.
pub fn cost_breakdown_with(
    instance: &Instance,
    solution: &Solution,
    loads: &SiteLoads,
    probabilities: &FailureProbabilities,
) -> GridResult<CostBreakdown> {
    let construction = construction_cost(instance, solution)?;
    let (flow, reliability_penalty) =
        operational_components(instance, solution, loads, probabilities)?;
    Ok(CostBreakdown {
        construction,
        flow,
        reliability_penalty,
    })
}

fn operational_components(
    instance: &Instance,
    solution: &Solution,
    loads: &SiteLoads,
    probabilities: &FailureProbabilities,
) -> GridResult<(f64, f64)> {
    let flow: f64 = resolve_used_links(instance, solution)?
        .iter()
        .map(|(link, flow)| flow * link.unit_operational_cost)
        .sum();

    let penalty = match &instance.cost_model().reliability_penalty {
        Some(p) => probabilities
            .iter()
            .map(|(id, probability)| {
                let load = loads.get(id).copied().unwrap_or(0.0);
                p.cost_per_unit_at_risk * probability * load
            })
            .sum(),
        None => 0.0,
    };

    Ok((flow, penalty))
}
