//! Substation failure-probability model.
//!
//! A site's failure probability depends only on its utilization
//! `u = load / capacity` and its [`ReliabilityParams`]:
//!
//! ```text
//!  p
//!  1 ┤                        ┌──────────
//!    │                      ╱
//!    │                   ╱
//!    │               ╱
//! p0 ┤━━━━━━━━━━━━━┛
//!    └─────────────┬──────────┬────────── u
//!                knee      overload
//! ```
//!
//! Below the knee the site fails with its base probability; between knee and
//! overload point a power ramp (exponent `curvature`) raises it towards 1;
//! beyond the overload point failure is certain. The function is pure,
//! defined for every load in `[0, +inf)` and non-decreasing in load.

use std::collections::BTreeMap;

use gridplan_core::{
    EvaluationPolicy, GridError, GridResult, Instance, ReliabilityParams, Site, SiteId, Solution,
};

use crate::aggregation::{validated_loads, SiteLoads};

/// Failure probability per activated site.
pub type FailureProbabilities = BTreeMap<SiteId, f64>;

/// Failure probability of `site` when it carries `load`.
///
/// A site with zero capacity fails with its base probability when idle and
/// with certainty under any positive load. Negative loads are treated as 0.
pub fn failure_probability(site: &Site, load: f64) -> f64 {
    let load = load.max(0.0);
    let utilization = if site.capacity > 0.0 {
        load / site.capacity
    } else if load > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    probability_at_utilization(&site.reliability, utilization)
}

/// Failure probability at a given utilization (load as a fraction of capacity).
pub fn probability_at_utilization(params: &ReliabilityParams, utilization: f64) -> f64 {
    let base = params.base_probability;
    if utilization <= params.knee_utilization {
        return base;
    }
    if utilization >= params.overload_utilization {
        return 1.0;
    }
    let span = params.overload_utilization - params.knee_utilization;
    let ramp = ((utilization - params.knee_utilization) / span).powf(params.curvature);
    (base + (1.0 - base) * ramp).min(1.0)
}

/// Threshold a site's failure probability is checked against.
///
/// The site's own `max_failure_probability` wins over the policy's global
/// `failure_threshold`.
pub fn failure_threshold(site: &Site, policy: &EvaluationPolicy) -> f64 {
    site.reliability
        .max_failure_probability
        .unwrap_or(policy.failure_threshold)
}

/// Failure probability of every activated site of `solution`.
///
/// Validates the policy and the solution, aggregates loads, then applies
/// [`failure_probability`] per activated site.
pub fn compute_probabilities_of_failure(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<FailureProbabilities> {
    let loads = validated_loads(instance, solution, policy)?;
    probabilities_from_loads(instance, solution, &loads)
}

/// Failure probabilities from already aggregated loads.
pub fn probabilities_from_loads(
    instance: &Instance,
    solution: &Solution,
    loads: &SiteLoads,
) -> GridResult<FailureProbabilities> {
    solution
        .activated_sites
        .iter()
        .map(|&id| {
            let site = instance.site(id).ok_or_else(|| {
                GridError::Constraint(format!("activated site {id} is not in the instance"))
            })?;
            let load = loads.get(&id).copied().unwrap_or(0.0);
            Ok((id, failure_probability(site, load)))
        })
        .collect()
}
