//! Per-site load aggregation.
//!
//! The load of a site is the sum of the flows on every used link that has
//! the site as an endpoint. A link between two sites loads both; a link
//! between two demand nodes loads neither.

use std::collections::BTreeMap;

use gridplan_core::{EvaluationPolicy, GridError, GridResult, Instance, Link, SiteId, Solution};

/// Aggregate load per site. Every site of the instance is present.
pub type SiteLoads = BTreeMap<SiteId, f64>;

/// Sum used-link flows into the sites they touch.
///
/// Fails with [`GridError::Constraint`] when a used link is not in the
/// instance, is listed more than once, or its flow is negative, non-finite
/// or above the link capacity (beyond `policy.tolerance`). Flows are never
/// clipped.
///
/// Contributions are summed in ascending link order, so the result does not
/// depend on the order of `solution.used_links`.
pub fn aggregate_loads(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<SiteLoads> {
    let flows = resolve_used_links(instance, solution)?;
    for &(link, flow) in &flows {
        if !flow.is_finite() || flow < 0.0 {
            return Err(GridError::Constraint(format!(
                "{}: flow must be finite and non-negative, got {flow}",
                link.id
            )));
        }
        if flow > link.capacity + policy.tolerance {
            return Err(GridError::Constraint(format!(
                "{}: flow {flow} exceeds capacity {}",
                link.id, link.capacity
            )));
        }
    }

    let mut loads: SiteLoads = instance.sites().iter().map(|s| (s.id, 0.0)).collect();
    for (link, flow) in flows {
        for site in link.site_endpoints() {
            *loads.entry(site).or_insert(0.0) += flow;
        }
    }

    tracing::trace!(sites = loads.len(), "aggregated site loads");
    Ok(loads)
}

/// Used links with their flows, in ascending link order.
///
/// Fails with [`GridError::Constraint`] when a link is not in the instance
/// or appears more than once.
pub(crate) fn resolve_used_links<'a>(
    instance: &'a Instance,
    solution: &Solution,
) -> GridResult<Vec<(&'a Link, f64)>> {
    let mut flows = Vec::with_capacity(solution.used_links.len());
    for lf in &solution.used_links {
        let link = instance.link(lf.link).ok_or_else(|| {
            GridError::Constraint(format!("used link {} is not in the instance", lf.link))
        })?;
        flows.push((link, lf.flow));
    }
    flows.sort_by_key(|(link, _)| link.id);
    if let Some(pair) = flows.windows(2).find(|w| w[0].0.id == w[1].0.id) {
        return Err(GridError::Constraint(format!(
            "used link {} is listed more than once",
            pair[0].0.id
        )));
    }
    Ok(flows)
}

/// Validate the policy and the solution, then aggregate.
///
/// Shared prologue of every public evaluation entry point.
pub(crate) fn validated_loads(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<SiteLoads> {
    policy.validate()?;
    solution.validate(instance)?;
    aggregate_loads(instance, solution, policy)
}
