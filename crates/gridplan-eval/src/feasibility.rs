//! Feasibility checker.
//!
//! A solution is feasible when every check below passes:
//!
//! | Check | Condition |
//! |-------|-----------|
//! | [`CheckKind::Routing`] | routes are contiguous walks from their demand node to an activated site; every demand node with demand can reach an activated site over used links |
//! | [`CheckKind::Conservation`] | each link's declared flow equals the quantity routed across it |
//! | [`CheckKind::LinkUsage`] | routes only carry quantity over used links |
//! | [`CheckKind::SiteCapacity`] | only activated sites carry load, and never above capacity |
//! | [`CheckKind::Reliability`] | each activated site's failure probability is at most its threshold |
//! | [`CheckKind::Coverage`] | each demand node's routed quantity equals its demand |
//!
//! Infeasibility is a normal outcome and never an error. Errors are reserved
//! for malformed input ([`GridError::MalformedInput`]) and violated
//! aggregation preconditions ([`GridError::Constraint`]), e.g. a flow above
//! a link's capacity.
//!
//! Routes whose quantity is within tolerance of zero move nothing and are
//! ignored by the routing and link-usage checks.
//!
//! [`is_feasible`] stops at the first violation; [`check_feasibility`]
//! collects all of them into a [`FeasibilityReport`]. Both give the same
//! verdict for every input.
//!
//! [`GridError::MalformedInput`]: gridplan_core::GridError::MalformedInput
//! [`GridError::Constraint`]: gridplan_core::GridError::Constraint

use std::collections::HashMap;
use std::fmt;

use gridplan_core::{
    Diagnostics, DiagnosticIssue, EvaluationPolicy, GridResult, Instance, LinkId, NodeId,
    Severity, Solution,
};
use serde::Serialize;

use crate::aggregation::{validated_loads, SiteLoads};
use crate::reliability::{failure_threshold, probabilities_from_loads, FailureProbabilities};
use crate::topology::{walk_route, RouteEnd, UsedNetwork};

/// The feasibility check a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Routing,
    Conservation,
    LinkUsage,
    SiteCapacity,
    Reliability,
    Coverage,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Routing => "routing",
            CheckKind::Conservation => "conservation",
            CheckKind::LinkUsage => "link_usage",
            CheckKind::SiteCapacity => "site_capacity",
            CheckKind::Reliability => "reliability",
            CheckKind::Coverage => "coverage",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub check: CheckKind,
    /// Entity the violation is about (e.g. "Site#3")
    pub entity: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.check, self.entity, self.message)
    }
}

/// Outcome of a feasibility check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeasibilityReport {
    violations: Vec<Violation>,
}

impl FeasibilityReport {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in check order, then instance order
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn violations_of(&self, check: CheckKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.check == check)
    }

    /// Human-readable diagnostic lines, one per violation
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }

    /// Violations as error-severity diagnostics
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        for v in &self.violations {
            diag.add(
                DiagnosticIssue::new(Severity::Error, v.check.as_str(), v.message.clone())
                    .with_entity(v.entity.clone()),
            );
        }
        diag
    }
}

/// Whether `solution` is feasible for `instance`, stopping at the first
/// failed check.
pub fn is_feasible(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<bool> {
    let loads = validated_loads(instance, solution, policy)?;
    let probabilities = probabilities_from_loads(instance, solution, &loads)?;
    let report = run_checks(instance, solution, policy, &loads, &probabilities, true);
    Ok(report.is_feasible())
}

/// Run every check and collect all violations.
pub fn check_feasibility(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
) -> GridResult<FeasibilityReport> {
    let loads = validated_loads(instance, solution, policy)?;
    let probabilities = probabilities_from_loads(instance, solution, &loads)?;
    Ok(run_checks(instance, solution, policy, &loads, &probabilities, false))
}

/// Run every check against precomputed loads and probabilities.
///
/// `solution` must already be validated against `instance`.
pub fn check_feasibility_with(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    loads: &SiteLoads,
    probabilities: &FailureProbabilities,
) -> FeasibilityReport {
    run_checks(instance, solution, policy, loads, probabilities, false)
}

struct Sink {
    fail_fast: bool,
    violations: Vec<Violation>,
}

impl Sink {
    fn push(&mut self, check: CheckKind, entity: impl fmt::Display, message: String) {
        let entity = entity.to_string();
        tracing::debug!(check = check.as_str(), entity = %entity, "{message}");
        self.violations.push(Violation {
            check,
            entity,
            message,
        });
    }

    fn done(&self) -> bool {
        self.fail_fast && !self.violations.is_empty()
    }
}

fn run_checks(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    loads: &SiteLoads,
    probabilities: &FailureProbabilities,
    fail_fast: bool,
) -> FeasibilityReport {
    let mut sink = Sink {
        fail_fast,
        violations: Vec::new(),
    };

    let routed = routed_per_link(solution);
    check_routing(instance, solution, policy, &mut sink);
    if !sink.done() {
        check_conservation(instance, solution, policy, &routed, &mut sink);
    }
    if !sink.done() {
        check_link_usage(instance, solution, policy, &routed, &mut sink);
    }
    if !sink.done() {
        check_site_capacity(instance, solution, policy, loads, &mut sink);
    }
    if !sink.done() {
        check_reliability(instance, policy, probabilities, &mut sink);
    }
    if !sink.done() {
        check_coverage(instance, solution, policy, &mut sink);
    }

    tracing::debug!(
        violations = sink.violations.len(),
        fail_fast,
        "feasibility checks finished"
    );
    FeasibilityReport {
        violations: sink.violations,
    }
}

/// Quantity routed across each link, counting a link once per traversal.
fn routed_per_link(solution: &Solution) -> HashMap<LinkId, f64> {
    let mut routed = HashMap::new();
    for routing in &solution.assignment {
        for route in &routing.routes {
            for &link in &route.links {
                *routed.entry(link).or_insert(0.0) += route.quantity;
            }
        }
    }
    routed
}

fn check_routing(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    sink: &mut Sink,
) {
    for routing in &solution.assignment {
        for (i, route) in routing.routes.iter().enumerate() {
            // a route that moves nothing constrains nothing
            if route.quantity <= policy.tolerance {
                continue;
            }
            match walk_route(instance, routing.demand, route) {
                RouteEnd::Site(site) if solution.is_activated(site) => {}
                RouteEnd::Site(site) => sink.push(
                    CheckKind::Routing,
                    routing.demand,
                    format!("route {i} ends at {site}, which is not activated"),
                ),
                RouteEnd::Demand(end) => sink.push(
                    CheckKind::Routing,
                    routing.demand,
                    format!("route {i} ends at {end} instead of a site"),
                ),
                RouteEnd::Broken { step, link, at } => sink.push(
                    CheckKind::Routing,
                    routing.demand,
                    format!("route {i} breaks at step {step}: {link} does not touch {at}"),
                ),
            }
            if sink.done() {
                return;
            }
        }
    }

    let network = UsedNetwork::build(instance, solution);
    for node in instance.demand_nodes() {
        if node.demand <= policy.tolerance {
            continue;
        }
        if !network.reaches_activated_site(instance, NodeId::Demand(node.id)) {
            sink.push(
                CheckKind::Routing,
                node.id,
                "no activated site is reachable over used links".to_string(),
            );
            if sink.done() {
                return;
            }
        }
    }
}

fn check_conservation(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    routed: &HashMap<LinkId, f64>,
    sink: &mut Sink,
) {
    let declared: HashMap<LinkId, f64> = solution
        .used_links
        .iter()
        .map(|lf| (lf.link, lf.flow))
        .collect();

    for link in instance.links() {
        let flow = declared.get(&link.id).copied().unwrap_or(0.0);
        let carried = routed.get(&link.id).copied().unwrap_or(0.0);
        if (flow - carried).abs() > policy.tolerance {
            sink.push(
                CheckKind::Conservation,
                link.id,
                format!("declared flow {flow} but routes carry {carried}"),
            );
            if sink.done() {
                return;
            }
        }
    }
}

fn check_link_usage(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    routed: &HashMap<LinkId, f64>,
    sink: &mut Sink,
) {
    for link in instance.links() {
        let carried = routed.get(&link.id).copied().unwrap_or(0.0);
        if carried > policy.tolerance && solution.link_flow(link.id).is_none() {
            sink.push(
                CheckKind::LinkUsage,
                link.id,
                "traversed by a route but not marked as used".to_string(),
            );
            if sink.done() {
                return;
            }
        }
    }
}

fn check_site_capacity(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    loads: &SiteLoads,
    sink: &mut Sink,
) {
    for site in instance.sites() {
        let load = loads.get(&site.id).copied().unwrap_or(0.0);
        let activated = solution.is_activated(site.id);
        if !activated && load > policy.tolerance {
            sink.push(
                CheckKind::SiteCapacity,
                site.id,
                format!("receives load {load} but is not activated"),
            );
        } else if activated && load > site.capacity + policy.tolerance {
            sink.push(
                CheckKind::SiteCapacity,
                site.id,
                format!("load {load} exceeds capacity {}", site.capacity),
            );
        } else if activated && !policy.allow_idle_sites && load <= policy.tolerance {
            sink.push(
                CheckKind::SiteCapacity,
                site.id,
                "activated but carries no load".to_string(),
            );
        }
        if sink.done() {
            return;
        }
    }
}

fn check_reliability(
    instance: &Instance,
    policy: &EvaluationPolicy,
    probabilities: &FailureProbabilities,
    sink: &mut Sink,
) {
    for (&id, &probability) in probabilities {
        let Some(site) = instance.site(id) else {
            continue;
        };
        // strict: equal to the threshold passes, no tolerance
        let threshold = failure_threshold(site, policy);
        if probability > threshold {
            sink.push(
                CheckKind::Reliability,
                id,
                format!("failure probability {probability:.6} exceeds threshold {threshold}"),
            );
            if sink.done() {
                return;
            }
        }
    }
}

fn check_coverage(
    instance: &Instance,
    solution: &Solution,
    policy: &EvaluationPolicy,
    sink: &mut Sink,
) {
    for node in instance.demand_nodes() {
        let routed = solution
            .routing(node.id)
            .map(|r| r.routed_quantity())
            .unwrap_or(0.0);
        if (routed - node.demand).abs() > policy.tolerance {
            sink.push(
                CheckKind::Coverage,
                node.id,
                format!("routed {routed} of required demand {}", node.demand),
            );
            if sink.done() {
                return;
            }
        }
    }
}
