//! # gridplan-eval: Evaluation Engine for Substation/Cable Plans
//!
//! Scores a [`Solution`](gridplan_core::Solution) against an
//! [`Instance`](gridplan_core::Instance): how much load each substation
//! carries, how likely it is to fail, whether the design is feasible and what
//! it costs. Every entry point is a pure function of its inputs and is safe to
//! call concurrently on shared references.
//!
//! ## Pipeline
//!
//! | Stage | Function | Output |
//! |-------|----------|--------|
//! | Load aggregation | [`aggregate_loads`] | load per site |
//! | Reliability | [`compute_probabilities_of_failure`] | failure probability per activated site |
//! | Feasibility | [`is_feasible`] / [`check_feasibility`] | verdict / full violation report |
//! | Cost | [`cost`] / [`cost_breakdown`] | objective value / its components |
//!
//! [`Evaluator`] runs all stages from a single aggregation and evaluates
//! batches of solutions on the rayon pool (feature `parallel`, on by default).
//!
//! ## Example
//!
//! ```rust
//! use gridplan_core::*;
//! use gridplan_eval::{cost, is_feasible, Evaluator};
//!
//! let instance = Instance::new(
//!     vec![Site::new(SiteId::new(1), "S1", 100.0, 50.0)],
//!     vec![Link::new(
//!         LinkId::new(1),
//!         "L1",
//!         (NodeId::Demand(DemandId::new(1)), NodeId::Site(SiteId::new(1))),
//!         100.0,
//!         10.0,
//!         2.0,
//!     )],
//!     vec![DemandNode::new(DemandId::new(1), "D1", 30.0)],
//!     CostModel::default(),
//! )?;
//! let solution = Solution::new()
//!     .activate(SiteId::new(1))
//!     .use_link(LinkId::new(1), 30.0)
//!     .route(DemandId::new(1), vec![LinkId::new(1)], 30.0);
//! let policy = EvaluationPolicy::default();
//!
//! assert!(is_feasible(&instance, &solution, &policy)?);
//! assert_eq!(cost(&instance, &solution, &policy)?, 120.0);
//!
//! let evaluation = Evaluator::new(&instance, policy)?.evaluate(&solution)?;
//! println!("{}", evaluation.summary());
//! # Ok::<(), GridError>(())
//! ```

pub mod aggregation;
pub mod cost;
pub mod evaluator;
pub mod feasibility;
pub mod reliability;
pub mod topology;

pub use aggregation::{aggregate_loads, SiteLoads};
pub use cost::{
    construction_cost, cost, cost_breakdown, cost_breakdown_with, operational_cost, CostBreakdown,
};
pub use evaluator::{Evaluation, Evaluator};
pub use feasibility::{
    check_feasibility, check_feasibility_with, is_feasible, CheckKind, FeasibilityReport,
    Violation,
};
pub use reliability::{
    compute_probabilities_of_failure, failure_probability, failure_threshold,
    probabilities_from_loads, probability_at_utilization, FailureProbabilities,
};
pub use topology::{walk_route, RouteEnd, UsedNetwork};
