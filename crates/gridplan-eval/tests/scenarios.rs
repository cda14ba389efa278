use gridplan_core::{
    CostModel, DemandId, DemandNode, EvaluationPolicy, Instance, Link, LinkId, NodeId,
    ReliabilityParams, Site, SiteId, Solution,
};
use gridplan_eval::{
    aggregate_loads, check_feasibility, compute_probabilities_of_failure, construction_cost, cost,
    cost_breakdown, failure_probability, is_feasible, operational_cost, probabilities_from_loads,
    CheckKind, Evaluator,
};

/// One site (capacity 100, cost 50), one demand node, one link between them
/// (capacity 100, cost 10, unit cost 2).
fn single_site_instance(demand: f64, reliability: ReliabilityParams) -> Instance {
    Instance::new(
        vec![Site::new(SiteId::new(1), "substation", 100.0, 50.0).with_reliability(reliability)],
        vec![Link::new(
            LinkId::new(1),
            "feeder",
            (NodeId::Demand(DemandId::new(1)), NodeId::Site(SiteId::new(1))),
            100.0,
            10.0,
            2.0,
        )],
        vec![DemandNode::new(DemandId::new(1), "town", demand)],
        CostModel::default(),
    )
    .unwrap()
}

fn single_link_solution(flow: f64) -> Solution {
    Solution::new()
        .activate(SiteId::new(1))
        .use_link(LinkId::new(1), flow)
        .route(DemandId::new(1), vec![LinkId::new(1)], flow)
}

/// Two sites feeding three demand nodes, one of them through another.
///
/// ```text
///   D1 -L1- S1 -L4- S2 -L3- D3
///   |
///   L2
///   |
///   D2
/// ```
fn radial_instance() -> Instance {
    let d = |id| NodeId::Demand(DemandId::new(id));
    let s = |id| NodeId::Site(SiteId::new(id));
    Instance::new(
        vec![
            Site::new(SiteId::new(1), "north", 120.0, 80.0),
            Site::new(SiteId::new(2), "south", 60.0, 45.0)
                .with_reliability(ReliabilityParams::new(0.02, 0.7, 1.1)),
        ],
        vec![
            Link::new(LinkId::new(1), "L1", (d(1), s(1)), 100.0, 12.0, 1.5),
            Link::new(LinkId::new(2), "L2", (d(2), d(1)), 50.0, 8.0, 1.0),
            Link::new(LinkId::new(3), "L3", (s(2), d(3)), 60.0, 9.0, 1.2),
            Link::new(LinkId::new(4), "L4", (s(1), s(2)), 80.0, 30.0, 0.5),
        ],
        vec![
            DemandNode::new(DemandId::new(1), "D1", 40.0),
            DemandNode::new(DemandId::new(2), "D2", 25.0),
            DemandNode::new(DemandId::new(3), "D3", 35.0),
        ],
        CostModel::with_reliability_penalty(4.0),
    )
    .unwrap()
}

fn radial_solution() -> Solution {
    Solution::new()
        .activate(SiteId::new(1))
        .activate(SiteId::new(2))
        .use_link(LinkId::new(1), 65.0)
        .use_link(LinkId::new(2), 25.0)
        .use_link(LinkId::new(3), 35.0)
        .route(DemandId::new(1), vec![LinkId::new(1)], 40.0)
        .route(DemandId::new(2), vec![LinkId::new(2), LinkId::new(1)], 25.0)
        .route(DemandId::new(3), vec![LinkId::new(3)], 35.0)
}

#[test]
fn test_single_site_feasible_and_priced() {
    let instance = single_site_instance(30.0, ReliabilityParams::default());
    let solution = single_link_solution(30.0);
    let policy = EvaluationPolicy::default();

    assert!(is_feasible(&instance, &solution, &policy).unwrap());
    assert_eq!(construction_cost(&instance, &solution).unwrap(), 60.0);

    let loads = aggregate_loads(&instance, &solution, &policy).unwrap();
    let probabilities = probabilities_from_loads(&instance, &solution, &loads).unwrap();
    assert_eq!(
        operational_cost(&instance, &solution, &loads, &probabilities).unwrap(),
        60.0
    );
    assert_eq!(cost(&instance, &solution, &policy).unwrap(), 120.0);
}

#[test]
fn test_flow_above_link_capacity_is_rejected() {
    let instance = single_site_instance(30.0, ReliabilityParams::default());
    let solution = single_link_solution(150.0);
    let policy = EvaluationPolicy::default();

    let err = is_feasible(&instance, &solution, &policy).unwrap_err();
    assert!(err.is_constraint());
    assert!(cost(&instance, &solution, &policy).unwrap_err().is_constraint());
    assert!(aggregate_loads(&instance, &solution, &policy)
        .unwrap_err()
        .is_constraint());
}

#[test]
fn test_overloaded_site_fails_reliability() {
    // default curve: p(0.8) = 0.01, p(0.9) = 0.01 + 0.99 * 0.25^2 > 0.05
    let instance = single_site_instance(90.0, ReliabilityParams::default());
    let policy = EvaluationPolicy::default();

    let at_knee = single_site_instance(80.0, ReliabilityParams::default());
    assert!(is_feasible(&at_knee, &single_link_solution(80.0), &policy).unwrap());

    let solution = single_link_solution(90.0);
    assert!(!is_feasible(&instance, &solution, &policy).unwrap());

    let report = check_feasibility(&instance, &solution, &policy).unwrap();
    let reliability: Vec<_> = report.violations_of(CheckKind::Reliability).collect();
    assert_eq!(reliability.len(), 1);
    assert_eq!(reliability[0].entity, "Site#1");
    assert!(report
        .messages()
        .iter()
        .any(|m| m.starts_with("[reliability] Site#1")));
}

#[test]
fn test_probability_equal_to_threshold_passes() {
    let policy = EvaluationPolicy::default();

    // below the knee the probability is exactly the base probability
    let at_threshold = single_site_instance(30.0, ReliabilityParams::new(0.05, 0.8, 1.2));
    assert!(is_feasible(&at_threshold, &single_link_solution(30.0), &policy).unwrap());

    let above = single_site_instance(30.0, ReliabilityParams::new(0.050001, 0.8, 1.2));
    assert!(!is_feasible(&above, &single_link_solution(30.0), &policy).unwrap());

    // a site threshold set to the exact probability at 90% also passes
    let probe = Site::new(SiteId::new(1), "probe", 100.0, 50.0);
    let p = failure_probability(&probe, 90.0);
    let own = single_site_instance(
        90.0,
        ReliabilityParams::default().with_max_failure_probability(p),
    );
    assert!(is_feasible(&own, &single_link_solution(90.0), &policy).unwrap());
}

#[test]
fn test_radial_network_evaluation() {
    let instance = radial_instance();
    let solution = radial_solution();
    let policy = EvaluationPolicy::default();

    let loads = aggregate_loads(&instance, &solution, &policy).unwrap();
    assert_eq!(loads[&SiteId::new(1)], 65.0);
    assert_eq!(loads[&SiteId::new(2)], 35.0);

    let probabilities = compute_probabilities_of_failure(&instance, &solution, &policy).unwrap();
    assert_eq!(probabilities[&SiteId::new(1)], 0.01);
    assert_eq!(probabilities[&SiteId::new(2)], 0.02);

    assert!(check_feasibility(&instance, &solution, &policy)
        .unwrap()
        .is_feasible());

    let breakdown = cost_breakdown(&instance, &solution, &policy).unwrap();
    assert_eq!(breakdown.construction, 80.0 + 45.0 + 12.0 + 8.0 + 9.0);
    assert_eq!(breakdown.flow, 65.0 * 1.5 + 25.0 * 1.0 + 35.0 * 1.2);
    let penalty = 4.0 * (0.01 * 65.0 + 0.02 * 35.0);
    assert!((breakdown.reliability_penalty - penalty).abs() < 1e-9);
    assert_eq!(breakdown.total(), cost(&instance, &solution, &policy).unwrap());
}

#[test]
fn test_site_to_site_link_loads_both_ends() {
    let instance = radial_instance();
    let policy = EvaluationPolicy::default();
    // S1 also feeds D3 through S2
    let solution = Solution::new()
        .activate(SiteId::new(1))
        .use_link(LinkId::new(1), 65.0)
        .use_link(LinkId::new(2), 25.0)
        .use_link(LinkId::new(3), 35.0)
        .use_link(LinkId::new(4), 35.0)
        .route(DemandId::new(1), vec![LinkId::new(1)], 40.0)
        .route(DemandId::new(2), vec![LinkId::new(2), LinkId::new(1)], 25.0)
        .route(DemandId::new(3), vec![LinkId::new(3), LinkId::new(4)], 35.0);

    let loads = aggregate_loads(&instance, &solution, &policy).unwrap();
    assert_eq!(loads[&SiteId::new(1)], 100.0);
    assert_eq!(loads[&SiteId::new(2)], 70.0);

    // S2 is passed through while not activated
    let report = check_feasibility(&instance, &solution, &policy).unwrap();
    assert!(report
        .violations_of(CheckKind::SiteCapacity)
        .any(|v| v.entity == "Site#2"));
}

#[test]
fn test_evaluation_is_idempotent() {
    let instance = radial_instance();
    let solution = radial_solution();
    let evaluator = Evaluator::new(&instance, EvaluationPolicy::default()).unwrap();

    let first = evaluator.evaluate(&solution).unwrap();
    let second = evaluator.evaluate(&solution).unwrap();
    assert_eq!(first, second);
    assert_eq!(solution, radial_solution());
}

#[test]
fn test_used_link_order_does_not_change_results() {
    let instance = radial_instance();
    let solution = radial_solution();
    let mut shuffled = solution.clone();
    shuffled.used_links.reverse();
    shuffled.used_links.swap(0, 1);

    let evaluator = Evaluator::new(&instance, EvaluationPolicy::default()).unwrap();
    let a = evaluator.evaluate(&solution).unwrap();
    let b = evaluator.evaluate(&shuffled).unwrap();
    assert_eq!(a.loads, b.loads);
    assert_eq!(a.probabilities, b.probabilities);
    assert_eq!(a.costs, b.costs);
    assert_eq!(a.is_feasible(), b.is_feasible());
}

#[test]
fn test_evaluator_agrees_with_free_functions() {
    let instance = radial_instance();
    let policy = EvaluationPolicy::default();
    let mut unbalanced = radial_solution();
    unbalanced.used_links[0].flow = 70.0;
    let solutions = vec![radial_solution(), unbalanced, Solution::new()];

    let evaluator = Evaluator::new(&instance, policy.clone()).unwrap();
    let batch = evaluator.evaluate_batch(&solutions);
    assert_eq!(batch.len(), solutions.len());

    for (solution, result) in solutions.iter().zip(&batch) {
        let evaluation = result.as_ref().unwrap();
        assert_eq!(
            evaluation.is_feasible(),
            is_feasible(&instance, solution, &policy).unwrap()
        );
        assert_eq!(evaluation.cost(), cost(&instance, solution, &policy).unwrap());
        assert_eq!(
            evaluation.feasibility,
            check_feasibility(&instance, solution, &policy).unwrap()
        );
    }
    assert!(batch[0].as_ref().unwrap().is_feasible());
    assert!(!batch[1].as_ref().unwrap().is_feasible());
    assert_eq!(batch[2].as_ref().unwrap().cost(), 0.0);
}

#[test]
fn test_tighter_policy_changes_verdict_only() {
    let instance = radial_instance();
    let solution = radial_solution();
    let loose = EvaluationPolicy::default();
    let tight = EvaluationPolicy::default().with_failure_threshold(0.015);

    assert!(is_feasible(&instance, &solution, &loose).unwrap());
    assert!(!is_feasible(&instance, &solution, &tight).unwrap());
    assert_eq!(
        cost(&instance, &solution, &loose).unwrap(),
        cost(&instance, &solution, &tight).unwrap()
    );
}
