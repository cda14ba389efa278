//! One-call evaluation of a solution, and parallel batches of them.

use gridplan_core::{EvaluationPolicy, GridResult, Instance, Solution};
use serde::Serialize;

use crate::aggregation::{validated_loads, SiteLoads};
use crate::cost::{cost_breakdown_with, CostBreakdown};
use crate::feasibility::{check_feasibility_with, FeasibilityReport};
use crate::reliability::{probabilities_from_loads, FailureProbabilities};

/// Everything the engine derives from one (instance, solution) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub loads: SiteLoads,
    pub probabilities: FailureProbabilities,
    pub feasibility: FeasibilityReport,
    pub costs: CostBreakdown,
}

impl Evaluation {
    pub fn is_feasible(&self) -> bool {
        self.feasibility.is_feasible()
    }

    /// Objective value (construction + operational)
    pub fn cost(&self) -> f64 {
        self.costs.total()
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Evaluation Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!(
            "Status: {}\n",
            if self.is_feasible() {
                "Feasible"
            } else {
                "Infeasible"
            }
        ));
        s.push_str(&format!("Total Cost: {:.2}\n", self.cost()));
        s.push_str(&format!("  Construction: {:.2}\n", self.costs.construction));
        s.push_str(&format!("  Operational: {:.2}\n", self.costs.operational()));
        if self.costs.reliability_penalty > 0.0 {
            s.push_str(&format!(
                "    (reliability penalty {:.2})\n",
                self.costs.reliability_penalty
            ));
        }

        if !self.probabilities.is_empty() {
            s.push_str("\nActivated Sites:\n");
            for (id, probability) in &self.probabilities {
                let load = self.loads.get(id).copied().unwrap_or(0.0);
                s.push_str(&format!("  {id}: load {load:.2}, p_fail {probability:.4}\n"));
            }
        }

        if !self.feasibility.is_feasible() {
            s.push_str("\nViolations:\n");
            for message in self.feasibility.messages() {
                s.push_str(&format!("  {message}\n"));
            }
        }

        s
    }
}

/// Evaluates solutions against a fixed instance and policy.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    instance: &'a Instance,
    policy: EvaluationPolicy,
}

impl<'a> Evaluator<'a> {
    /// Bind an instance and a policy. Fails if the policy is invalid.
    pub fn new(instance: &'a Instance, policy: EvaluationPolicy) -> GridResult<Self> {
        policy.validate()?;
        Ok(Self { instance, policy })
    }

    pub fn instance(&self) -> &Instance {
        self.instance
    }

    pub fn policy(&self) -> &EvaluationPolicy {
        &self.policy
    }

    /// Validate, aggregate once, and derive probabilities, feasibility and
    /// costs from the same loads.
    pub fn evaluate(&self, solution: &Solution) -> GridResult<Evaluation> {
        let loads = validated_loads(self.instance, solution, &self.policy)?;
        let probabilities = probabilities_from_loads(self.instance, solution, &loads)?;
        let feasibility =
            check_feasibility_with(self.instance, solution, &self.policy, &loads, &probabilities);
        let costs = cost_breakdown_with(self.instance, solution, &loads, &probabilities)?;

        tracing::debug!(
            feasible = feasibility.is_feasible(),
            violations = feasibility.violations().len(),
            cost = costs.total(),
            "evaluated solution"
        );

        Ok(Evaluation {
            loads,
            probabilities,
            feasibility,
            costs,
        })
    }

    /// Evaluate many solutions; results are in input order.
    ///
    /// Runs on the rayon thread pool when the `parallel` feature is enabled.
    pub fn evaluate_batch(&self, solutions: &[Solution]) -> Vec<GridResult<Evaluation>> {
        tracing::debug!(solutions = solutions.len(), "evaluating batch");

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            solutions.par_iter().map(|s| self.evaluate(s)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            solutions.iter().map(|s| self.evaluate(s)).collect()
        }
    }
}
