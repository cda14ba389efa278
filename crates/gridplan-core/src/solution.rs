//! Candidate design over an instance.
//!
//! A [`Solution`] is a plain decision record: it is produced by an external
//! optimizer (or read from disk) and judged by the evaluator. It holds
//!
//! - the set of activated sites,
//! - the used links and the flow each one carries,
//! - for each demand node, the routes its demand takes: paths of links that
//!   start at the demand node and end at a site.
//!
//! [`Solution::validate`] checks only structural invariants (known ids, no
//! duplicates, non-negative finite quantities). Whether flows are conserved
//! and demand is covered is a feasibility question, not a validation one.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::instance::Instance;
use crate::{DemandId, LinkId, SiteId};

/// Flow carried by a used link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkFlow {
    pub link: LinkId,
    pub flow: f64,
}

/// One path carrying part of a demand node's demand.
///
/// `links` is walked from the demand node; a direct site mapping is a
/// single-link route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub links: Vec<LinkId>,
    pub quantity: f64,
}

/// All routes of one demand node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    pub demand: DemandId,
    pub routes: Vec<Route>,
}

impl Routing {
    /// Total quantity routed for this demand node
    pub fn routed_quantity(&self) -> f64 {
        self.routes.iter().map(|r| r.quantity).sum()
    }
}

/// Decision variables of a planning design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub activated_sites: BTreeSet<SiteId>,
    pub used_links: Vec<LinkFlow>,
    pub assignment: Vec<Routing>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a site as built
    pub fn activate(mut self, site: SiteId) -> Self {
        self.activated_sites.insert(site);
        self
    }

    /// Mark a link as used with the given flow
    pub fn use_link(mut self, link: LinkId, flow: f64) -> Self {
        self.used_links.push(LinkFlow { link, flow });
        self
    }

    /// Add a route for a demand node, merging into its existing routing
    pub fn route(mut self, demand: DemandId, links: Vec<LinkId>, quantity: f64) -> Self {
        let route = Route { links, quantity };
        match self.assignment.iter_mut().find(|r| r.demand == demand) {
            Some(routing) => routing.routes.push(route),
            None => self.assignment.push(Routing {
                demand,
                routes: vec![route],
            }),
        }
        self
    }

    pub fn is_activated(&self, site: SiteId) -> bool {
        self.activated_sites.contains(&site)
    }

    /// Flow declared on `link`, or None if the link is not used
    pub fn link_flow(&self, link: LinkId) -> Option<f64> {
        self.used_links
            .iter()
            .find(|lf| lf.link == link)
            .map(|lf| lf.flow)
    }

    pub fn routing(&self, demand: DemandId) -> Option<&Routing> {
        self.assignment.iter().find(|r| r.demand == demand)
    }

    /// Check structural invariants against `instance`.
    ///
    /// Fails with [`GridError::MalformedInput`] when the solution refers to
    /// undeclared sites, links or demand nodes, lists a link or a demand node
    /// twice, has an empty route, or carries negative or non-finite
    /// quantities. Flow above a link's capacity is left to aggregation.
    pub fn validate(&self, instance: &Instance) -> GridResult<()> {
        for site in &self.activated_sites {
            if instance.site(*site).is_none() {
                return Err(GridError::malformed(format!(
                    "activated site {site} is not declared in the instance"
                )));
            }
        }

        let mut seen_links = HashSet::with_capacity(self.used_links.len());
        for lf in &self.used_links {
            if instance.link(lf.link).is_none() {
                return Err(GridError::malformed(format!(
                    "used link {} is not declared in the instance",
                    lf.link
                )));
            }
            if !seen_links.insert(lf.link) {
                return Err(GridError::malformed(format!(
                    "link {} is listed more than once in used_links",
                    lf.link
                )));
            }
            if !lf.flow.is_finite() || lf.flow < 0.0 {
                return Err(GridError::malformed(format!(
                    "{}: flow must be finite and non-negative, got {}",
                    lf.link, lf.flow
                )));
            }
        }

        let mut seen_demands = HashSet::with_capacity(self.assignment.len());
        for routing in &self.assignment {
            if instance.demand_node(routing.demand).is_none() {
                return Err(GridError::malformed(format!(
                    "routing refers to undeclared demand node {}",
                    routing.demand
                )));
            }
            if !seen_demands.insert(routing.demand) {
                return Err(GridError::malformed(format!(
                    "demand node {} has more than one routing",
                    routing.demand
                )));
            }
            for (i, route) in routing.routes.iter().enumerate() {
                if route.links.is_empty() {
                    return Err(GridError::malformed(format!(
                        "{}: route {i} has no links",
                        routing.demand
                    )));
                }
                if !route.quantity.is_finite() || route.quantity < 0.0 {
                    return Err(GridError::malformed(format!(
                        "{}: route {i} quantity must be finite and non-negative, got {}",
                        routing.demand, route.quantity
                    )));
                }
                if let Some(link) = route.links.iter().find(|l| instance.link(**l).is_none()) {
                    return Err(GridError::malformed(format!(
                        "{}: route {i} uses undeclared link {link}",
                        routing.demand
                    )));
                }
            }
        }

        Ok(())
    }
}
