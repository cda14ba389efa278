//! Planning instance: candidate sites, cables and demand.
//!
//! [`Instance::new`] validates every structural invariant once; the
//! resulting value is immutable and carries id lookups plus an undirected
//! topology graph over all candidate links.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{GridError, GridResult};
use crate::{DemandId, LinkId, NodeId, SiteId};

/// Parameters of a site's failure-probability curve.
///
/// Utilization `u = load / capacity` maps to a probability:
///
/// ```text
/// p(u) = base                                             u ≤ knee
///      = base + (1 - base)·((u - knee)/(overload - knee))^curvature
///      = 1                                                u ≥ overload
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityParams {
    /// Failure probability while the site runs below the knee
    pub base_probability: f64,
    /// Utilization at which the overload penalty starts
    pub knee_utilization: f64,
    /// Utilization at which failure is certain
    pub overload_utilization: f64,
    /// Exponent of the penalty ramp between knee and overload
    pub curvature: f64,
    /// Site-specific threshold, overriding the policy's global one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failure_probability: Option<f64>,
}

impl Default for ReliabilityParams {
    fn default() -> Self {
        Self {
            base_probability: 0.01,
            knee_utilization: 0.8,
            overload_utilization: 1.2,
            curvature: 2.0,
            max_failure_probability: None,
        }
    }
}

impl ReliabilityParams {
    pub fn new(base_probability: f64, knee_utilization: f64, overload_utilization: f64) -> Self {
        Self {
            base_probability,
            knee_utilization,
            overload_utilization,
            ..Self::default()
        }
    }

    pub fn with_curvature(mut self, curvature: f64) -> Self {
        self.curvature = curvature;
        self
    }

    pub fn with_max_failure_probability(mut self, threshold: f64) -> Self {
        self.max_failure_probability = Some(threshold);
        self
    }

    fn validate(&self, owner: SiteId) -> GridResult<()> {
        if !(0.0..=1.0).contains(&self.base_probability) {
            return Err(GridError::malformed(format!(
                "{owner}: base_probability {} outside [0, 1]",
                self.base_probability
            )));
        }
        if !self.knee_utilization.is_finite() || self.knee_utilization < 0.0 {
            return Err(GridError::malformed(format!(
                "{owner}: knee_utilization {} must be finite and non-negative",
                self.knee_utilization
            )));
        }
        if !self.overload_utilization.is_finite()
            || self.overload_utilization <= self.knee_utilization
        {
            return Err(GridError::malformed(format!(
                "{owner}: overload_utilization {} must be finite and above knee {}",
                self.overload_utilization, self.knee_utilization
            )));
        }
        if !self.curvature.is_finite() || self.curvature <= 0.0 {
            return Err(GridError::malformed(format!(
                "{owner}: curvature {} must be positive",
                self.curvature
            )));
        }
        if let Some(threshold) = self.max_failure_probability {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(GridError::malformed(format!(
                    "{owner}: max_failure_probability {threshold} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// A candidate substation location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    #[serde(default)]
    pub name: String,
    /// Maximum load the site may carry
    pub capacity: f64,
    /// Fixed cost paid when the site is activated
    pub construction_cost: f64,
    #[serde(default)]
    pub reliability: ReliabilityParams,
}

impl Site {
    pub fn new(id: SiteId, name: impl Into<String>, capacity: f64, construction_cost: f64) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            construction_cost,
            reliability: ReliabilityParams::default(),
        }
    }

    pub fn with_reliability(mut self, reliability: ReliabilityParams) -> Self {
        self.reliability = reliability;
        self
    }
}

/// A candidate cable between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    #[serde(default)]
    pub name: String,
    pub endpoints: (NodeId, NodeId),
    /// Maximum flow the cable may carry
    pub capacity: f64,
    /// Fixed cost paid when the cable is used
    pub construction_cost: f64,
    /// Variable cost per unit of flow
    pub unit_operational_cost: f64,
}

impl Link {
    pub fn new(
        id: LinkId,
        name: impl Into<String>,
        endpoints: (NodeId, NodeId),
        capacity: f64,
        construction_cost: f64,
        unit_operational_cost: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            endpoints,
            capacity,
            construction_cost,
            unit_operational_cost,
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.endpoints.0 == node || self.endpoints.1 == node
    }

    /// The endpoint across from `node`, or None if `node` is not an endpoint
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if self.endpoints.0 == node {
            Some(self.endpoints.1)
        } else if self.endpoints.1 == node {
            Some(self.endpoints.0)
        } else {
            None
        }
    }

    /// Site endpoints of this link (zero, one or two)
    pub fn site_endpoints(&self) -> impl Iterator<Item = SiteId> + '_ {
        [self.endpoints.0, self.endpoints.1]
            .into_iter()
            .filter_map(|node| node.as_site())
    }
}

/// A node whose demand must be routed to activated sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandNode {
    pub id: DemandId,
    #[serde(default)]
    pub name: String,
    pub demand: f64,
}

impl DemandNode {
    pub fn new(id: DemandId, name: impl Into<String>, demand: f64) -> Self {
        Self {
            id,
            name: name.into(),
            demand,
        }
    }
}

/// Cost per unit of load weighted by the carrying site's failure probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityPenalty {
    pub cost_per_unit_at_risk: f64,
}

/// How an instance prices operation beyond cable flow costs.
///
/// Without a penalty, operational cost is the flow-weighted cable cost.
/// With a [`ReliabilityPenalty`], each activated site additionally costs
/// `cost_per_unit_at_risk · failure_probability · load`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_penalty: Option<ReliabilityPenalty>,
}

impl CostModel {
    pub fn with_reliability_penalty(cost_per_unit_at_risk: f64) -> Self {
        Self {
            reliability_penalty: Some(ReliabilityPenalty {
                cost_per_unit_at_risk,
            }),
        }
    }
}

/// Serialized form of an [`Instance`].
///
/// This is what instance files contain; it carries no invariants until it
/// is turned into an [`Instance`] with `Instance::try_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDocument {
    pub sites: Vec<Site>,
    pub links: Vec<Link>,
    pub demand_nodes: Vec<DemandNode>,
    #[serde(default)]
    pub cost_model: CostModel,
}

/// Validated, immutable planning instance.
#[derive(Debug, Clone)]
pub struct Instance {
    sites: Vec<Site>,
    links: Vec<Link>,
    demand_nodes: Vec<DemandNode>,
    cost_model: CostModel,
    site_index: HashMap<SiteId, usize>,
    link_index: HashMap<LinkId, usize>,
    demand_index: HashMap<DemandId, usize>,
    topology: UnGraph<NodeId, LinkId>,
    node_index: HashMap<NodeId, NodeIndex>,
}

impl Instance {
    /// Validate and index an instance.
    ///
    /// Fails with [`GridError::MalformedInput`] on duplicate ids, dangling or
    /// degenerate link endpoints, negative or non-finite quantities, and
    /// ill-formed reliability parameters.
    pub fn new(
        sites: Vec<Site>,
        links: Vec<Link>,
        demand_nodes: Vec<DemandNode>,
        cost_model: CostModel,
    ) -> GridResult<Self> {
        let mut site_index = HashMap::with_capacity(sites.len());
        for (idx, site) in sites.iter().enumerate() {
            if site_index.insert(site.id, idx).is_some() {
                return Err(GridError::malformed(format!("duplicate site id {}", site.id)));
            }
            non_negative(site.capacity, || format!("{}: capacity", site.id))?;
            non_negative(site.construction_cost, || {
                format!("{}: construction_cost", site.id)
            })?;
            site.reliability.validate(site.id)?;
        }

        let mut demand_index = HashMap::with_capacity(demand_nodes.len());
        for (idx, node) in demand_nodes.iter().enumerate() {
            if demand_index.insert(node.id, idx).is_some() {
                return Err(GridError::malformed(format!(
                    "duplicate demand node id {}",
                    node.id
                )));
            }
            non_negative(node.demand, || format!("{}: demand", node.id))?;
        }

        let mut topology = UnGraph::with_capacity(sites.len() + demand_nodes.len(), links.len());
        let mut node_index = HashMap::with_capacity(sites.len() + demand_nodes.len());
        for site in &sites {
            let node = NodeId::Site(site.id);
            node_index.insert(node, topology.add_node(node));
        }
        for demand in &demand_nodes {
            let node = NodeId::Demand(demand.id);
            node_index.insert(node, topology.add_node(node));
        }

        let mut link_index = HashMap::with_capacity(links.len());
        for (idx, link) in links.iter().enumerate() {
            if link_index.insert(link.id, idx).is_some() {
                return Err(GridError::malformed(format!("duplicate link id {}", link.id)));
            }
            let (a, b) = link.endpoints;
            if a == b {
                return Err(GridError::malformed(format!(
                    "{}: both endpoints are {a}",
                    link.id
                )));
            }
            let (Some(&ia), Some(&ib)) = (node_index.get(&a), node_index.get(&b)) else {
                let missing = if node_index.contains_key(&a) { b } else { a };
                return Err(GridError::malformed(format!(
                    "{}: endpoint {missing} is not a declared site or demand node",
                    link.id
                )));
            };
            non_negative(link.capacity, || format!("{}: capacity", link.id))?;
            non_negative(link.construction_cost, || {
                format!("{}: construction_cost", link.id)
            })?;
            non_negative(link.unit_operational_cost, || {
                format!("{}: unit_operational_cost", link.id)
            })?;
            topology.add_edge(ia, ib, link.id);
        }

        if let Some(penalty) = &cost_model.reliability_penalty {
            non_negative(penalty.cost_per_unit_at_risk, || {
                "cost_model: cost_per_unit_at_risk".to_string()
            })?;
        }

        tracing::debug!(
            sites = sites.len(),
            links = links.len(),
            demand_nodes = demand_nodes.len(),
            "instance validated"
        );

        Ok(Self {
            sites,
            links,
            demand_nodes,
            cost_model,
            site_index,
            link_index,
            demand_index,
            topology,
            node_index,
        })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn demand_nodes(&self) -> &[DemandNode] {
        &self.demand_nodes
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.site_index.get(&id).map(|&idx| &self.sites[idx])
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.link_index.get(&id).map(|&idx| &self.links[idx])
    }

    pub fn demand_node(&self, id: DemandId) -> Option<&DemandNode> {
        self.demand_index.get(&id).map(|&idx| &self.demand_nodes[idx])
    }

    /// Whether `node` is a declared site or demand node
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.node_index.contains_key(&node)
    }

    /// Undirected graph of every candidate link
    pub fn topology(&self) -> &UnGraph<NodeId, LinkId> {
        &self.topology
    }

    pub fn node_index(&self, node: NodeId) -> Option<NodeIndex> {
        self.node_index.get(&node).copied()
    }

    pub fn total_demand(&self) -> f64 {
        self.demand_nodes.iter().map(|d| d.demand).sum()
    }

    pub fn total_site_capacity(&self) -> f64 {
        self.sites.iter().map(|s| s.capacity).sum()
    }

    /// Warnings about candidate topology that no solution can repair.
    ///
    /// Reports demand nodes with positive demand that no candidate link path
    /// connects to any site, and sites touched by no candidate link.
    pub fn topology_diagnostics(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();

        let mut components = UnionFind::<usize>::new(self.topology.node_count());
        for edge in self.topology.raw_edges() {
            components.union(edge.source().index(), edge.target().index());
        }
        let site_components: HashSet<usize> = self
            .sites
            .iter()
            .filter_map(|s| self.node_index(NodeId::Site(s.id)))
            .map(|idx| components.find(idx.index()))
            .collect();

        for node in &self.demand_nodes {
            if node.demand <= 0.0 {
                continue;
            }
            let Some(idx) = self.node_index(NodeId::Demand(node.id)) else {
                continue;
            };
            if !site_components.contains(&components.find(idx.index())) {
                diag.add_warning_with_entity(
                    "topology",
                    "demand node cannot reach any site through candidate links",
                    &node.id.to_string(),
                );
            }
        }

        for site in &self.sites {
            let Some(idx) = self.node_index(NodeId::Site(site.id)) else {
                continue;
            };
            if self.topology.neighbors(idx).next().is_none() {
                diag.add_warning_with_entity(
                    "topology",
                    "site is not touched by any candidate link",
                    &site.id.to_string(),
                );
            }
        }

        diag
    }

    /// Serializable copy of this instance.
    pub fn to_document(&self) -> InstanceDocument {
        InstanceDocument {
            sites: self.sites.clone(),
            links: self.links.clone(),
            demand_nodes: self.demand_nodes.clone(),
            cost_model: self.cost_model.clone(),
        }
    }
}

impl TryFrom<InstanceDocument> for Instance {
    type Error = GridError;

    fn try_from(doc: InstanceDocument) -> GridResult<Self> {
        Instance::new(doc.sites, doc.links, doc.demand_nodes, doc.cost_model)
    }
}

fn non_negative(value: f64, what: impl FnOnce() -> String) -> GridResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GridError::malformed(format!(
            "{} must be finite and non-negative, got {value}",
            what()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: usize) -> Site {
        Site::new(SiteId::new(id), format!("S{id}"), 100.0, 50.0)
    }

    fn demand(id: usize, quantity: f64) -> DemandNode {
        DemandNode::new(DemandId::new(id), format!("D{id}"), quantity)
    }

    fn link(id: usize, a: NodeId, b: NodeId) -> Link {
        Link::new(LinkId::new(id), format!("L{id}"), (a, b), 100.0, 10.0, 2.0)
    }

    fn d(id: usize) -> NodeId {
        NodeId::Demand(DemandId::new(id))
    }

    fn s(id: usize) -> NodeId {
        NodeId::Site(SiteId::new(id))
    }

    #[test]
    fn test_valid_instance_lookups() {
        let instance = Instance::new(
            vec![site(1), site(2)],
            vec![link(1, d(1), s(1)), link(2, s(1), s(2))],
            vec![demand(1, 30.0)],
            CostModel::default(),
        )
        .unwrap();

        assert_eq!(instance.site(SiteId::new(2)).unwrap().name, "S2");
        assert_eq!(instance.link(LinkId::new(2)).unwrap().endpoints, (s(1), s(2)));
        assert!(instance.link(LinkId::new(3)).is_none());
        assert!(instance.contains_node(d(1)));
        assert!(!instance.contains_node(d(2)));
        assert_eq!(instance.topology().edge_count(), 2);
        assert_eq!(instance.total_demand(), 30.0);
        assert_eq!(instance.total_site_capacity(), 200.0);
    }

    #[test]
    fn test_dangling_endpoint_rejected() {
        let err = Instance::new(
            vec![site(1)],
            vec![link(1, d(9), s(1))],
            vec![demand(1, 30.0)],
            CostModel::default(),
        )
        .unwrap_err();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("Demand#9"));
    }

    #[test]
    fn test_self_loop_rejected() {
        let err = Instance::new(
            vec![site(1)],
            vec![link(1, s(1), s(1))],
            vec![],
            CostModel::default(),
        )
        .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Instance::new(vec![site(1), site(1)], vec![], vec![], CostModel::default())
            .unwrap_err();
        assert!(err.to_string().contains("duplicate site id Site#1"));

        let err = Instance::new(
            vec![site(1)],
            vec![link(4, d(1), s(1)), link(4, d(1), s(1))],
            vec![demand(1, 1.0)],
            CostModel::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate link id Link#4"));
    }

    #[test]
    fn test_negative_demand_rejected() {
        let err = Instance::new(vec![site(1)], vec![], vec![demand(1, -1.0)], CostModel::default())
            .unwrap_err();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("Demand#1: demand"));
    }

    #[test]
    fn test_bad_reliability_params_rejected() {
        let bad = site(1).with_reliability(ReliabilityParams::new(0.01, 1.0, 0.9));
        let err = Instance::new(vec![bad], vec![], vec![], CostModel::default()).unwrap_err();
        assert!(err.to_string().contains("overload_utilization"));

        let bad = site(1).with_reliability(ReliabilityParams::new(1.5, 0.8, 1.2));
        assert!(Instance::new(vec![bad], vec![], vec![], CostModel::default()).is_err());
    }

    #[test]
    fn test_negative_penalty_rejected() {
        let err = Instance::new(
            vec![site(1)],
            vec![],
            vec![],
            CostModel::with_reliability_penalty(-3.0),
        )
        .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_link_endpoint_helpers() {
        let l = link(1, d(1), s(2));
        assert!(l.touches(d(1)));
        assert_eq!(l.opposite(d(1)), Some(s(2)));
        assert_eq!(l.opposite(s(3)), None);
        assert_eq!(l.site_endpoints().collect::<Vec<_>>(), vec![SiteId::new(2)]);

        let between_sites = link(2, s(1), s(2));
        assert_eq!(between_sites.site_endpoints().count(), 2);
    }

    #[test]
    fn test_topology_diagnostics() {
        // D1 reaches S1; D2 only touches D3 (no site); S2 is isolated
        let instance = Instance::new(
            vec![site(1), site(2)],
            vec![link(1, d(1), s(1)), link(2, d(2), d(3))],
            vec![demand(1, 10.0), demand(2, 5.0), demand(3, 0.0)],
            CostModel::default(),
        )
        .unwrap();

        let diag = instance.topology_diagnostics();
        assert_eq!(diag.error_count(), 0);
        assert_eq!(diag.issues_for_entity("Demand#2").count(), 1);
        assert_eq!(diag.issues_for_entity("Demand#3").count(), 0);
        assert_eq!(diag.issues_for_entity("Site#2").count(), 1);
        assert_eq!(diag.issues_for_entity("Demand#1").count(), 0);
    }

    #[test]
    fn test_document_roundtrip() {
        let instance = Instance::new(
            vec![site(1)],
            vec![link(1, d(1), s(1))],
            vec![demand(1, 30.0)],
            CostModel::with_reliability_penalty(4.0),
        )
        .unwrap();
        let doc = instance.to_document();
        let rebuilt = Instance::try_from(doc.clone()).unwrap();
        assert_eq!(rebuilt.to_document(), doc);
    }
}
