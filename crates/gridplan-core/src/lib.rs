//! # gridplan-core: Planning Instance and Solution Models
//!
//! Data structures for evaluating substation/cable planning designs.
//!
//! ## Model
//!
//! An [`Instance`] is the fixed planning problem:
//! - **Sites**: candidate substations with a capacity, a construction cost and
//!   reliability parameters
//! - **Demand nodes**: nodes whose demand must be routed to built substations
//! - **Links**: candidate cables between two nodes (site or demand node)
//!
//! A [`Solution`] is a candidate design over an instance: which sites are
//! activated, which links are used and with what flow, and how each demand
//! node's demand travels along links to a site.
//!
//! Instances are validated once at construction and are immutable
//! afterwards. Solutions are validated against an instance with
//! [`Solution::validate`] before evaluation.
//!
//! ```text
//!   Demand#1 ──Link#1──▶ Site#1
//!   Demand#2 ──Link#2──▶ Demand#1 ──Link#1──▶ Site#1
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use gridplan_core::*;
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
//!
//! let solution = Solution::new()
//!     .activate(SiteId::new(1))
//!     .use_link(LinkId::new(1), 30.0)
//!     .route(DemandId::new(1), vec![LinkId::new(1)], 30.0);
//!
//! solution.validate(&instance)?;
//! # Ok::<(), GridError>(())
//! ```
//!
//! ## Modules
//!
//! - [`instance`] - sites, links, demand nodes, cost model, topology
//! - [`solution`] - activation, link flows, demand routing
//! - [`policy`] - evaluation policy (thresholds, tolerances)
//! - [`diagnostics`] - issue collection for verbose reporting
//! - [`io`] - JSON round-trip for instance and solution documents

use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod instance;
pub mod io;
pub mod policy;
pub mod solution;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use instance::{
    CostModel, DemandNode, Instance, InstanceDocument, Link, ReliabilityParams,
    ReliabilityPenalty, Site,
};
pub use policy::EvaluationPolicy;
pub use solution::{LinkFlow, Route, Routing, Solution};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandId(usize);

impl SiteId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SiteId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LinkId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LinkId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl DemandId {
    #[inline]
    pub fn new(value: usize) -> Self {
        DemandId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Site#{}", self.0)
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Link#{}", self.0)
    }
}

impl std::fmt::Display for DemandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Demand#{}", self.0)
    }
}

/// A link endpoint: either a candidate site or a demand node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Site(SiteId),
    Demand(DemandId),
}

impl NodeId {
    /// The site id, if this node is a site
    pub fn as_site(&self) -> Option<SiteId> {
        match self {
            NodeId::Site(id) => Some(*id),
            NodeId::Demand(_) => None,
        }
    }

    pub fn is_site(&self) -> bool {
        matches!(self, NodeId::Site(_))
    }
}

impl From<SiteId> for NodeId {
    fn from(id: SiteId) -> Self {
        NodeId::Site(id)
    }
}

impl From<DemandId> for NodeId {
    fn from(id: DemandId) -> Self {
        NodeId::Demand(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Site(id) => id.fmt(f),
            NodeId::Demand(id) => id.fmt(f),
        }
    }
}
