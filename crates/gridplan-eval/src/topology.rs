//! Route walking and connectivity over used links.

use std::collections::HashSet;

use gridplan_core::{DemandId, Instance, LinkId, NodeId, Route, SiteId, Solution};
use petgraph::graph::NodeIndex;
use petgraph::visit::{Bfs, EdgeFiltered};

/// Where a route ends up when walked from its demand node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEnd {
    /// The walk is contiguous and ends at a site
    Site(SiteId),
    /// The walk is contiguous but ends at a demand node
    Demand(DemandId),
    /// Link `step` of the route does not touch the node reached so far
    Broken {
        step: usize,
        link: LinkId,
        at: NodeId,
    },
}

/// Walk `route` starting at demand node `start`.
pub fn walk_route(instance: &Instance, start: DemandId, route: &Route) -> RouteEnd {
    let mut current = NodeId::Demand(start);
    for (step, &link_id) in route.links.iter().enumerate() {
        let next = instance
            .link(link_id)
            .and_then(|link| link.opposite(current));
        match next {
            Some(node) => current = node,
            None => {
                return RouteEnd::Broken {
                    step,
                    link: link_id,
                    at: current,
                }
            }
        }
    }
    match current {
        NodeId::Site(site) => RouteEnd::Site(site),
        NodeId::Demand(demand) => RouteEnd::Demand(demand),
    }
}

/// Nodes connected to at least one activated site through used links.
#[derive(Debug, Clone)]
pub struct UsedNetwork {
    served: HashSet<NodeIndex>,
}

impl UsedNetwork {
    /// Breadth-first search from every activated site over the subgraph of
    /// used links.
    pub fn build(instance: &Instance, solution: &Solution) -> Self {
        let used: HashSet<LinkId> = solution.used_links.iter().map(|lf| lf.link).collect();
        let graph = EdgeFiltered::from_fn(instance.topology(), |edge| {
            used.contains(edge.weight())
        });

        let mut served = HashSet::new();
        for &site in &solution.activated_sites {
            let Some(start) = instance.node_index(NodeId::Site(site)) else {
                continue;
            };
            if served.contains(&start) {
                continue;
            }
            let mut bfs = Bfs::new(&graph, start);
            while let Some(node) = bfs.next(&graph) {
                served.insert(node);
            }
        }
        Self { served }
    }

    /// Whether `node` can reach an activated site over used links
    pub fn reaches_activated_site(&self, instance: &Instance, node: NodeId) -> bool {
        instance
            .node_index(node)
            .is_some_and(|idx| self.served.contains(&idx))
    }
}
