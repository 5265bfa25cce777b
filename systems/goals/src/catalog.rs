//! Facts about bodies that goal predicates consult.

use std::collections::HashMap;

use gridwalk_core::{AgentId, ResourceKinds};

/// Read access to game facts owned outside the navigation core.
pub trait BodyCatalog: Send + Sync {
    /// Resource kinds offered by `body`; empty when it is not a resource.
    fn resource_kinds(&self, body: AgentId) -> ResourceKinds;

    /// Reports whether `body` is a structure in need of repair.
    fn needs_repair(&self, body: AgentId) -> bool;

    /// Reports whether `body` is a structure accepting drop-offs of `kinds`.
    fn accepts_dropoff(&self, body: AgentId, kinds: ResourceKinds) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BodyFacts {
    resources: ResourceKinds,
    dropoff: ResourceKinds,
    needs_repair: bool,
}

/// Map-backed [`BodyCatalog`].
#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    bodies: HashMap<AgentId, BodyFacts>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resource node offering `kinds`.
    pub fn insert_resource(&mut self, body: AgentId, kinds: ResourceKinds) {
        let _ = self.bodies.insert(
            body,
            BodyFacts {
                resources: kinds,
                ..BodyFacts::default()
            },
        );
    }

    /// Records a structure accepting `dropoff` kinds.
    pub fn insert_structure(&mut self, body: AgentId, dropoff: ResourceKinds, needs_repair: bool) {
        let _ = self.bodies.insert(
            body,
            BodyFacts {
                dropoff,
                needs_repair,
                ..BodyFacts::default()
            },
        );
    }

    /// Updates the repair state of a known body.
    pub fn set_needs_repair(&mut self, body: AgentId, needs_repair: bool) {
        if let Some(facts) = self.bodies.get_mut(&body) {
            facts.needs_repair = needs_repair;
        }
    }

    /// Forgets everything about `body`.
    pub fn remove(&mut self, body: AgentId) -> bool {
        self.bodies.remove(&body).is_some()
    }

    /// Number of known bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Reports whether no body is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl BodyCatalog for MemoryCatalog {
    fn resource_kinds(&self, body: AgentId) -> ResourceKinds {
        self.bodies
            .get(&body)
            .map_or(ResourceKinds::empty(), |facts| facts.resources)
    }

    fn needs_repair(&self, body: AgentId) -> bool {
        self.bodies
            .get(&body)
            .map_or(false, |facts| facts.needs_repair)
    }

    fn accepts_dropoff(&self, body: AgentId, kinds: ResourceKinds) -> bool {
        !kinds.is_empty()
            && self
                .bodies
                .get(&body)
                .map_or(false, |facts| facts.dropoff.contains(kinds))
    }
}
