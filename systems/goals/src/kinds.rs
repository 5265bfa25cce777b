//! Goals shipped with the engine.

use gridwalk_core::ResourceKinds;
use gridwalk_world::Cell;

use crate::{Goal, GoalContext, GoalFlags};

/// Matches cells whose first occupant is a structure needing repair.
///
/// Not dynamic: it keeps its priority when the holder cycles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildRepair {
    flags: GoalFlags,
}

impl Default for BuildRepair {
    fn default() -> Self {
        Self {
            flags: GoalFlags {
                active: true,
                dynamic: false,
            },
        }
    }
}

impl Goal for BuildRepair {
    fn name(&self) -> &'static str {
        "build_repair"
    }

    fn flags(&self) -> GoalFlags {
        self.flags
    }

    fn flags_mut(&mut self) -> &mut GoalFlags {
        &mut self.flags
    }

    fn check_goal(&self, cell: &Cell, ctx: &GoalContext<'_>) -> bool {
        cell.first_occupant()
            .map_or(false, |body| ctx.catalog.needs_repair(body))
    }
}

/// Matches cells whose first occupant is a resource offering every kind in `kinds`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatherResource {
    flags: GoalFlags,
    /// Resource kinds to gather.
    pub kinds: ResourceKinds,
}

impl GatherResource {
    /// Creates an active, dynamic gather goal.
    #[must_use]
    pub fn new(kinds: ResourceKinds) -> Self {
        Self {
            flags: GoalFlags::default(),
            kinds,
        }
    }
}

impl Goal for GatherResource {
    fn name(&self) -> &'static str {
        "gather_resource"
    }

    fn flags(&self) -> GoalFlags {
        self.flags
    }

    fn flags_mut(&mut self) -> &mut GoalFlags {
        &mut self.flags
    }

    fn check_goal(&self, cell: &Cell, ctx: &GoalContext<'_>) -> bool {
        if self.kinds.is_empty() {
            return false;
        }
        cell.first_occupant()
            .map_or(false, |body| ctx.catalog.resource_kinds(body).contains(self.kinds))
    }
}

/// Matches cells whose first occupant accepts drop-offs of `kinds`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportResource {
    flags: GoalFlags,
    /// Resource kinds being carried.
    pub kinds: ResourceKinds,
}

impl TransportResource {
    /// Creates an active, dynamic transport goal.
    #[must_use]
    pub fn new(kinds: ResourceKinds) -> Self {
        Self {
            flags: GoalFlags::default(),
            kinds,
        }
    }
}

impl Goal for TransportResource {
    fn name(&self) -> &'static str {
        "transport_resource"
    }

    fn flags(&self) -> GoalFlags {
        self.flags
    }

    fn flags_mut(&mut self) -> &mut GoalFlags {
        &mut self.flags
    }

    fn check_goal(&self, cell: &Cell, ctx: &GoalContext<'_>) -> bool {
        cell.first_occupant()
            .map_or(false, |body| ctx.catalog.accepts_dropoff(body, self.kinds))
    }
}
