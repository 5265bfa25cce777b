//! Ordered, cyclable goal collection.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use gridwalk_core::GoalId;
use gridwalk_world::Cell;
use tracing::debug;

use crate::{Goal, GoalContext, GoalFlags};

/// Shared, type-erased goal.
pub type SharedGoal = Arc<RwLock<dyn Goal>>;

/// Typed handle returned when a goal is added or looked up.
///
/// The handle aliases the entry stored in the holder, so configuring it
/// changes the goal the agent evaluates.
pub struct GoalHandle<G> {
    id: GoalId,
    goal: Arc<RwLock<G>>,
}

impl<G> Clone for GoalHandle<G> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            goal: Arc::clone(&self.goal),
        }
    }
}

impl<G: fmt::Debug> fmt::Debug for GoalHandle<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalHandle")
            .field("id", &self.id)
            .field("goal", &*self.read())
            .finish()
    }
}

impl<G> GoalHandle<G> {
    /// Identifier of the entry.
    #[must_use]
    pub fn id(&self) -> GoalId {
        self.id
    }

    /// Shared read access to the goal.
    pub fn read(&self) -> RwLockReadGuard<'_, G> {
        self.goal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the goal.
    pub fn write(&self) -> RwLockWriteGuard<'_, G> {
        self.goal.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `configure` to the goal and returns the handle.
    pub fn configure(self, configure: impl FnOnce(&mut G)) -> Self {
        configure(&mut self.write());
        self
    }
}

/// One slot of a [`GoalHolder`], cheap to clone.
#[derive(Clone)]
pub struct GoalEntry {
    id: GoalId,
    type_id: TypeId,
    goal: SharedGoal,
    typed: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for GoalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalEntry")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("flags", &self.flags())
            .finish()
    }
}

impl GoalEntry {
    fn new<G: Goal + 'static>(id: GoalId, goal: G) -> (Self, GoalHandle<G>) {
        let typed = Arc::new(RwLock::new(goal));
        let shared: SharedGoal = typed.clone();
        let entry = Self {
            id,
            type_id: TypeId::of::<G>(),
            goal: shared,
            typed: typed.clone(),
        };
        (entry, GoalHandle { id, goal: typed })
    }

    /// Identifier of the entry.
    #[must_use]
    pub fn id(&self) -> GoalId {
        self.id
    }

    /// Type-erased goal.
    #[must_use]
    pub fn goal(&self) -> &SharedGoal {
        &self.goal
    }

    /// Diagnostic name of the goal.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.read().name()
    }

    /// Current flags of the goal.
    #[must_use]
    pub fn flags(&self) -> GoalFlags {
        self.read().flags()
    }

    /// Reports whether the goal participates in searches.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.flags().active
    }

    /// Reports whether the goal moves when the holder cycles.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.flags().dynamic
    }

    /// Evaluates the predicate without looking at the active flag.
    #[must_use]
    pub fn check(&self, cell: &Cell, ctx: &GoalContext<'_>) -> bool {
        self.read().check_goal(cell, ctx)
    }

    /// Reports whether the entry holds a goal of type `G`.
    #[must_use]
    pub fn is<G: Goal + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<G>()
    }

    /// Typed handle to the goal, if it is a `G`.
    #[must_use]
    pub fn downcast<G: Goal + 'static>(&self) -> Option<GoalHandle<G>> {
        let goal = Arc::clone(&self.typed).downcast::<RwLock<G>>().ok()?;
        Some(GoalHandle { id: self.id, goal })
    }

    fn read(&self) -> RwLockReadGuard<'_, dyn Goal> {
        self.goal.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ordered goal list of one agent; index order is priority order.
///
/// Every operation takes `&self`, so the holder can be shared between the
/// agent and external AI code. Readers iterate over [`GoalHolder::entries`]
/// snapshots, which never observe a mutation in progress.
#[derive(Debug, Default)]
pub struct GoalHolder {
    goals: RwLock<Vec<GoalEntry>>,
    next_id: AtomicU32,
}

impl GoalHolder {
    /// Creates an empty holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a default-constructed goal of type `G` with the lowest priority.
    pub fn add<G: Goal + Default + 'static>(&self) -> GoalHandle<G> {
        self.push(G::default())
    }

    /// Appends `goal` with the lowest priority.
    pub fn push<G: Goal + 'static>(&self, goal: G) -> GoalHandle<G> {
        let id = GoalId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (entry, handle) = GoalEntry::new(id, goal);
        self.write().push(entry);
        handle
    }

    /// Copy of the current entries in priority order.
    #[must_use]
    pub fn entries(&self) -> Vec<GoalEntry> {
        self.read().clone()
    }

    /// Number of goals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Reports whether the holder is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Entry with the provided identifier.
    #[must_use]
    pub fn entry(&self, id: GoalId) -> Option<GoalEntry> {
        self.read().iter().find(|entry| entry.id == id).cloned()
    }

    /// Highest priority goal of type `G`.
    #[must_use]
    pub fn get<G: Goal + 'static>(&self) -> Option<GoalHandle<G>> {
        self.read().iter().find_map(GoalEntry::downcast::<G>)
    }

    /// Highest priority goal of type `G` satisfying `predicate`.
    pub fn get_where<G: Goal + 'static>(
        &self,
        mut predicate: impl FnMut(&G) -> bool,
    ) -> Option<GoalHandle<G>> {
        self.get_all::<G>()
            .into_iter()
            .find(|handle| predicate(&handle.read()))
    }

    /// Every goal of type `G`, in priority order.
    #[must_use]
    pub fn get_all<G: Goal + 'static>(&self) -> Vec<GoalHandle<G>> {
        self.read()
            .iter()
            .filter_map(GoalEntry::downcast::<G>)
            .collect()
    }

    /// Every goal of type `G` satisfying `predicate`, in priority order.
    pub fn get_all_where<G: Goal + 'static>(
        &self,
        mut predicate: impl FnMut(&G) -> bool,
    ) -> Vec<GoalHandle<G>> {
        self.get_all::<G>()
            .into_iter()
            .filter(|handle| predicate(&handle.read()))
            .collect()
    }

    /// Removes the highest priority goal of type `G`.
    pub fn remove<G: Goal + 'static>(&self) -> bool {
        let mut goals = self.write();
        match goals.iter().position(GoalEntry::is::<G>) {
            Some(index) => {
                let _ = goals.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every goal of type `G`, returning how many were dropped.
    pub fn remove_all<G: Goal + 'static>(&self) -> usize {
        let mut goals = self.write();
        let before = goals.len();
        goals.retain(|entry| !entry.is::<G>());
        before - goals.len()
    }

    /// Removes the entry with the provided identifier.
    pub fn remove_id(&self, id: GoalId) -> bool {
        let mut goals = self.write();
        let before = goals.len();
        goals.retain(|entry| entry.id != id);
        before != goals.len()
    }

    /// Drops every goal.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Rotates the dynamic goals by one slot.
    ///
    /// The highest priority dynamic goal moves to the last dynamic slot and the
    /// other dynamic goals each move up one slot. Goals that are not dynamic
    /// keep their positions.
    pub fn cycle(&self) {
        let mut goals = self.write();
        let slots: Vec<usize> = goals
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_dynamic())
            .map(|(index, _)| index)
            .collect();
        if slots.len() < 2 {
            return;
        }
        let mut moved: Vec<GoalEntry> = slots.iter().map(|index| goals[*index].clone()).collect();
        moved.rotate_left(1);
        for (index, entry) in slots.iter().zip(moved) {
            goals[*index] = entry;
        }
        debug!(
            target: "gridwalk::goals",
            rotated = slots.len(),
            first = ?goals.get(slots[0]).map(GoalEntry::id),
            "goals cycled"
        );
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<GoalEntry>> {
        self.goals.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<GoalEntry>> {
        self.goals.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use gridwalk_core::ResourceKinds;

    use super::*;
    use crate::{BuildRepair, GatherResource, TransportResource};

    fn names(holder: &GoalHolder) -> Vec<&'static str> {
        holder.entries().iter().map(GoalEntry::name).collect()
    }

    #[test]
    fn handles_alias_stored_goals() {
        let holder = GoalHolder::new();
        let gather = holder
            .add::<GatherResource>()
            .configure(|goal| goal.kinds = ResourceKinds::WOOD);

        let found = holder.get::<GatherResource>().expect("gather goal");
        assert_eq!(found.id(), gather.id());
        assert_eq!(found.read().kinds, ResourceKinds::WOOD);

        gather.write().flags_mut().active = false;
        assert!(!holder.entries()[0].is_active());
    }

    #[test]
    fn lookups_filter_by_type_and_predicate() {
        let holder = GoalHolder::new();
        let _ = holder.push(GatherResource::new(ResourceKinds::GRAIN));
        let _ = holder.add::<BuildRepair>();
        let stone = holder.push(GatherResource::new(ResourceKinds::STONE));

        assert_eq!(holder.get_all::<GatherResource>().len(), 2);
        let found = holder
            .get_where::<GatherResource>(|goal| goal.kinds == ResourceKinds::STONE)
            .expect("stone goal");
        assert_eq!(found.id(), stone.id());
        assert!(holder.get::<TransportResource>().is_none());
        assert_eq!(
            holder
                .get_all_where::<GatherResource>(|goal| goal.kinds.contains(ResourceKinds::GOLD))
                .len(),
            0
        );
    }

    #[test]
    fn removal_by_type() {
        let holder = GoalHolder::new();
        let _ = holder.add::<GatherResource>();
        let _ = holder.add::<BuildRepair>();
        let _ = holder.add::<GatherResource>();

        assert!(holder.remove::<GatherResource>());
        assert_eq!(names(&holder), vec!["build_repair", "gather_resource"]);
        assert_eq!(holder.remove_all::<GatherResource>(), 1);
        assert!(!holder.remove::<TransportResource>());
        holder.clear();
        assert!(holder.is_empty());
    }

    #[test]
    fn cycle_rotates_only_dynamic_goals() {
        let holder = GoalHolder::new();
        let repair = holder.add::<BuildRepair>();
        let gather = holder.add::<GatherResource>();
        let transport = holder.add::<TransportResource>();
        let second_gather = holder.add::<GatherResource>();

        holder.cycle();
        let order: Vec<GoalId> = holder.entries().iter().map(GoalEntry::id).collect();
        assert_eq!(
            order,
            vec![repair.id(), transport.id(), second_gather.id(), gather.id()]
        );

        holder.cycle();
        holder.cycle();
        let order: Vec<GoalId> = holder.entries().iter().map(GoalEntry::id).collect();
        assert_eq!(
            order,
            vec![repair.id(), gather.id(), transport.id(), second_gather.id()]
        );
    }

    #[test]
    fn snapshots_are_isolated_from_later_mutation() {
        let holder = GoalHolder::new();
        let _ = holder.add::<GatherResource>();
        let snapshot = holder.entries();
        holder.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(holder.is_empty());
    }
}
