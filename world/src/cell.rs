//! Per-coordinate navigation state.

use gridwalk_core::{AgentId, Coord2D};

/// A single grid cell: passability, traversal weight and the bodies standing on it.
///
/// Occupants are kept in insertion order so that [`Cell::first_occupant`] is a
/// stable representative of the cell's contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    coord: Coord2D,
    passable: bool,
    can_path_thru: bool,
    weight: u8,
    occupants: Vec<AgentId>,
    footprints: u16,
}

impl Cell {
    pub(crate) fn new(coord: Coord2D) -> Self {
        Self {
            coord,
            passable: true,
            can_path_thru: false,
            weight: 0,
            occupants: Vec::new(),
            footprints: 0,
        }
    }

    /// Coordinate of the cell within its grid.
    #[must_use]
    pub const fn coord(&self) -> Coord2D {
        self.coord
    }

    /// Reports whether bodies may enter the cell.
    ///
    /// A cell covered by any baked obstacle footprint is never passable.
    #[must_use]
    pub fn is_passable(&self) -> bool {
        self.passable && self.footprints == 0
    }

    /// Marks the terrain of the cell as open or solid.
    pub fn set_passable(&mut self, passable: bool) {
        self.passable = passable;
    }

    /// Reports whether diagonal moves into this cell skip the corner check.
    #[must_use]
    pub const fn can_path_thru(&self) -> bool {
        self.can_path_thru
    }

    /// Sets whether diagonal moves into this cell skip the corner check.
    pub fn set_can_path_thru(&mut self, can_path_thru: bool) {
        self.can_path_thru = can_path_thru;
    }

    /// Extra cost paid for entering the cell.
    #[must_use]
    pub const fn weight(&self) -> u8 {
        self.weight
    }

    /// Updates the extra cost paid for entering the cell.
    pub fn set_weight(&mut self, weight: u8) {
        self.weight = weight;
    }

    /// Bodies currently standing on the cell, in arrival order.
    #[must_use]
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    /// Earliest arrived occupant, used as the representative of the cell.
    #[must_use]
    pub fn first_occupant(&self) -> Option<AgentId> {
        self.occupants.first().copied()
    }

    /// Number of bodies on the cell.
    #[must_use]
    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    /// Reports whether at least one body stands on the cell.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        !self.occupants.is_empty()
    }

    /// Reports whether the provided body stands on the cell.
    #[must_use]
    pub fn contains(&self, body: AgentId) -> bool {
        self.occupants.contains(&body)
    }

    /// Number of obstacle footprints covering the cell.
    #[must_use]
    pub const fn footprints(&self) -> u16 {
        self.footprints
    }

    pub(crate) fn add_occupant(&mut self, body: AgentId) {
        if !self.occupants.contains(&body) {
            self.occupants.push(body);
        }
    }

    pub(crate) fn remove_occupant(&mut self, body: AgentId) -> bool {
        match self.occupants.iter().position(|occupant| *occupant == body) {
            Some(index) => {
                let _ = self.occupants.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn cover(&mut self) {
        self.footprints = self.footprints.saturating_add(1);
    }

    pub(crate) fn uncover(&mut self) {
        self.footprints = self.footprints.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupants_keep_arrival_order_without_duplicates() {
        let mut cell = Cell::new(Coord2D::new(1, 1));
        cell.add_occupant(AgentId::new(4));
        cell.add_occupant(AgentId::new(2));
        cell.add_occupant(AgentId::new(4));

        assert_eq!(cell.occupants(), &[AgentId::new(4), AgentId::new(2)]);
        assert_eq!(cell.first_occupant(), Some(AgentId::new(4)));
        assert!(cell.remove_occupant(AgentId::new(4)));
        assert!(!cell.remove_occupant(AgentId::new(4)));
        assert_eq!(cell.first_occupant(), Some(AgentId::new(2)));
    }

    #[test]
    fn footprints_override_terrain_passability() {
        let mut cell = Cell::new(Coord2D::new(0, 0));
        cell.cover();
        cell.cover();
        assert!(!cell.is_passable());
        cell.uncover();
        assert!(!cell.is_passable());
        cell.uncover();
        assert!(cell.is_passable());
        cell.set_passable(false);
        assert!(!cell.is_passable());
    }
}
