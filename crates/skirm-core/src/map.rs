//! Static map data captured once per game.

use std::fmt;

/// A 2-D grid of single-byte cells with a fixed cell size.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// Row-major cell values, `width * height` long.
    pub cells: Vec<u8>,
}

impl Grid {
    /// A zero-filled grid of the given dimensions.
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    /// Cell value at (x, y), or `None` out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get((y * self.width + x) as usize).copied()
    }

    /// Whether the cell vector length matches the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        self.cells.len() == self.width as usize * self.height as usize
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Cell contents are elided; a full dump is noise at any real map size.
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("cells", &self.cells.len())
            .finish()
    }
}

/// Static map layers, captured at handshake and attached to the
/// replay file header.
///
/// The three grids always share dimensions; [`MapData::is_consistent`]
/// enforces that when decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapData {
    /// Map name string from the engine.
    pub name: String,
    /// 1 where ground units can walk.
    pub walkability: Grid,
    /// Terrain height per cell.
    pub ground_height: Grid,
    /// 1 where buildings can be placed.
    pub buildability: Grid,
    /// Start locations as (x, y) cell coordinates. Insertion order
    /// carries no meaning; comparisons treat this as a set.
    pub start_locations: Vec<(i32, i32)>,
}

impl MapData {
    /// Whether all three grids are internally consistent and share
    /// dimensions.
    pub fn is_consistent(&self) -> bool {
        let w = self.walkability.width;
        let h = self.walkability.height;
        self.walkability.is_consistent()
            && self.ground_height.is_consistent()
            && self.buildability.is_consistent()
            && self.ground_height.width == w
            && self.ground_height.height == h
            && self.buildability.width == w
            && self.buildability.height == h
    }

    /// Start locations as an order-insensitive comparison key.
    pub fn start_location_set(&self) -> std::collections::BTreeSet<(i32, i32)> {
        self.start_locations.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(w: u32, h: u32) -> MapData {
        MapData {
            name: "test".into(),
            walkability: Grid::zeroed(w, h),
            ground_height: Grid::zeroed(w, h),
            buildability: Grid::zeroed(w, h),
            start_locations: vec![(1, 1), (8, 8)],
        }
    }

    #[test]
    fn grid_get_bounds() {
        let mut g = Grid::zeroed(3, 2);
        g.cells[4] = 7; // (1, 1)
        assert_eq!(g.get(1, 1), Some(7));
        assert_eq!(g.get(0, 0), Some(0));
        assert_eq!(g.get(3, 0), None);
        assert_eq!(g.get(0, 2), None);
    }

    #[test]
    fn consistent_map_accepted() {
        assert!(map(16, 16).is_consistent());
    }

    #[test]
    fn mismatched_grid_dimensions_rejected() {
        let mut m = map(16, 16);
        m.buildability = Grid::zeroed(8, 16);
        assert!(!m.is_consistent());
    }

    #[test]
    fn short_cell_vector_rejected() {
        let mut m = map(4, 4);
        m.walkability.cells.pop();
        assert!(!m.is_consistent());
    }

    #[test]
    fn start_location_set_ignores_order() {
        let mut a = map(8, 8);
        let mut b = map(8, 8);
        a.start_locations = vec![(1, 1), (6, 6)];
        b.start_locations = vec![(6, 6), (1, 1)];
        assert_eq!(a.start_location_set(), b.start_location_set());
    }
}
