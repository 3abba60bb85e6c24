//! Deterministic frame, unit, and map fixtures.
//!
//! Every fixture is a pure function of its arguments, so two calls with
//! the same inputs produce equal values. Replay round-trip tests rely on
//! that to compare live and reloaded state.

use skirm_core::{Frame, FrameId, Grid, MapData, PlayerId, Unit, UnitAttributes, UnitId};

/// A small deterministic map with a checkerboard walkability layer and
/// opposite-corner start locations.
pub fn map(width: u32, height: u32) -> MapData {
    let mut walkability = Grid::zeroed(width, height);
    let mut ground_height = Grid::zeroed(width, height);
    let buildability = Grid::zeroed(width, height);
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            walkability.cells[idx] = ((x + y) % 2) as u8;
            ground_height.cells[idx] = (x % 3) as u8;
        }
    }
    MapData {
        name: format!("fixture-{width}x{height}"),
        walkability,
        ground_height,
        buildability,
        start_locations: vec![(0, 0), (width as i32 - 1, height as i32 - 1)],
    }
}

/// A unit whose position and attributes are derived from its id.
pub fn unit(id: i32, player: u8) -> Unit {
    Unit {
        id: UnitId(id),
        player: PlayerId(player),
        unit_type: id.rem_euclid(7),
        x: id.rem_euclid(64),
        y: (id / 64).rem_euclid(64),
        attrs: UnitAttributes {
            health: Some(40 + id.rem_euclid(60)),
            max_health: Some(100),
            shield: Some(id.rem_euclid(20)),
            energy: None,
            order: None,
        },
    }
}

/// A frame holding `count` units for each listed player.
///
/// Unit ids are unique across players (`player * 1000 + k`), and a
/// player entry is inserted even when its count is zero, so churn tests
/// can distinguish an empty roster from an absent one.
pub fn frame_with_units(id: u32, players: &[(u8, usize)]) -> Frame {
    let mut frame = Frame::new(FrameId(id));
    for &(player, count) in players {
        let units = (0..count)
            .map(|k| unit(i32::from(player) * 1000 + k as i32, player))
            .collect();
        frame.units.insert(PlayerId(player), units);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_deterministic() {
        assert_eq!(map(8, 8), map(8, 8));
        assert_eq!(unit(42, 1), unit(42, 1));
        assert_eq!(
            frame_with_units(3, &[(0, 2), (1, 1)]),
            frame_with_units(3, &[(0, 2), (1, 1)]),
        );
    }

    #[test]
    fn unit_ids_unique_across_players() {
        let frame = frame_with_units(0, &[(0, 5), (1, 5), (2, 5)]);
        let mut ids: Vec<i32> = frame
            .units
            .values()
            .flatten()
            .map(|u| u.id.0)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 15);
    }

    #[test]
    fn zero_count_player_still_present() {
        let frame = frame_with_units(0, &[(0, 0)]);
        assert_eq!(frame.units.get(&PlayerId(0)), Some(&Vec::new()));
    }

    #[test]
    fn unit_carries_populated_attributes() {
        let u = unit(123, 1);
        assert_eq!(u.attrs.health, Some(40 + 123 % 60));
        assert_eq!(u.attrs.max_health, Some(100));
        assert_eq!(u.attrs.shield, Some(123 % 20));
        assert_eq!(u.attrs.energy, None);
    }

    #[test]
    fn map_is_consistent() {
        assert!(map(16, 12).is_consistent());
    }
}
