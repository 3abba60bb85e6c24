//! Replay verification against the live stream it was recorded from.
//!
//! Unit lists are compared as unordered per-player sets: the engine
//! does not promise a stable report order, and the replay codec only
//! promises to reproduce what was pushed. Everything else (flags,
//! counters, death lists, image bytes) is compared exactly.

use skirm_core::{Frame, MapData, Unit};

/// First index where the loaded stream disagrees with the live one,
/// or `None` if they match. A length mismatch reports the first index
/// where one side has a frame and the other does not.
pub fn verify_frames(live: &[Frame], loaded: &[Frame]) -> Option<usize> {
    for (index, (a, b)) in live.iter().zip(loaded.iter()).enumerate() {
        if !frames_match(a, b) {
            return Some(index);
        }
    }
    if live.len() != loaded.len() {
        return Some(live.len().min(loaded.len()));
    }
    None
}

/// Whether two map snapshots are equivalent: grids byte-equal, start
/// locations equal as unordered coordinate sets.
pub fn verify_map(a: &MapData, b: &MapData) -> bool {
    a.name == b.name
        && a.walkability == b.walkability
        && a.ground_height == b.ground_height
        && a.buildability == b.buildability
        && a.start_location_set() == b.start_location_set()
}

fn frames_match(a: &Frame, b: &Frame) -> bool {
    if a.id != b.id
        || a.flags != b.flags
        || a.battle_frame_count != b.battle_frame_count
        || a.deaths != b.deaths
        || a.image != b.image
    {
        return false;
    }

    // Player key sets must agree, but neither key order nor unit
    // order within a player carries meaning here.
    if a.units.len() != b.units.len() {
        return false;
    }
    a.units.iter().all(|(player, a_units)| {
        b.units
            .get(player)
            .is_some_and(|b_units| unit_sets_match(a_units, b_units))
    })
}

fn unit_sets_match(a: &[Unit], b: &[Unit]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted: Vec<&Unit> = a.iter().collect();
    let mut b_sorted: Vec<&Unit> = b.iter().collect();
    a_sorted.sort_by_key(|u| u.id);
    b_sorted.sort_by_key(|u| u.id);
    a_sorted == b_sorted
}
