//! Frame deltas: the difference between consecutive frames.
//!
//! Deltas diff by unit identity. For every player present in the new
//! frame the delta carries the ids removed since the predecessor and
//! full records for units that were added, changed, or moved within
//! the list; untouched units are carried over from the predecessor.
//! Flags, counters, deaths, and the image travel verbatim; they are
//! small next to unit lists and diffing them buys nothing.
//!
//! Applying a delta reconstructs the next frame exactly, including
//! player-key iteration order and unit-list order, so a replayed
//! stream is deep-equal to the recorded one.

use skirm_core::{Frame, FrameId, PlayerId, StatusFlags, Unit, UnitId};

use crate::error::ReplayError;

/// Difference between a frame and its predecessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDelta {
    /// The new frame's sequence number.
    pub id: FrameId,
    /// The new frame's flags, verbatim.
    pub flags: StatusFlags,
    /// The new frame's battle counter, verbatim.
    pub battle_frame_count: u32,
    /// Per-player unit changes, in the new frame's player order.
    pub players: Vec<PlayerDelta>,
    /// The new frame's death list, verbatim.
    pub deaths: Vec<UnitId>,
    /// The new frame's image, verbatim.
    pub image: Option<skirm_core::ImageBuffer>,
}

/// Unit changes for one player slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerDelta {
    /// The player slot.
    pub player: PlayerId,
    /// Ids present in the predecessor's list but not the new one.
    pub removed: Vec<UnitId>,
    /// Added-or-changed-or-moved units with their final list index,
    /// ascending.
    pub upserts: Vec<(u32, Unit)>,
}

/// Compute the delta that turns `prev` into `next`.
pub fn diff(prev: &Frame, next: &Frame) -> FrameDelta {
    let empty: Vec<Unit> = Vec::new();
    let mut players = Vec::with_capacity(next.units.len());

    for (&player, new_list) in &next.units {
        let old_list = prev.units.get(&player).unwrap_or(&empty);

        let removed: Vec<UnitId> = old_list
            .iter()
            .map(|u| u.id)
            .filter(|id| !new_list.iter().any(|u| u.id == *id))
            .collect();

        // Survivors of the old list whose record is byte-for-byte
        // unchanged, in old order. A new unit counts as an upsert
        // unless it matches the next unconsumed survivor exactly; that
        // keeps every untouched unit out of the delta while still
        // capturing adds, in-place edits, and moves. Any survivor the
        // greedy match skips is guaranteed to reappear as an upsert,
        // which is what `apply` relies on.
        let kept: Vec<&Unit> = old_list
            .iter()
            .filter(|u| new_list.iter().any(|n| n == *u))
            .collect();
        let mut ki = 0;
        let mut upserts = Vec::new();
        for (idx, unit) in new_list.iter().enumerate() {
            if ki < kept.len() && kept[ki] == unit {
                ki += 1;
            } else {
                upserts.push((idx as u32, unit.clone()));
            }
        }

        players.push(PlayerDelta {
            player,
            removed,
            upserts,
        });
    }

    FrameDelta {
        id: next.id,
        flags: next.flags,
        battle_frame_count: next.battle_frame_count,
        players,
        deaths: next.deaths.to_vec(),
        image: next.image.clone(),
    }
}

/// Apply a delta on top of its predecessor.
///
/// Fails with [`ReplayError::MalformedFrame`] if an upsert index does
/// not fit the reconstructed list, which only happens on a corrupt
/// stream.
pub fn apply(prev: &Frame, delta: &FrameDelta) -> Result<Frame, ReplayError> {
    let mut frame = Frame::new(delta.id);
    frame.flags = delta.flags;
    frame.battle_frame_count = delta.battle_frame_count;
    frame.deaths = delta.deaths.iter().copied().collect();
    frame.image = delta.image.clone();

    let empty: Vec<Unit> = Vec::new();
    for pd in &delta.players {
        let old_list = prev.units.get(&pd.player).unwrap_or(&empty);

        // Carry over survivors that are not re-stated by an upsert,
        // then splice the upserts in at their final indices.
        let mut list: Vec<Unit> = old_list
            .iter()
            .filter(|u| {
                !pd.removed.contains(&u.id) && !pd.upserts.iter().any(|(_, up)| up.id == u.id)
            })
            .cloned()
            .collect();
        for (idx, unit) in &pd.upserts {
            let idx = *idx as usize;
            if idx > list.len() {
                return Err(ReplayError::MalformedFrame {
                    detail: format!(
                        "frame {}: upsert index {idx} into list of {} for player {}",
                        delta.id,
                        list.len(),
                        pd.player
                    ),
                });
            }
            list.insert(idx, unit.clone());
        }
        frame.units.insert(pd.player, list);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use skirm_test_utils::fixtures;

    fn roundtrip(prev: &Frame, next: &Frame) {
        let delta = diff(prev, next);
        let got = apply(prev, &delta).unwrap();
        assert_eq!(&got, next);
    }

    #[test]
    fn identical_frames_produce_empty_upserts() {
        let frame = fixtures::frame_with_units(5, &[(0, 4), (1, 4)]);
        let mut next = frame.clone();
        next.id = FrameId(6);
        let delta = diff(&frame, &next);
        for pd in &delta.players {
            assert!(pd.removed.is_empty());
            assert!(pd.upserts.is_empty());
        }
        roundtrip(&frame, &next);
    }

    #[test]
    fn added_unit_is_single_upsert() {
        let prev = fixtures::frame_with_units(1, &[(0, 3)]);
        let mut next = prev.clone();
        next.id = FrameId(2);
        next.units
            .get_mut(&PlayerId(0))
            .map(|units| units.push(fixtures::unit(99, 0)));
        let delta = diff(&prev, &next);
        assert_eq!(delta.players[0].upserts.len(), 1);
        assert_eq!(delta.players[0].upserts[0].0, 3);
        roundtrip(&prev, &next);
    }

    #[test]
    fn removed_unit_roundtrips() {
        let prev = fixtures::frame_with_units(1, &[(0, 3), (1, 2)]);
        let mut next = prev.clone();
        next.id = FrameId(2);
        if let Some(units) = next.units.get_mut(&PlayerId(0)) {
            units.remove(1);
        }
        let delta = diff(&prev, &next);
        assert_eq!(delta.players[0].removed.len(), 1);
        assert!(delta.players[0].upserts.is_empty());
        roundtrip(&prev, &next);
    }

    #[test]
    fn moved_units_roundtrip() {
        let prev = fixtures::frame_with_units(1, &[(0, 3)]);
        let mut next = prev.clone();
        next.id = FrameId(2);
        if let Some(units) = next.units.get_mut(&PlayerId(0)) {
            units.swap(0, 2);
        }
        roundtrip(&prev, &next);
    }

    #[test]
    fn changed_attributes_roundtrip() {
        let prev = fixtures::frame_with_units(1, &[(0, 3)]);
        let mut next = prev.clone();
        next.id = FrameId(2);
        if let Some(units) = next.units.get_mut(&PlayerId(0)) {
            units[1].attrs.health = Some(10);
            units[1].x += 4;
        }
        let delta = diff(&prev, &next);
        assert_eq!(delta.players[0].upserts.len(), 1);
        roundtrip(&prev, &next);
    }

    #[test]
    fn player_disappearing_and_appearing_roundtrip() {
        let prev = fixtures::frame_with_units(1, &[(0, 2), (1, 2)]);
        let mut next = fixtures::frame_with_units(2, &[(0, 2), (2, 1)]);
        next.deaths.push(UnitId(500));
        roundtrip(&prev, &next);
    }

    #[test]
    fn full_churn_roundtrips() {
        let prev = fixtures::frame_with_units(1, &[(0, 4)]);
        let mut next = fixtures::frame_with_units(2, &[(0, 0)]);
        if let Some(units) = next.units.get_mut(&PlayerId(0)) {
            units.extend([fixtures::unit(200, 0), fixtures::unit(201, 0)]);
        }
        roundtrip(&prev, &next);
    }

    #[test]
    fn corrupt_upsert_index_rejected() {
        let prev = fixtures::frame_with_units(1, &[(0, 1)]);
        let mut delta = diff(&prev, &fixtures::frame_with_units(2, &[(0, 1)]));
        delta.players[0]
            .upserts
            .push((7, fixtures::unit(300, 0)));
        let err = apply(&prev, &delta).unwrap_err();
        assert!(matches!(err, ReplayError::MalformedFrame { .. }));
    }

    // A unit list with unique ids in arbitrary order. Drawing ids from
    // a shared range makes overlap between two generated lists common,
    // so adds, removals, in-place edits, and moves all occur; a tweak
    // flag perturbs the record to model an edit without an id change.
    fn arb_list(player: u8) -> impl Strategy<Value = Vec<Unit>> {
        prop::collection::btree_set(0i32..40, 0..10)
            .prop_flat_map(|ids| {
                let ids: Vec<i32> = ids.into_iter().collect();
                let n = ids.len();
                (Just(ids), prop::collection::vec(any::<bool>(), n))
            })
            .prop_map(move |(ids, tweaks)| {
                ids.into_iter()
                    .zip(tweaks)
                    .map(|(id, tweak)| {
                        let mut unit = fixtures::unit(id, player);
                        if tweak {
                            unit.x += 1;
                        }
                        unit
                    })
                    .collect::<Vec<Unit>>()
            })
            .prop_shuffle()
    }

    proptest! {
        #[test]
        fn arbitrary_churn_roundtrips(
            old_units in arb_list(0),
            new_units in arb_list(0),
            second_player in arb_list(1),
        ) {
            let mut prev = Frame::new(FrameId(1));
            prev.units.insert(PlayerId(0), old_units);
            let mut next = Frame::new(FrameId(2));
            next.units.insert(PlayerId(0), new_units);
            next.units.insert(PlayerId(1), second_player);

            let delta = diff(&prev, &next);
            let got = apply(&prev, &delta).unwrap();
            prop_assert_eq!(got, next);
        }
    }
}
