//! Frame and map snapshot encode/decode.
//!
//! Unit attributes are optional per-type data and travel behind
//! one-byte presence flags. Decoding validates internal consistency:
//! image payloads must match their declared dimensions, map grids
//! must agree on size, and an order target must name a unit that
//! exists somewhere in the frame.

use skirm_core::{
    DecodingError, Frame, FrameId, Grid, ImageBuffer, MapData, PlayerId, StatusFlags, Unit,
    UnitAttributes, UnitId, UnitOrder,
};

use crate::wire::{self, Cursor};

// ── Map ─────────────────────────────────────────────────────────

fn encode_grid(buf: &mut Vec<u8>, grid: &Grid) {
    wire::put_u32_le(buf, grid.width);
    wire::put_u32_le(buf, grid.height);
    wire::put_bytes(buf, &grid.cells);
}

fn decode_grid(cur: &mut Cursor<'_>, what: &'static str) -> Result<Grid, DecodingError> {
    let width = cur.u32_le(what)?;
    let height = cur.u32_le(what)?;
    let cells = cur.bytes(what)?;
    let grid = Grid {
        width,
        height,
        cells,
    };
    if !grid.is_consistent() {
        return Err(DecodingError::GridSizeMismatch {
            detail: format!(
                "{what}: {} cells for declared {width}x{height}",
                grid.cells.len()
            ),
        });
    }
    Ok(grid)
}

/// Append a map snapshot.
pub fn encode_map(buf: &mut Vec<u8>, map: &MapData) {
    wire::put_str(buf, &map.name);
    encode_grid(buf, &map.walkability);
    encode_grid(buf, &map.ground_height);
    encode_grid(buf, &map.buildability);
    wire::put_u32_le(buf, map.start_locations.len() as u32);
    for &(x, y) in &map.start_locations {
        wire::put_i32_le(buf, x);
        wire::put_i32_le(buf, y);
    }
}

/// Decode a map snapshot, enforcing matching grid dimensions.
pub fn decode_map(cur: &mut Cursor<'_>) -> Result<MapData, DecodingError> {
    let name = cur.str("map name")?;
    let walkability = decode_grid(cur, "walkability grid")?;
    let ground_height = decode_grid(cur, "ground height grid")?;
    let buildability = decode_grid(cur, "buildability grid")?;
    let count = cur.u32_le("start location count")? as usize;
    let mut start_locations = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let x = cur.i32_le("start location x")?;
        let y = cur.i32_le("start location y")?;
        start_locations.push((x, y));
    }
    let map = MapData {
        name,
        walkability,
        ground_height,
        buildability,
        start_locations,
    };
    if !map.is_consistent() {
        return Err(DecodingError::GridSizeMismatch {
            detail: format!(
                "layer dimensions disagree: walk {}x{}, height {}x{}, build {}x{}",
                map.walkability.width,
                map.walkability.height,
                map.ground_height.width,
                map.ground_height.height,
                map.buildability.width,
                map.buildability.height,
            ),
        });
    }
    Ok(map)
}

// ── Units ───────────────────────────────────────────────────────

fn encode_opt_i32(buf: &mut Vec<u8>, v: Option<i32>) {
    match v {
        Some(v) => {
            wire::put_u8(buf, 1);
            wire::put_i32_le(buf, v);
        }
        None => wire::put_u8(buf, 0),
    }
}

fn decode_presence(cur: &mut Cursor<'_>, what: &str) -> Result<bool, DecodingError> {
    match cur.u8(what)? {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(DecodingError::BadTag {
            tag,
            context: "presence flag",
        }),
    }
}

fn decode_opt_i32(cur: &mut Cursor<'_>, what: &str) -> Result<Option<i32>, DecodingError> {
    if decode_presence(cur, what)? {
        Ok(Some(cur.i32_le(what)?))
    } else {
        Ok(None)
    }
}

fn encode_order(buf: &mut Vec<u8>, order: &UnitOrder) {
    wire::put_i32_le(buf, order.order_type);
    wire::put_i32_le(buf, order.target.map_or(-1, |t| t.0));
    wire::put_i32_le(buf, order.target_x);
    wire::put_i32_le(buf, order.target_y);
}

fn decode_order(cur: &mut Cursor<'_>) -> Result<UnitOrder, DecodingError> {
    let order_type = cur.i32_le("order type")?;
    let raw_target = cur.i32_le("order target")?;
    let target = if raw_target == -1 {
        None
    } else {
        Some(UnitId(raw_target))
    };
    Ok(UnitOrder {
        order_type,
        target,
        target_x: cur.i32_le("order target x")?,
        target_y: cur.i32_le("order target y")?,
    })
}

/// Append one unit record.
pub fn encode_unit(buf: &mut Vec<u8>, unit: &Unit) {
    wire::put_i32_le(buf, unit.id.0);
    wire::put_u8(buf, unit.player.0);
    wire::put_i32_le(buf, unit.unit_type);
    wire::put_i32_le(buf, unit.x);
    wire::put_i32_le(buf, unit.y);
    encode_opt_i32(buf, unit.attrs.health);
    encode_opt_i32(buf, unit.attrs.max_health);
    encode_opt_i32(buf, unit.attrs.shield);
    encode_opt_i32(buf, unit.attrs.energy);
    match &unit.attrs.order {
        Some(order) => {
            wire::put_u8(buf, 1);
            encode_order(buf, order);
        }
        None => wire::put_u8(buf, 0),
    }
}

/// Decode one unit record.
pub fn decode_unit(cur: &mut Cursor<'_>) -> Result<Unit, DecodingError> {
    let id = UnitId(cur.i32_le("unit id")?);
    let player = PlayerId(cur.u8("unit player")?);
    let unit_type = cur.i32_le("unit type")?;
    let x = cur.i32_le("unit x")?;
    let y = cur.i32_le("unit y")?;
    let attrs = UnitAttributes {
        health: decode_opt_i32(cur, "unit health")?,
        max_health: decode_opt_i32(cur, "unit max health")?,
        shield: decode_opt_i32(cur, "unit shield")?,
        energy: decode_opt_i32(cur, "unit energy")?,
        order: if decode_presence(cur, "unit order")? {
            Some(decode_order(cur)?)
        } else {
            None
        },
    };
    Ok(Unit {
        id,
        player,
        unit_type,
        x,
        y,
        attrs,
    })
}

// ── Frames ──────────────────────────────────────────────────────

/// Append a frame snapshot.
pub fn encode_frame(buf: &mut Vec<u8>, frame: &Frame) {
    wire::put_u32_le(buf, frame.id.0);
    wire::put_u8(buf, frame.flags.to_bits());
    wire::put_u32_le(buf, frame.battle_frame_count);

    wire::put_u8(buf, frame.units.len() as u8);
    for (player, units) in &frame.units {
        wire::put_u8(buf, player.0);
        wire::put_u32_le(buf, units.len() as u32);
        for unit in units {
            encode_unit(buf, unit);
        }
    }

    wire::put_u32_le(buf, frame.deaths.len() as u32);
    for death in &frame.deaths {
        wire::put_i32_le(buf, death.0);
    }

    encode_opt_image(buf, frame.image.as_ref());
}

/// Append an optional image behind a presence flag.
pub fn encode_opt_image(buf: &mut Vec<u8>, image: Option<&ImageBuffer>) {
    match image {
        Some(image) => {
            wire::put_u8(buf, 1);
            wire::put_u32_le(buf, image.width);
            wire::put_u32_le(buf, image.height);
            wire::put_u8(buf, image.channels);
            wire::put_bytes(buf, &image.pixels);
        }
        None => wire::put_u8(buf, 0),
    }
}

/// Decode an optional image, enforcing the size invariant.
pub fn decode_opt_image(cur: &mut Cursor<'_>) -> Result<Option<ImageBuffer>, DecodingError> {
    if !decode_presence(cur, "image")? {
        return Ok(None);
    }
    let width = cur.u32_le("image width")?;
    let height = cur.u32_le("image height")?;
    let channels = cur.u8("image channels")?;
    let pixels = cur.bytes("image pixels")?;
    let image = ImageBuffer {
        width,
        height,
        channels,
        pixels,
    };
    if !image.is_consistent() {
        return Err(DecodingError::ImageSizeMismatch {
            width,
            height,
            channels,
            got: image.pixels.len(),
        });
    }
    Ok(Some(image))
}

/// Decode a frame snapshot and validate its internal consistency.
pub fn decode_frame(cur: &mut Cursor<'_>) -> Result<Frame, DecodingError> {
    let mut frame = Frame::new(FrameId(cur.u32_le("frame id")?));
    frame.flags = StatusFlags::from_bits(cur.u8("frame flags")?);
    frame.battle_frame_count = cur.u32_le("battle frame count")?;

    let player_count = cur.u8("player count")?;
    for _ in 0..player_count {
        let player = PlayerId(cur.u8("player slot")?);
        let unit_count = cur.u32_le("unit count")? as usize;
        let list = frame.units.entry(player).or_default();
        list.reserve(unit_count.min(4096));
        for _ in 0..unit_count {
            list.push(decode_unit(cur)?);
        }
    }

    let death_count = cur.u32_le("death count")? as usize;
    for _ in 0..death_count {
        frame.deaths.push(UnitId(cur.i32_le("death id")?));
    }

    frame.image = decode_opt_image(cur)?;

    check_order_targets(&frame)?;
    Ok(frame)
}

/// Every order target must name a unit present in some player's list.
/// A dangling reference is a corrupt-stream signal, not something to
/// silently drop.
fn check_order_targets(frame: &Frame) -> Result<(), DecodingError> {
    for unit in frame.units.values().flatten() {
        if let Some(order) = &unit.attrs.order {
            if let Some(target) = order.target {
                if frame.find_unit(target).is_none() {
                    return Err(DecodingError::DanglingTarget {
                        unit: unit.id,
                        target,
                    });
                }
            }
        }
    }
    Ok(())
}
