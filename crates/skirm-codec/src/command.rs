//! Command batch encode/decode.
//!
//! A batch is a `u32` count followed by the commands in submission
//! order. Each command is its kind code (one byte) followed by a
//! fixed number of `i32` arguments, per [`CommandKind::arity`]. An
//! absent order target is the sentinel `-1` on the wire, so
//! `UnitId(-1)` is not a usable target id.

use skirm_core::{
    Command, CommandKind, DecodingError, EncodingError, OptionValue, PlayerId, UnitId,
};

use crate::wire::{self, Cursor};

/// Append one command's code and arguments.
pub fn encode_command(buf: &mut Vec<u8>, cmd: &Command) {
    wire::put_u8(buf, cmd.kind().code());
    match *cmd {
        Command::SpawnUnit {
            player,
            unit_type,
            x,
            y,
        } => {
            wire::put_i32_le(buf, i32::from(player.0));
            wire::put_i32_le(buf, unit_type);
            wire::put_i32_le(buf, x);
            wire::put_i32_le(buf, y);
        }
        Command::KillUnit { unit } => wire::put_i32_le(buf, unit.0),
        Command::UnitOrder {
            unit,
            order_type,
            target,
            x,
            y,
        } => {
            wire::put_i32_le(buf, unit.0);
            wire::put_i32_le(buf, order_type);
            wire::put_i32_le(buf, target.map_or(-1, |t| t.0));
            wire::put_i32_le(buf, x);
            wire::put_i32_le(buf, y);
        }
        Command::SetOption(opt) => {
            wire::put_i32_le(buf, i32::from(opt.code()));
            wire::put_i32_le(buf, opt.value());
        }
        Command::RequestImage { enabled } => wire::put_i32_le(buf, i32::from(enabled)),
        Command::Quit => {}
    }
}

/// Append a command assembled from untyped arguments.
///
/// This is the path for callers that build batches from scripting or
/// config sources; the structured [`Command`] type cannot express an
/// arity mistake, so the check lives here.
pub fn encode_raw_command(
    buf: &mut Vec<u8>,
    kind: CommandKind,
    args: &[i32],
) -> Result<(), EncodingError> {
    if args.len() != kind.arity() {
        return Err(EncodingError::ArityMismatch {
            kind,
            expected: kind.arity(),
            got: args.len(),
        });
    }
    wire::put_u8(buf, kind.code());
    for &arg in args {
        wire::put_i32_le(buf, arg);
    }
    Ok(())
}

/// Encode an ordered batch into a payload body (no message tag).
pub fn encode_batch(commands: &[Command]) -> Result<Vec<u8>, EncodingError> {
    if u32::try_from(commands.len()).is_err() {
        return Err(EncodingError::BatchTooLarge {
            len: commands.len(),
        });
    }
    let mut buf = Vec::new();
    wire::put_u32_le(&mut buf, commands.len() as u32);
    for cmd in commands {
        encode_command(&mut buf, cmd);
    }
    Ok(buf)
}

/// Decode an ordered batch from a payload body.
pub fn decode_batch(cur: &mut Cursor<'_>) -> Result<Vec<Command>, DecodingError> {
    let count = cur.u32_le("command count")? as usize;
    let mut commands = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        commands.push(decode_command(cur)?);
    }
    Ok(commands)
}

fn decode_command(cur: &mut Cursor<'_>) -> Result<Command, DecodingError> {
    let code = cur.u8("command code")?;
    let kind = CommandKind::from_code(code).ok_or(DecodingError::BadTag {
        tag: code,
        context: "command",
    })?;

    let mut args = [0i32; 5];
    for arg in args.iter_mut().take(kind.arity()) {
        *arg = cur.i32_le("command argument")?;
    }

    let cmd = match kind {
        CommandKind::SpawnUnit => Command::SpawnUnit {
            player: decode_player(kind, args[0])?,
            unit_type: args[1],
            x: args[2],
            y: args[3],
        },
        CommandKind::KillUnit => Command::KillUnit {
            unit: UnitId(args[0]),
        },
        CommandKind::UnitOrder => Command::UnitOrder {
            unit: UnitId(args[0]),
            order_type: args[1],
            target: decode_target(args[2]),
            x: args[3],
            y: args[4],
        },
        CommandKind::SetOption => {
            let code = u8::try_from(args[0]).map_err(|_| DecodingError::BadArgument {
                kind,
                detail: format!("option code {} out of range", args[0]),
            })?;
            let opt = match OptionValue::try_from_wire(code, args[1]) {
                Some(Ok(opt)) => opt,
                Some(Err(err)) => {
                    return Err(DecodingError::BadArgument {
                        kind,
                        detail: err.to_string(),
                    })
                }
                None => {
                    return Err(DecodingError::BadArgument {
                        kind,
                        detail: format!("unknown option code {code}"),
                    })
                }
            };
            Command::SetOption(opt)
        }
        CommandKind::RequestImage => Command::RequestImage {
            enabled: match args[0] {
                0 => false,
                1 => true,
                other => {
                    return Err(DecodingError::BadArgument {
                        kind,
                        detail: format!("expected 0 or 1, got {other}"),
                    })
                }
            },
        },
        CommandKind::Quit => Command::Quit,
    };
    Ok(cmd)
}

fn decode_player(kind: CommandKind, raw: i32) -> Result<PlayerId, DecodingError> {
    u8::try_from(raw)
        .map(PlayerId)
        .map_err(|_| DecodingError::BadArgument {
            kind,
            detail: format!("player slot {raw} out of range"),
        })
}

fn decode_target(raw: i32) -> Option<UnitId> {
    if raw == -1 {
        None
    } else {
        Some(UnitId(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(commands: &[Command]) -> Vec<Command> {
        let buf = encode_batch(commands).unwrap();
        let mut cur = Cursor::new(&buf);
        let got = decode_batch(&mut cur).unwrap();
        assert!(cur.is_empty(), "trailing bytes after batch");
        got
    }

    #[test]
    fn empty_batch_roundtrips() {
        assert_eq!(roundtrip(&[]), vec![]);
    }

    #[test]
    fn single_command_roundtrips() {
        let batch = vec![Command::KillUnit { unit: UnitId(42) }];
        assert_eq!(roundtrip(&batch), batch);
    }

    #[test]
    fn order_is_preserved_across_fifty_commands() {
        let batch: Vec<Command> = (0..50)
            .map(|i| Command::UnitOrder {
                unit: UnitId(i),
                order_type: 6,
                target: if i % 2 == 0 { None } else { Some(UnitId(i + 100)) },
                x: i * 3,
                y: i * 5,
            })
            .collect();
        assert_eq!(roundtrip(&batch), batch);
    }

    #[test]
    fn raw_path_rejects_wrong_arity() {
        let mut buf = Vec::new();
        let err = encode_raw_command(&mut buf, CommandKind::SpawnUnit, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            EncodingError::ArityMismatch {
                kind: CommandKind::SpawnUnit,
                expected: 4,
                got: 3,
            }
        );
        assert!(buf.is_empty(), "nothing written on rejection");
    }

    #[test]
    fn raw_path_matches_structured_encoding() {
        let mut raw = Vec::new();
        encode_raw_command(&mut raw, CommandKind::KillUnit, &[17]).unwrap();

        let mut structured = Vec::new();
        encode_command(&mut structured, &Command::KillUnit { unit: UnitId(17) });
        assert_eq!(raw, structured);
    }

    #[test]
    fn unknown_code_is_bad_tag() {
        let mut buf = Vec::new();
        wire::put_u32_le(&mut buf, 1);
        wire::put_u8(&mut buf, 99);
        let err = decode_batch(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(
            err,
            DecodingError::BadTag {
                tag: 99,
                context: "command"
            }
        ));
    }

    #[test]
    fn negative_player_slot_rejected() {
        let mut buf = Vec::new();
        wire::put_u32_le(&mut buf, 1);
        encode_raw_command(&mut buf, CommandKind::SpawnUnit, &[-2, 0, 10, 10]).unwrap();
        let err = decode_batch(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, DecodingError::BadArgument { .. }));
    }

    #[test]
    fn truncated_arguments_reported() {
        let mut buf = Vec::new();
        wire::put_u32_le(&mut buf, 1);
        wire::put_u8(&mut buf, CommandKind::SpawnUnit.code());
        wire::put_i32_le(&mut buf, 0); // 1 of 4 args
        let err = decode_batch(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, DecodingError::Truncated { .. }));
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (0u8..8, any::<i32>(), any::<i32>(), any::<i32>()).prop_map(|(p, t, x, y)| {
                Command::SpawnUnit {
                    player: PlayerId(p),
                    unit_type: t,
                    x,
                    y,
                }
            }),
            any::<i32>().prop_map(|id| Command::KillUnit { unit: UnitId(id) }),
            (
                any::<i32>(),
                any::<i32>(),
                prop::option::of(0i32..i32::MAX),
                any::<i32>(),
                any::<i32>(),
            )
                .prop_map(|(unit, order_type, target, x, y)| Command::UnitOrder {
                    unit: UnitId(unit),
                    order_type,
                    target: target.map(UnitId),
                    x,
                    y,
                }),
            (0u32..1000).prop_map(|v| Command::SetOption(OptionValue::Speed(v))),
            any::<bool>().prop_map(|b| Command::SetOption(OptionValue::Blocking(b))),
            any::<bool>().prop_map(|enabled| Command::RequestImage { enabled }),
            Just(Command::Quit),
        ]
    }

    proptest! {
        #[test]
        fn arbitrary_batches_roundtrip(batch in prop::collection::vec(arb_command(), 0..32)) {
            prop_assert_eq!(roundtrip(&batch), batch);
        }
    }
}
