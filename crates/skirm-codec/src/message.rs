//! Message envelopes: one tag byte plus a body.
//!
//! The client speaks [`ClientMessage`], the engine [`ServerMessage`].
//! Tag dispatch lives here; bodies are delegated to the command and
//! snapshot codecs.

use skirm_core::{
    Command, CommandKind, DecodingError, EncodingError, Frame, MapData, OptionValue, PlayerId,
    SessionOptions,
};

use crate::command::{decode_batch, encode_batch};
use crate::snapshot::{decode_frame, decode_map, encode_frame, encode_map};
use crate::wire::{self, Cursor};
use crate::{MSG_COMMANDS, MSG_END_GAME, MSG_FRAME, MSG_HANDSHAKE_CLIENT, MSG_HANDSHAKE_SERVER};

/// Opening message of a session, sent once after connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientHandshake {
    /// Wire protocol version the client speaks.
    pub protocol_version: u8,
    /// Random per-session identifier, echoed in engine logs.
    pub uid: String,
    /// Map the client asks to play on; empty lets the engine choose.
    pub map_name: String,
    /// Whether play is segmented into scripted micro battles.
    pub micro_battles: bool,
    /// Initial option set.
    pub options: SessionOptions,
}

/// Messages sent client → engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Session opening.
    Handshake(ClientHandshake),
    /// One ordered command batch.
    Commands(Vec<Command>),
}

/// Messages sent engine → client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake reply: game constants, map, and the first frame.
    Handshake {
        /// Frames of command latency the engine imposes.
        lag_frames: u32,
        /// The slot this client controls.
        player_id: PlayerId,
        /// The neutral (resource) player slot.
        neutral_id: PlayerId,
        /// Static map data.
        map: MapData,
        /// State at the moment the session became live.
        frame: Frame,
    },
    /// One frame snapshot.
    Frame(Frame),
    /// The game is over; no frames follow.
    EndGame {
        /// Final state.
        frame: Frame,
        /// Whether this client's player won.
        won: bool,
    },
}

// ── Encode ──────────────────────────────────────────────────────

/// Encode a client message into a framed payload body.
pub fn encode_client(msg: &ClientMessage) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::new();
    match msg {
        ClientMessage::Handshake(hs) => {
            wire::put_u8(&mut buf, MSG_HANDSHAKE_CLIENT);
            wire::put_u8(&mut buf, hs.protocol_version);
            wire::put_str(&mut buf, &hs.uid);
            wire::put_str(&mut buf, &hs.map_name);
            wire::put_u8(&mut buf, u8::from(hs.micro_battles));
            let values = option_values(&hs.options);
            wire::put_u8(&mut buf, values.len() as u8);
            for value in values {
                wire::put_u8(&mut buf, value.code());
                wire::put_i32_le(&mut buf, value.value());
            }
        }
        ClientMessage::Commands(commands) => {
            wire::put_u8(&mut buf, MSG_COMMANDS);
            buf.extend_from_slice(&encode_batch(commands)?);
        }
    }
    Ok(buf)
}

/// Encode a server message into a framed payload body.
pub fn encode_server(msg: &ServerMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        ServerMessage::Handshake {
            lag_frames,
            player_id,
            neutral_id,
            map,
            frame,
        } => {
            wire::put_u8(&mut buf, MSG_HANDSHAKE_SERVER);
            wire::put_u32_le(&mut buf, *lag_frames);
            wire::put_u8(&mut buf, player_id.0);
            wire::put_u8(&mut buf, neutral_id.0);
            encode_map(&mut buf, map);
            encode_frame(&mut buf, frame);
        }
        ServerMessage::Frame(frame) => {
            wire::put_u8(&mut buf, MSG_FRAME);
            encode_frame(&mut buf, frame);
        }
        ServerMessage::EndGame { frame, won } => {
            wire::put_u8(&mut buf, MSG_END_GAME);
            encode_frame(&mut buf, frame);
            wire::put_u8(&mut buf, u8::from(*won));
        }
    }
    buf
}

// ── Decode ──────────────────────────────────────────────────────

/// Decode a client message from a framed payload body.
pub fn decode_client(payload: &[u8]) -> Result<ClientMessage, DecodingError> {
    let mut cur = Cursor::new(payload);
    let tag = cur.u8("message tag")?;
    match tag {
        MSG_HANDSHAKE_CLIENT => {
            let protocol_version = cur.u8("protocol version")?;
            let uid = cur.str("session uid")?;
            let map_name = cur.str("map name")?;
            let micro_battles = decode_bool(&mut cur, "micro_battles flag")?;
            let count = cur.u8("option count")?;
            let mut options = SessionOptions::default();
            for _ in 0..count {
                let code = cur.u8("option code")?;
                let value = cur.i32_le("option value")?;
                apply_option(&mut options, code, value)?;
            }
            // Micro battles ride the handshake flag, not an option
            // pair; keep the decoded option set in agreement.
            options.micro_battles = micro_battles;
            Ok(ClientMessage::Handshake(ClientHandshake {
                protocol_version,
                uid,
                map_name,
                micro_battles,
                options,
            }))
        }
        MSG_COMMANDS => Ok(ClientMessage::Commands(decode_batch(&mut cur)?)),
        tag => Err(DecodingError::BadTag {
            tag,
            context: "client message",
        }),
    }
}

/// Decode a server message from a framed payload body.
pub fn decode_server(payload: &[u8]) -> Result<ServerMessage, DecodingError> {
    let mut cur = Cursor::new(payload);
    let tag = cur.u8("message tag")?;
    match tag {
        MSG_HANDSHAKE_SERVER => Ok(ServerMessage::Handshake {
            lag_frames: cur.u32_le("lag frames")?,
            player_id: PlayerId(cur.u8("player id")?),
            neutral_id: PlayerId(cur.u8("neutral id")?),
            map: decode_map(&mut cur)?,
            frame: decode_frame(&mut cur)?,
        }),
        MSG_FRAME => Ok(ServerMessage::Frame(decode_frame(&mut cur)?)),
        MSG_END_GAME => {
            let frame = decode_frame(&mut cur)?;
            let won = decode_bool(&mut cur, "game_won flag")?;
            Ok(ServerMessage::EndGame { frame, won })
        }
        tag => Err(DecodingError::BadTag {
            tag,
            context: "server message",
        }),
    }
}

fn decode_bool(cur: &mut Cursor<'_>, what: &str) -> Result<bool, DecodingError> {
    match cur.u8(what)? {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(DecodingError::BadTag {
            tag,
            context: "bool flag",
        }),
    }
}

/// The full option set as wire pairs, in fixed code order.
fn option_values(options: &SessionOptions) -> [OptionValue; 8] {
    [
        OptionValue::Speed(options.speed),
        OptionValue::CombineFrames(options.combine_frames),
        OptionValue::Gui(options.gui),
        OptionValue::Blocking(options.blocking),
        OptionValue::Frameskip(options.frameskip),
        OptionValue::Logging(options.logging),
        OptionValue::CommandOptimization(options.command_optimization),
        OptionValue::MapHack(options.map_hack),
    ]
}

fn apply_option(
    options: &mut SessionOptions,
    code: u8,
    value: i32,
) -> Result<(), DecodingError> {
    let opt = match OptionValue::try_from_wire(code, value) {
        Some(Ok(opt)) => opt,
        Some(Err(err)) => {
            return Err(DecodingError::BadArgument {
                kind: CommandKind::SetOption,
                detail: err.to_string(),
            })
        }
        None => {
            return Err(DecodingError::BadArgument {
                kind: CommandKind::SetOption,
                detail: format!("unknown option code {code}"),
            })
        }
    };
    opt.apply(options).map_err(|e| DecodingError::BadArgument {
        kind: CommandKind::SetOption,
        detail: e.to_string(),
    })
}
