//! A scripted in-process engine speaking the Skirm wire protocol.
//!
//! [`MockEngine`] binds an ephemeral localhost port, accepts exactly one
//! connection, answers the handshake, then plays out a fixed number of
//! command/frame exchanges. Received command batches are recorded so
//! tests can assert on what a session actually sent.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use skirm_codec::{
    decode_client, encode_server, read_frame, write_frame, ClientHandshake, ClientMessage,
    FrameError, ServerMessage,
};
use skirm_core::{Command, Frame, FrameId, MapData, PlayerId, Unit, UnitId};

use crate::fixtures;

/// Behavior knobs for a [`MockEngine`] run.
#[derive(Clone, Debug)]
pub struct MockEngineConfig {
    /// Reported command latency.
    pub lag_frames: u32,
    /// Slot assigned to the connecting client.
    pub player_id: PlayerId,
    /// Neutral slot reported in the handshake.
    pub neutral_id: PlayerId,
    /// Map sent in the handshake reply.
    pub map: MapData,
    /// Command/frame exchanges served before the engine ends the game.
    pub max_exchanges: u32,
    /// Outcome reported in the end-game message.
    pub won: bool,
    /// Pause inserted before each frame reply. Lets non-blocking tests
    /// observe a not-ready window.
    pub frame_delay: Duration,
}

impl Default for MockEngineConfig {
    fn default() -> Self {
        Self {
            lag_frames: 2,
            player_id: PlayerId(0),
            neutral_id: PlayerId(2),
            map: fixtures::map(16, 16),
            max_exchanges: 32,
            won: true,
            frame_delay: Duration::ZERO,
        }
    }
}

/// Shared recording of everything the client sent.
#[derive(Default)]
struct Recording {
    handshake: Option<ClientHandshake>,
    batches: Vec<Vec<Command>>,
}

/// Handle to a running mock engine thread.
pub struct MockEngine {
    addr: SocketAddr,
    recording: Arc<Mutex<Recording>>,
    peer: Arc<Mutex<Option<TcpStream>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockEngine {
    /// Binds an ephemeral port and starts serving in a background thread.
    pub fn spawn(config: MockEngineConfig) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let recording = Arc::new(Mutex::new(Recording::default()));
        let peer = Arc::new(Mutex::new(None));
        let thread_recording = Arc::clone(&recording);
        let thread_peer = Arc::clone(&peer);
        let handle = thread::spawn(move || {
            if let Err(err) = serve(&listener, &config, &thread_recording, &thread_peer) {
                log::debug!("mock engine finished with error: {err}");
            }
        });
        Ok(Self {
            addr,
            recording,
            peer,
            handle: Some(handle),
        })
    }

    /// Address the engine is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The handshake the client opened with, if one arrived yet.
    pub fn client_handshake(&self) -> Option<ClientHandshake> {
        self.recording.lock().unwrap().handshake.clone()
    }

    /// Every command batch received so far, in arrival order.
    pub fn recorded_batches(&self) -> Vec<Vec<Command>> {
        self.recording.lock().unwrap().batches.clone()
    }

    /// Waits for the serving thread to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        // The serve thread may still be blocked reading from a live
        // client, or waiting in accept. Shut the peer socket down and
        // poke the listener so the join below cannot block forever.
        if let Some(stream) = self.peer.lock().unwrap().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    listener: &TcpListener,
    config: &MockEngineConfig,
    recording: &Mutex<Recording>,
    peer: &Mutex<Option<TcpStream>>,
) -> Result<(), FrameError> {
    let (mut stream, addr) = listener.accept()?;
    log::debug!("mock engine accepted connection from {addr}");
    *peer.lock().unwrap() = stream.try_clone().ok();

    let handshake = match decode_client(&read_frame(&mut stream)?) {
        Ok(ClientMessage::Handshake(hs)) => hs,
        Ok(other) => {
            log::debug!("expected handshake, got {other:?}");
            return Ok(());
        }
        Err(err) => {
            log::debug!("bad handshake payload: {err}");
            return Ok(());
        }
    };
    recording.lock().unwrap().handshake = Some(handshake);

    let mut state = Frame::new(FrameId(0));
    state.units.insert(config.player_id, Vec::new());
    state.units.insert(config.neutral_id, Vec::new());

    send(
        &mut stream,
        &ServerMessage::Handshake {
            lag_frames: config.lag_frames,
            player_id: config.player_id,
            neutral_id: config.neutral_id,
            map: config.map.clone(),
            frame: state.clone(),
        },
    )?;

    let mut next_unit_id = 1;
    for _ in 0..config.max_exchanges {
        let payload = match read_frame(&mut stream) {
            Ok(payload) => payload,
            Err(FrameError::UnexpectedEof) => return Ok(()),
            Err(err) => return Err(err),
        };
        let batch = match decode_client(&payload) {
            Ok(ClientMessage::Commands(batch)) => batch,
            Ok(other) => {
                log::debug!("expected commands, got {other:?}");
                return Ok(());
            }
            Err(err) => {
                log::debug!("bad command payload: {err}");
                return Ok(());
            }
        };
        recording.lock().unwrap().batches.push(batch.clone());

        state.id = FrameId(state.id.0 + 1);
        state.battle_frame_count += 1;
        state.deaths.clear();
        let mut quit = false;
        for command in &batch {
            apply(command, &mut state, &mut next_unit_id, &mut quit);
        }

        if !config.frame_delay.is_zero() {
            thread::sleep(config.frame_delay);
        }
        if quit {
            send(
                &mut stream,
                &ServerMessage::EndGame {
                    frame: state,
                    won: config.won,
                },
            )?;
            return drain(&mut stream);
        }
        send(&mut stream, &ServerMessage::Frame(state.clone()))?;
    }

    send(
        &mut stream,
        &ServerMessage::EndGame {
            frame: state,
            won: config.won,
        },
    )?;
    drain(&mut stream)
}

/// Discards client traffic until it hangs up. Keeping the socket open
/// lets an in-flight batch land without a broken-pipe error on the
/// client side.
fn drain(stream: &mut TcpStream) -> Result<(), FrameError> {
    loop {
        match read_frame(stream) {
            Ok(_) => {}
            Err(FrameError::UnexpectedEof) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn apply(command: &Command, state: &mut Frame, next_unit_id: &mut i32, quit: &mut bool) {
    match command {
        Command::SpawnUnit {
            player,
            unit_type,
            x,
            y,
        } => {
            let unit = Unit::new(UnitId(*next_unit_id), *player, *unit_type, *x, *y);
            *next_unit_id += 1;
            state.units.entry(*player).or_default().push(unit);
        }
        Command::KillUnit { unit } => {
            for units in state.units.values_mut() {
                units.retain(|u| u.id != *unit);
            }
            state.deaths.push(*unit);
        }
        Command::UnitOrder {
            unit,
            order_type,
            target,
            x,
            y,
        } => {
            for units in state.units.values_mut() {
                if let Some(u) = units.iter_mut().find(|u| u.id == *unit) {
                    u.attrs.order = Some(skirm_core::UnitOrder {
                        order_type: *order_type,
                        target: *target,
                        target_x: *x,
                        target_y: *y,
                    });
                }
            }
        }
        // Options do not change the scripted frame stream.
        Command::SetOption(_) => {}
        Command::RequestImage { .. } => {}
        Command::Quit => *quit = true,
    }
}

fn send(stream: &mut TcpStream, msg: &ServerMessage) -> Result<(), FrameError> {
    write_frame(stream, &encode_server(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirm_codec::{encode_client, PROTOCOL_VERSION};
    use skirm_core::SessionOptions;

    fn handshake() -> ClientMessage {
        ClientMessage::Handshake(ClientHandshake {
            protocol_version: PROTOCOL_VERSION,
            uid: "test".into(),
            map_name: String::new(),
            micro_battles: false,
            options: SessionOptions::default(),
        })
    }

    #[test]
    fn answers_handshake_and_records_batches() {
        let engine = MockEngine::spawn(MockEngineConfig {
            max_exchanges: 2,
            ..MockEngineConfig::default()
        })
        .unwrap();
        let mut stream = TcpStream::connect(engine.addr()).unwrap();

        write_frame(&mut stream, &encode_client(&handshake()).unwrap()).unwrap();
        let reply = skirm_codec::decode_server(&read_frame(&mut stream).unwrap()).unwrap();
        match reply {
            ServerMessage::Handshake { frame, .. } => assert_eq!(frame.id, FrameId(0)),
            other => panic!("unexpected reply: {other:?}"),
        }

        let batch = vec![Command::SpawnUnit {
            player: PlayerId(0),
            unit_type: 3,
            x: 4,
            y: 5,
        }];
        write_frame(
            &mut stream,
            &encode_client(&ClientMessage::Commands(batch.clone())).unwrap(),
        )
        .unwrap();
        let reply = skirm_codec::decode_server(&read_frame(&mut stream).unwrap()).unwrap();
        match reply {
            ServerMessage::Frame(frame) => {
                assert_eq!(frame.id, FrameId(1));
                assert_eq!(frame.unit_count(), 1);
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        write_frame(
            &mut stream,
            &encode_client(&ClientMessage::Commands(vec![Command::Quit])).unwrap(),
        )
        .unwrap();
        let reply = skirm_codec::decode_server(&read_frame(&mut stream).unwrap()).unwrap();
        assert!(matches!(reply, ServerMessage::EndGame { .. }));

        drop(stream);
        assert_eq!(engine.recorded_batches().len(), 2);
        assert_eq!(
            engine.client_handshake().map(|hs| hs.uid),
            Some("test".into()),
        );
        engine.join();
    }

    #[test]
    fn kill_reports_death() {
        let engine = MockEngine::spawn(MockEngineConfig::default()).unwrap();
        let mut stream = TcpStream::connect(engine.addr()).unwrap();

        write_frame(&mut stream, &encode_client(&handshake()).unwrap()).unwrap();
        read_frame(&mut stream).unwrap();

        let spawn = vec![Command::SpawnUnit {
            player: PlayerId(0),
            unit_type: 0,
            x: 0,
            y: 0,
        }];
        write_frame(&mut stream, &encode_client(&ClientMessage::Commands(spawn)).unwrap()).unwrap();
        read_frame(&mut stream).unwrap();

        let kill = vec![Command::KillUnit { unit: UnitId(1) }];
        write_frame(&mut stream, &encode_client(&ClientMessage::Commands(kill)).unwrap()).unwrap();
        let reply = skirm_codec::decode_server(&read_frame(&mut stream).unwrap()).unwrap();
        match reply {
            ServerMessage::Frame(frame) => {
                assert_eq!(frame.unit_count(), 0);
                assert_eq!(frame.deaths.as_slice(), &[UnitId(1)]);
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        drop(stream);
        engine.join();
    }

    #[test]
    fn drop_with_live_client_returns() {
        let engine = MockEngine::spawn(MockEngineConfig::default()).unwrap();
        let mut stream = TcpStream::connect(engine.addr()).unwrap();
        write_frame(&mut stream, &encode_client(&handshake()).unwrap()).unwrap();
        read_frame(&mut stream).unwrap();

        // The client socket stays open, so teardown must cut the
        // connection itself instead of waiting for the next batch.
        drop(engine);
    }

    #[test]
    fn drop_without_client_returns() {
        let engine = MockEngine::spawn(MockEngineConfig::default()).unwrap();
        drop(engine);
    }
}
