//! Lock-step TCP session against a running engine.
//!
//! A [`Session`] owns the write half of the socket; a background reader
//! thread owns a cloned read half and forwards decoded messages over a
//! bounded channel. Closing the socket unblocks the reader, so
//! [`Session::close`] never hangs on a half-open connection.

use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use rand::distributions::Alphanumeric;
use rand::Rng;

use skirm_codec::{
    decode_server, encode_client, read_frame, write_frame, ClientHandshake, ClientMessage,
    FrameError, ServerMessage, PROTOCOL_VERSION,
};
use skirm_core::{Command, Frame, MapData, OptionValue, PlayerId, SessionOptions};

use crate::error::SessionError;

/// Default connect timeout used by [`Session::connect`].
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Inbound message buffer depth. The lock-step discipline keeps at most
/// one frame in flight per outstanding batch, so this never fills in
/// normal operation.
const INBOUND_CAPACITY: usize = 16;

const UID_LEN: usize = 8;

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// TCP established, handshake not yet exchanged.
    Connected,
    /// Handshake complete; frames are flowing.
    Streaming,
    /// Socket shut down. Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        })
    }
}

/// Game constants from the engine's handshake reply.
#[derive(Clone, Debug)]
pub struct GameInfo {
    /// Frames of command latency the engine imposes.
    pub lag_frames: u32,
    /// The slot this client controls.
    pub player_id: PlayerId,
    /// The neutral (resource) player slot.
    pub neutral_id: PlayerId,
    /// Static map data.
    pub map: MapData,
    /// State at the moment the session became live.
    pub first_frame: Frame,
}

/// Outcome of one [`Session::receive`] call.
#[derive(Clone, Debug)]
pub enum Received {
    /// The next frame snapshot.
    Frame(Frame),
    /// The game ended; the session is closed.
    GameEnded {
        /// Final state.
        frame: Frame,
        /// Whether this client's player won.
        won: bool,
    },
    /// Non-blocking mode only: no frame has arrived yet.
    NotReady,
}

/// A client session speaking the Skirm wire protocol.
pub struct Session {
    stream: TcpStream,
    inbound: Receiver<Result<ServerMessage, SessionError>>,
    reader: Option<JoinHandle<()>>,
    state: SessionState,
    options: SessionOptions,
    uid: String,
    awaiting_frame: bool,
}

impl Session {
    /// Connects to an engine with the default timeout.
    pub fn connect(host: &str, port: u16) -> Result<Self, SessionError> {
        Self::connect_with_timeout(host, port, CONNECT_TIMEOUT)
    }

    /// Connects to an engine, trying each resolved address in turn.
    pub fn connect_with_timeout(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let connection_err = |source: io::Error| SessionError::Connection {
            host: host.to_owned(),
            port,
            source,
        };

        let addrs = (host, port).to_socket_addrs().map_err(connection_err)?;
        let mut last_err = None;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let stream = match stream {
            Some(s) => s,
            None => {
                let source = last_err.unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
                });
                return Err(connection_err(source));
            }
        };
        stream.set_nodelay(true).map_err(connection_err)?;

        let read_half = stream.try_clone().map_err(connection_err)?;
        let (tx, rx) = bounded(INBOUND_CAPACITY);
        let reader = thread::spawn(move || reader_loop(read_half, tx));

        let uid: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(UID_LEN)
            .map(char::from)
            .collect();
        log::debug!("session {uid} connected to {host}:{port}");

        Ok(Self {
            stream,
            inbound: rx,
            reader: Some(reader),
            state: SessionState::Connected,
            options: SessionOptions::default(),
            uid,
            awaiting_frame: false,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The random session uid sent in the handshake.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The option set as last acknowledged locally.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Performs the handshake and waits for the engine's reply.
    ///
    /// Always blocks for the reply, regardless of the blocking option;
    /// that option governs frame delivery only.
    pub fn initialize(
        &mut self,
        map_name: &str,
        options: SessionOptions,
    ) -> Result<GameInfo, SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }
        options.validate()?;

        let handshake = ClientMessage::Handshake(ClientHandshake {
            protocol_version: PROTOCOL_VERSION,
            uid: self.uid.clone(),
            map_name: map_name.to_owned(),
            micro_battles: options.micro_battles,
            options: options.clone(),
        });
        write_frame(&mut self.stream, &encode_client(&handshake)?)?;

        match self.recv_blocking()? {
            ServerMessage::Handshake {
                lag_frames,
                player_id,
                neutral_id,
                map,
                frame,
            } => {
                self.options = options;
                self.state = SessionState::Streaming;
                log::info!(
                    "session {} streaming as player {player_id} on map {:?}",
                    self.uid,
                    map.name
                );
                Ok(GameInfo {
                    lag_frames,
                    player_id,
                    neutral_id,
                    map,
                    first_frame: frame,
                })
            }
            other => Err(SessionError::Protocol {
                detail: format!("expected handshake reply, got {}", message_name(&other)),
            }),
        }
    }

    /// Submits one ordered command batch.
    ///
    /// Lock-step discipline: exactly one send per frame cycle. A second
    /// send before the cycle's [`Session::receive`] is rejected with
    /// [`SessionError::InvalidState`]. Option commands in the batch are
    /// validated against the local option set before anything is
    /// written, and committed locally once the write succeeds.
    pub fn send(&mut self, commands: &[Command]) -> Result<(), SessionError> {
        if self.state != SessionState::Streaming || self.awaiting_frame {
            return Err(SessionError::InvalidState {
                operation: "send",
                state: self.state,
            });
        }

        let mut next_options = self.options.clone();
        for command in commands {
            if let Command::SetOption(value) = command {
                value.apply(&mut next_options)?;
            }
        }

        let payload = encode_client(&ClientMessage::Commands(commands.to_vec()))?;
        write_frame(&mut self.stream, &payload)?;
        self.options = next_options;
        self.awaiting_frame = true;
        Ok(())
    }

    /// Forwards option updates as a batch of option commands.
    ///
    /// Counts as the cycle's send; values take effect at the next frame
    /// boundary.
    pub fn update_options(&mut self, updates: &[OptionValue]) -> Result<(), SessionError> {
        let commands: Vec<Command> = updates.iter().copied().map(Command::SetOption).collect();
        self.send(&commands)
    }

    /// Waits for (or polls for) the next frame.
    ///
    /// If nothing was sent this cycle, an empty batch is sent first so
    /// the engine can advance. With blocking on, parks until a message
    /// arrives; otherwise returns [`Received::NotReady`] when the
    /// channel is empty.
    pub fn receive(&mut self) -> Result<Received, SessionError> {
        if self.state != SessionState::Streaming {
            return Err(SessionError::InvalidState {
                operation: "receive",
                state: self.state,
            });
        }
        if !self.awaiting_frame {
            self.send(&[])?;
        }

        if self.options.blocking {
            let msg = self.recv_blocking()?;
            self.handle_message(msg)
        } else {
            match self.inbound.try_recv() {
                Ok(Ok(msg)) => self.handle_message(msg),
                Ok(Err(err)) => {
                    self.state = SessionState::Closed;
                    Err(err)
                }
                Err(TryRecvError::Empty) => Ok(Received::NotReady),
                Err(TryRecvError::Disconnected) => {
                    self.state = SessionState::Closed;
                    Err(SessionError::Closed)
                }
            }
        }
    }

    /// Shuts the session down. Idempotent; never blocks on the engine.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        self.state = SessionState::Closed;
        log::debug!("session {} closed", self.uid);
    }

    fn recv_blocking(&mut self) -> Result<ServerMessage, SessionError> {
        match self.inbound.recv() {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(err)) => {
                self.state = SessionState::Closed;
                Err(err)
            }
            Err(_) => {
                self.state = SessionState::Closed;
                Err(SessionError::Closed)
            }
        }
    }

    fn handle_message(&mut self, msg: ServerMessage) -> Result<Received, SessionError> {
        match msg {
            ServerMessage::Frame(frame) => {
                self.awaiting_frame = false;
                Ok(Received::Frame(frame))
            }
            ServerMessage::EndGame { frame, won } => {
                self.awaiting_frame = false;
                self.close();
                Ok(Received::GameEnded { frame, won })
            }
            ServerMessage::Handshake { .. } => Err(SessionError::Protocol {
                detail: "unexpected handshake reply while streaming".into(),
            }),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader thread body. Exits on disconnect, on the first decode error
/// (reported through the channel), or after forwarding an end-game
/// message.
fn reader_loop(mut stream: TcpStream, tx: Sender<Result<ServerMessage, SessionError>>) {
    loop {
        let payload = match read_frame(&mut stream) {
            Ok(payload) => payload,
            Err(FrameError::UnexpectedEof) => break,
            Err(err) => {
                let _ = tx.send(Err(err.into()));
                break;
            }
        };
        let msg = match decode_server(&payload) {
            Ok(msg) => msg,
            Err(err) => {
                let _ = tx.send(Err(err.into()));
                break;
            }
        };
        let last = matches!(msg, ServerMessage::EndGame { .. });
        if tx.send(Ok(msg)).is_err() || last {
            break;
        }
    }
    log::debug!("session reader exiting");
}

fn message_name(msg: &ServerMessage) -> &'static str {
    match msg {
        ServerMessage::Handshake { .. } => "handshake",
        ServerMessage::Frame(_) => "frame",
        ServerMessage::EndGame { .. } => "end-game",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirm_core::{FrameId, UnitId};
    use skirm_test_utils::{MockEngine, MockEngineConfig};

    fn streaming_session(config: MockEngineConfig) -> (Session, MockEngine, GameInfo) {
        let engine = MockEngine::spawn(config).unwrap();
        let mut session =
            Session::connect("127.0.0.1", engine.addr().port()).unwrap();
        let info = session.initialize("", SessionOptions::default()).unwrap();
        (session, engine, info)
    }

    #[test]
    fn handshake_returns_game_info() {
        let (session, engine, info) = streaming_session(MockEngineConfig::default());
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(info.lag_frames, 2);
        assert_eq!(info.player_id, PlayerId(0));
        assert_eq!(info.first_frame.id, FrameId(0));
        assert_eq!(info.map, skirm_test_utils::fixtures::map(16, 16));

        let recorded = engine.client_handshake().unwrap();
        assert_eq!(recorded.uid, session.uid());
        assert_eq!(recorded.uid.len(), 8);
        assert_eq!(recorded.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn invalid_options_rejected_before_io() {
        let engine = MockEngine::spawn(MockEngineConfig::default()).unwrap();
        let mut session = Session::connect("127.0.0.1", engine.addr().port()).unwrap();
        let mut options = SessionOptions::default();
        options.combine_frames = 0;
        assert!(matches!(
            session.initialize("", options),
            Err(SessionError::Config(_))
        ));
        // No handshake ever reached the engine.
        assert!(engine.client_handshake().is_none());
        session.close();
    }

    #[test]
    fn second_send_without_receive_rejected() {
        let (mut session, _engine, _info) = streaming_session(MockEngineConfig::default());
        session.send(&[]).unwrap();
        assert!(matches!(
            session.send(&[]),
            Err(SessionError::InvalidState {
                operation: "send",
                ..
            })
        ));
        // The cycle completes normally after a receive.
        assert!(matches!(session.receive(), Ok(Received::Frame(_))));
        session.send(&[]).unwrap();
    }

    #[test]
    fn receive_auto_sends_empty_batch() {
        let (mut session, engine, _info) = streaming_session(MockEngineConfig::default());
        match session.receive().unwrap() {
            Received::Frame(frame) => assert_eq!(frame.id, FrameId(1)),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(engine.recorded_batches(), vec![Vec::new()]);
    }

    #[test]
    fn spawn_and_kill_change_unit_counts() {
        let (mut session, _engine, info) = streaming_session(MockEngineConfig::default());
        let me = info.player_id;
        let other = PlayerId(1);

        session
            .send(&[
                Command::SpawnUnit {
                    player: me,
                    unit_type: 0,
                    x: 10,
                    y: 10,
                },
                Command::SpawnUnit {
                    player: other,
                    unit_type: 0,
                    x: 20,
                    y: 20,
                },
            ])
            .unwrap();
        let frame = match session.receive().unwrap() {
            Received::Frame(frame) => frame,
            other => panic!("unexpected result: {other:?}"),
        };
        assert_eq!(frame.unit_count(), 2);
        let victim = frame.units[&me][0].id;

        session.send(&[Command::KillUnit { unit: victim }]).unwrap();
        let frame = match session.receive().unwrap() {
            Received::Frame(frame) => frame,
            other => panic!("unexpected result: {other:?}"),
        };
        assert_eq!(frame.unit_count(), 1);
        assert_eq!(frame.deaths.as_slice(), &[victim]);

        session.send(&[Command::Quit]).unwrap();
        assert!(matches!(
            session.receive().unwrap(),
            Received::GameEnded { won: true, .. }
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn non_blocking_receive_reports_not_ready() {
        let config = MockEngineConfig {
            frame_delay: Duration::from_millis(150),
            ..MockEngineConfig::default()
        };
        let engine = MockEngine::spawn(config).unwrap();
        let mut session = Session::connect("127.0.0.1", engine.addr().port()).unwrap();
        let mut options = SessionOptions::default();
        options.blocking = false;
        session.initialize("", options).unwrap();

        session.send(&[]).unwrap();
        assert!(matches!(session.receive().unwrap(), Received::NotReady));

        // The frame shows up once the engine gets around to it.
        let frame = loop {
            match session.receive().unwrap() {
                Received::Frame(frame) => break frame,
                Received::NotReady => thread::sleep(Duration::from_millis(10)),
                other => panic!("unexpected result: {other:?}"),
            }
        };
        assert_eq!(frame.id, FrameId(1));
        session.close();
    }

    #[test]
    fn update_options_forwards_option_commands() {
        let (mut session, engine, _info) = streaming_session(MockEngineConfig::default());
        session
            .update_options(&[OptionValue::Speed(25), OptionValue::CombineFrames(4)])
            .unwrap();
        assert!(matches!(session.receive(), Ok(Received::Frame(_))));

        assert_eq!(session.options().speed, 25);
        assert_eq!(session.options().combine_frames, 4);
        assert_eq!(
            engine.recorded_batches(),
            vec![vec![
                Command::SetOption(OptionValue::Speed(25)),
                Command::SetOption(OptionValue::CombineFrames(4)),
            ]]
        );
    }

    #[test]
    fn invalid_option_command_rejected_before_io() {
        let (mut session, engine, _info) = streaming_session(MockEngineConfig::default());
        assert!(matches!(
            session.update_options(&[OptionValue::CombineFrames(0)]),
            Err(SessionError::Config(_))
        ));
        // The rejected batch never reached the engine, and the cycle is
        // still open.
        assert!(engine.recorded_batches().is_empty());
        session.send(&[]).unwrap();
        assert!(matches!(session.receive(), Ok(Received::Frame(_))));
    }

    #[test]
    fn close_is_idempotent_and_receive_after_close_fails() {
        let (mut session, _engine, _info) = streaming_session(MockEngineConfig::default());
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.receive(),
            Err(SessionError::InvalidState {
                operation: "receive",
                ..
            })
        ));
        assert!(matches!(
            session.send(&[]),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn engine_end_of_script_reports_game_end() {
        let config = MockEngineConfig {
            max_exchanges: 1,
            won: false,
            ..MockEngineConfig::default()
        };
        let (mut session, _engine, _info) = streaming_session(config);
        assert!(matches!(session.receive(), Ok(Received::Frame(_))));
        assert!(matches!(
            session.receive().unwrap(),
            Received::GameEnded { won: false, .. }
        ));
    }

    #[test]
    fn connect_failure_names_the_endpoint() {
        // A port nothing listens on. Connection is refused immediately
        // on loopback.
        let err = Session::connect_with_timeout("127.0.0.1", 1, Duration::from_millis(500));
        match err {
            Err(SessionError::Connection { host, port, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 1);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn kill_unknown_unit_is_harmless() {
        let (mut session, _engine, _info) = streaming_session(MockEngineConfig::default());
        session
            .send(&[Command::KillUnit { unit: UnitId(999) }])
            .unwrap();
        let frame = match session.receive().unwrap() {
            Received::Frame(frame) => frame,
            other => panic!("unexpected result: {other:?}"),
        };
        assert_eq!(frame.unit_count(), 0);
        assert_eq!(frame.deaths.as_slice(), &[UnitId(999)]);
    }
}
