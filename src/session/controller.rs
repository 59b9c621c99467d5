use std::fmt::Display;
use std::time::Instant;

use log::{debug, info, trace, warn};

use crate::kalah::{ParsePositionError, Player, Position};
use crate::network::{Message, MessageSink, PeerId, Transport};
use crate::search::{Evaluator, SearchEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub local_color: Player,
    /// stop after this many own moves; `None` plays on forever
    pub max_moves: Option<u32>,
    pub rotate_evaluation: bool,
}

#[derive(Debug)]
pub enum SessionError {
    MalformedPosition(ParsePositionError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::MalformedPosition(err) => write!(f, "received {}", err),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::MalformedPosition(err) => Some(err),
        }
    }
}

impl From<ParsePositionError> for SessionError {
    fn from(err: ParsePositionError) -> Self {
        SessionError::MalformedPosition(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Waiting,
    /// shutdown requested; nothing is processed anymore
    Terminating,
}

/*====================================================================================================================*/

/// Plays one side of a game whose positions are broadcast on a shared channel.
///
/// Whenever a position arrives in which the local side is to move, the controller searches a move, plays it and
/// broadcasts the result. It keeps the last position it published itself, so peers joining later are caught up.
pub struct SessionController {
    config: SessionConfig,
    state: SessionState,

    position: Position,
    // position we published last; cleared as soon as anybody else publishes one
    last_broadcast: Option<String>,
    moves_remaining: Option<u32>,

    engine: Box<dyn SearchEngine>,
    evaluator: Box<dyn Evaluator>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        position: Position,
        engine: Box<dyn SearchEngine>,
        evaluator: Box<dyn Evaluator>,
    ) -> Self {
        SessionController {
            moves_remaining: config.max_moves,
            config,
            state: SessionState::Waiting,
            position,
            last_broadcast: None,
            engine,
            evaluator,
        }
    }

    /// Start a game from `position`: move right away if it is our turn, otherwise publish the position to
    /// whoever joins first.
    pub fn open(&mut self, position: Position, transport: &mut dyn Transport) {
        self.position = position;
        self.last_broadcast = None;

        info!("Opening game:\n{}", self.position);

        if !self.check_status(transport) {
            return;
        }

        if self.position.to_move() == self.config.local_color {
            self.play_turn(transport);
        } else {
            self.last_broadcast = Some(self.position.to_token());
        }
    }

    fn receive_position(&mut self, token: &str, transport: &mut dyn Transport) -> Result<(), SessionError> {
        // somebody else has spoken, our last position is outdated
        self.last_broadcast = None;

        self.position.load_token(token)?;

        debug!("\n==========================================\n{}", self.position);

        if !self.check_status(transport) {
            return Ok(());
        }

        if self.position.to_move() != self.config.local_color {
            return Ok(());
        }

        self.play_turn(transport);

        Ok(())
    }

    // true if the game goes on with somebody to move; terminal positions start the shutdown
    fn check_status(&mut self, transport: &mut dyn Transport) -> bool {
        let status = self.position.status();

        if status.is_valid() {
            return true;
        }

        info!("{}", status);

        if status.is_terminal() {
            self.terminate(transport);
        }

        false
    }

    // a bonus move leaves us to move again; nobody sends the position back, so keep playing
    fn play_turn(&mut self, transport: &mut dyn Transport) {
        while self.play_single_move(transport) {
            debug!("Bonus move for {}", self.config.local_color);
        }
    }

    // true if we are to move again right away
    fn play_single_move(&mut self, transport: &mut dyn Transport) -> bool {
        let side = self.config.local_color;

        let start_t = Instant::now();
        let best_move = self.engine.best_move(&self.position, self.evaluator.as_ref());
        let elapsed_ms = start_t.elapsed().as_millis() as u64;

        let Some(best_move) = best_move else {
            warn!("{} can not draw any move ?! Sorry.", side);
            return false;
        };

        if best_move.player() != side || !self.position.board().is_legal_move(best_move) {
            warn!("{} search came up with illegal move {}, not playing it", side, best_move);
            return false;
        }

        info!(
            "{} draws '{}' (after {}.{:03} secs)...",
            side,
            best_move,
            elapsed_ms / 1000,
            elapsed_ms % 1000
        );

        self.position.play_move(best_move, elapsed_ms);

        let token = self.position.to_token();
        debug!("{}", token);
        transport.broadcast(&Message::position_line(&token));
        self.last_broadcast = Some(token);

        if self.config.rotate_evaluation {
            self.evaluator.rotate();
            trace!("Evaluation switched to {}", self.evaluator.name());
        }

        // stop at the end of the game; the peers see the final position and stop on their own
        let status = self.position.status();
        if status.is_terminal() {
            info!("{}", status);
            self.terminate(transport);
            return false;
        }

        if let Some(remaining) = self.moves_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);

            if *remaining == 0 {
                info!("Terminating because given number of moves drawn.");
                transport.broadcast(&Message::quit_line());
                self.terminate(transport);
                return false;
            }
        }

        status.is_valid() && self.position.to_move() == side
    }

    fn terminate(&mut self, transport: &mut dyn Transport) {
        self.state = SessionState::Terminating;
        transport.request_stop();
    }
}

impl MessageSink for SessionController {
    type Error = SessionError;

    fn on_message(&mut self, line: &str, transport: &mut dyn Transport) -> Result<(), SessionError> {
        if self.state == SessionState::Terminating {
            trace!("Shutting down, ignoring {:?}", line);
            return Ok(());
        }

        match Message::parse(line) {
            Message::Quit => {
                info!("Received quit");
                self.terminate(transport);
                Ok(())
            }
            Message::Position(token) => self.receive_position(token, transport),
            Message::Unknown(line) => {
                trace!("Ignoring {:?}", line);
                Ok(())
            }
        }
    }

    fn on_new_connection(&mut self, peer: PeerId, transport: &mut dyn Transport) {
        if let Some(token) = &self.last_broadcast {
            debug!("Catching up {}", peer);
            transport.send_to(peer, &Message::position_line(token));
        }
    }
}

/*====================================================================================================================*/
