//! Implements the [Universal Chess Interface](https://www.chessprogramming.org/UCI), commonly
//! known as UCI.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::mpsc::TryRecvError;
use log::{debug, error};
use lazy_static::lazy_static;
use regex::{Regex, RegexSet};
use shakmaty::Move;
use shakmaty::uci::UciMove;
use super::{io, Protocol, SearchAction};
use crate::engine::Thinking;
use crate::game::Game;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Current state of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Searching,
    Quitting,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Implementation of the UCI protocol.
#[derive(Debug)]
pub struct Uci {
    client: io::Client,

    game: Game,

    state: State,
    new_game: bool,
}

impl Uci {
    /// Starts the UCI interface.
    pub fn new() -> Self {
        Uci {
            client: io::Client::connect(),
            game: Game::new(),
            state: State::Idle,
            new_game: false,
        }
    }

    /// Handles a command received while no search is running.
    fn handle_idle(&mut self, line: &str) {
        use Command::*;

        match line.parse() {
            Ok(cmd) => match cmd {
                Uci => identify(),
                IsReady => Response::ReadyOk.send(),
                NewGame => {
                    self.game = Game::new();
                    self.new_game = true;
                },
                Position{ fen, moves } => self.set_position(fen, moves),
                Go => self.state = State::Searching,
                Stop => { },
                Quit => self.state = State::Quitting,
            },
            Err(_) => debug!("ignoring unknown command: {}", line),
        }
    }

    /// Replaces the game with the given position and move list.
    ///
    /// A position that cannot be parsed leaves the game untouched. Moves are applied as far as
    /// they remain legal.
    fn set_position(&mut self, fen: Option<String>, moves: Vec<String>) {
        let mut game = match fen {
            Some(fen) => match Game::from_fen(&fen) {
                Ok(game) => game,
                Err(err) => {
                    debug!("{}", err);
                    return;
                },
            },
            None => Game::new(),
        };

        for mv in &moves {
            if let Err(err) = game.make_move(mv) {
                debug!("{}", err);
                break;
            }
        }

        self.game = game;
    }
}

impl Protocol for Uci {
    fn wait_for_search(&mut self) -> bool {
        if self.state == State::Searching {
            self.state = State::Idle;
        }

        while self.state == State::Idle {
            match self.client.recv() {
                Ok(line) => self.handle_idle(&line),
                Err(_) => {
                    debug!("client disconnected");
                    self.state = State::Quitting;
                },
            }
        }

        self.state == State::Searching
    }

    fn take_new_game(&mut self) -> bool {
        std::mem::replace(&mut self.new_game, false)
    }

    fn send_move(&mut self, thinking: &Thinking) {
        let best_move = match thinking.best_move() {
            Some(mv) => UciMove::from_standard(mv).to_string(),
            None => "0000".to_string(),
        };

        Response::BestMove(best_move).send();
    }

    fn send_thinking(&mut self, thinking: &Thinking) {
        Response::Info {
            depth: thinking.depth(),
            score: thinking.score(),
            time: thinking.time().as_millis() as u64,
            nodes: thinking.nodes(),
            nps: thinking.nps(),
            pv: pv_string(thinking.pv()),
        }.send();
    }

    fn check_input(&mut self) -> Option<SearchAction> {
        use Command::*;

        match self.client.try_recv() {
            Ok(line) => {
                match line.parse() {
                    Ok(cmd) => match cmd {
                        Uci => identify(),
                        IsReady => Response::ReadyOk.send(),
                        NewGame => {
                            self.game = Game::new();
                            self.new_game = true;
                            self.state = State::Idle;
                            return Some(SearchAction::Abort);
                        },
                        Position{ fen, moves } => {
                            self.set_position(fen, moves);
                            self.state = State::Idle;
                            return Some(SearchAction::Abort);
                        },
                        Go => { },
                        Stop => {
                            self.state = State::Idle;
                            return Some(SearchAction::Stop);
                        },
                        Quit => {
                            self.state = State::Quitting;
                            return Some(SearchAction::Abort);
                        },
                    },
                    Err(_) => debug!("ignoring unknown command: {}", line),
                }
            },
            Err(TryRecvError::Disconnected) => {
                error!("lost connection to client");
                self.state = State::Quitting;
                return Some(SearchAction::Abort);
            },
            Err(TryRecvError::Empty) => { },
        }

        None
    }

    fn game(&self) -> &Game {
        &self.game
    }
}

impl Default for Uci {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends the engine identification expected in response to `uci`.
fn identify() {
    Response::IdName(format!("Pewter {}", env!("CARGO_PKG_VERSION"))).send();
    Response::IdAuthor("Mike Leany".to_string()).send();
    Response::UciOk.send();
}

/// Formats a variation as space-separated long algebraic notation.
fn pv_string(pv: &[Move]) -> String {
    pv.iter()
        .map(|mv| UciMove::from_standard(mv).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Commands which can be sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tells the engine to use the UCI protocol and identify itself.
    ///
    /// ```text
    /// uci
    /// ```
    Uci,

    /// Asks whether the engine is ready for more input.
    ///
    /// ```text
    /// isready
    /// ```
    IsReady,

    /// Tells the engine that the next search belongs to a new game.
    ///
    /// ```text
    /// ucinewgame
    /// ```
    NewGame,

    /// Sets the position to search.
    ///
    /// ```text
    /// position startpos [moves <move>...]
    /// position fen <fen> [moves <move>...]
    /// ```
    ///
    /// `fen` is a six-field position in Forsyth-Edwards Notation; `startpos` is the standard
    /// starting position. The moves, if given, are played out from that position.
    Position {
        /// The position in Forsyth-Edwards Notation, or `None` for the starting position.
        fen: Option<String>,
        /// Moves to play from the given position, in long algebraic notation.
        moves: Vec<String>,
    },

    /// Begins searching the current position.
    ///
    /// ```text
    /// go
    /// ```
    ///
    /// Search arguments are not honored: the search deepens until interrupted.
    Go,

    /// Ends the current search and asks for the best move found.
    ///
    /// ```text
    /// stop
    /// ```
    Stop,

    /// Tells the engine to exit.
    ///
    /// ```text
    /// quit
    /// ```
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Command::*;

        match self {
            Uci => "uci".fmt(f),
            IsReady => "isready".fmt(f),
            NewGame => "ucinewgame".fmt(f),
            Position{ fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => write!(f, "position startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            },
            Go => "go".fmt(f),
            Stop => "stop".fmt(f),
            Quit => "quit".fmt(f),
        }
    }
}

impl FromStr for Command {
    type Err = UciError;

    fn from_str(s: &str) -> Result<Self, UciError> {
        use Command::*;

        if let Some(ind) = COMMAND_SET.matches(s).iter().next() {
            let args = COMMAND_VEC[ind].captures(s).expect("INFALLIBLE");

            match ind {
                0 => Ok(Uci),
                1 => Ok(IsReady),
                2 => Ok(NewGame),
                3 => {
                    let moves = match args.get(1) {
                        Some(list) => list.as_str().split_whitespace()
                            .map(str::to_string)
                            .collect(),
                        None => Vec::new(),
                    };

                    Ok(Position{ fen: None, moves })
                },
                4 => {
                    let fen = args.get(1).expect("INFALLIBLE").as_str().to_string();
                    let moves = match args.get(2) {
                        Some(list) => list.as_str().split_whitespace()
                            .map(str::to_string)
                            .collect(),
                        None => Vec::new(),
                    };

                    Ok(Position{ fen: Some(fen), moves })
                },
                5 => Ok(Go),
                6 => Ok(Stop),
                7 => Ok(Quit),
                _ => unreachable!(),
            }
        } else {
            Err(UciError)
        }
    }
}

const COMMANDS: [&str; 8] = [
    r"^uci\s*$",
    r"^isready\b",
    r"^ucinewgame\b",
    r"^position\s+startpos(?:\s+moves\s+(.+))?\s*$",
    r"^position\s+fen\s+((?:\S+\s+){5}\S+)(?:\s+moves\s+(.+))?\s*$",
    r"^go\b",
    r"^stop\b",
    r"^quit\b",
];

lazy_static! {
    static ref COMMAND_SET: RegexSet = RegexSet::new(&COMMANDS).expect("INFALLIBLE");
    static ref COMMAND_VEC: Vec<Regex> = {
        let mut cmd_vec = Vec::new();
        for cmd in &COMMANDS {
            cmd_vec.push(Regex::new(cmd).expect("INFALLIBLE"));
        }
        cmd_vec
    };
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Responses from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The name of the engine, sent in response to the `uci` command.
    ///
    /// ```text
    /// id name NAME
    /// ```
    IdName(String),

    /// The author of the engine, sent in response to the `uci` command.
    ///
    /// ```text
    /// id author AUTHOR
    /// ```
    IdAuthor(String),

    /// Ends the engine identification sent in response to the `uci` command.
    ///
    /// ```text
    /// uciok
    /// ```
    UciOk,

    /// Response to the `isready` command indicating that the engine is ready for the next
    /// command.
    ///
    /// ```text
    /// readyok
    /// ```
    ReadyOk,

    /// The engine's current line of thinking, sent once per completed search depth.
    ///
    /// ```text
    /// info depth DEPTH score cp SCORE time TIME nodes NODES nps NPS pv MOVE...
    /// ```
    Info {
        /// The depth of the completed search iteration.
        depth: i32,
        /// The score of the principal variation in centipawns, for the side to move.
        score: i32,
        /// Milliseconds spent searching since the `go` command.
        time: u64,
        /// The number of nodes searched since the `go` command.
        nodes: u64,
        /// The average number of nodes searched per second.
        nps: u64,
        /// The moves of the principal variation, space separated, in long algebraic notation.
        pv: String,
    },

    /// The best move found, sent once a search is stopped.
    ///
    /// ```text
    /// bestmove MOVE
    /// ```
    BestMove(String),
}

impl Response {
    fn send(&self) {
        io::Client::send(&self.to_string());
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Response::*;

        match self {
            IdName(name) => write!(f, "id name {}", name),
            IdAuthor(author) => write!(f, "id author {}", author),
            UciOk => "uciok".fmt(f),
            ReadyOk => "readyok".fmt(f),
            Info{ depth, score, time, nodes, nps, pv } =>
                write!(f, "info depth {} score cp {} time {} nodes {} nps {} pv {}",
                    depth, score, time, nodes, nps, pv),
            BestMove(mv) => write!(f, "bestmove {}", mv),
        }
    }
}

impl FromStr for Response {
    type Err = UciError;

    fn from_str(s: &str) -> Result<Self, UciError> {
        use Response::*;

        if let Some(ind) = RESPONSE_SET.matches(s).iter().next() {
            let args = RESPONSE_VEC[ind].captures(s).expect("INFALLIBLE");

            match ind {
                0 => Ok(IdName(args.get(1).expect("INFALLIBLE").as_str().to_string())),
                1 => Ok(IdAuthor(args.get(1).expect("INFALLIBLE").as_str().to_string())),
                2 => Ok(UciOk),
                3 => Ok(ReadyOk),
                4 => {
                    let depth = args.get(1).expect("INFALLIBLE").as_str().parse()?;
                    let score = args.get(2).expect("INFALLIBLE").as_str().parse()?;
                    let time = args.get(3).expect("INFALLIBLE").as_str().parse()?;
                    let nodes = args.get(4).expect("INFALLIBLE").as_str().parse()?;
                    let nps = args.get(5).expect("INFALLIBLE").as_str().parse()?;
                    let pv = args.get(6).expect("INFALLIBLE").as_str().trim().to_string();

                    Ok(Info{ depth, score, time, nodes, nps, pv })
                },
                5 => Ok(BestMove(args.get(1).expect("INFALLIBLE").as_str().to_string())),
                _ => unreachable!(),
            }
        } else {
            Err(UciError)
        }
    }
}

const RESPONSES: [&str; 6] = [
    r"^id\s+name\s+(.+?)\s*$",
    r"^id\s+author\s+(.+?)\s*$",
    r"^uciok\s*$",
    r"^readyok\s*$",
    r"^info\s+depth\s+(\d+)\s+score\s+cp\s+(-?\d+)\s+time\s+(\d+)\s+nodes\s+(\d+)\s+nps\s+(\d+)\s+pv((?:\s+\S+)*)\s*$",
    r"^bestmove\s+(\S+)\s*$",
];

lazy_static! {
    static ref RESPONSE_SET: RegexSet = RegexSet::new(&RESPONSES).expect("INFALLIBLE");
    static ref RESPONSE_VEC: Vec<Regex> = {
        let mut resp_vec = Vec::new();
        for resp in &RESPONSES {
            resp_vec.push(Regex::new(resp).expect("INFALLIBLE"));
        }
        resp_vec
    };
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Error type for UCI.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UciError;

impl From<ParseIntError> for UciError {
    fn from(_: ParseIntError) -> UciError {
        UciError
    }
}
