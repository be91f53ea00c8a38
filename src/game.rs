//! The state of the game being played.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::fmt;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::zobrist::{Zobrist64, ZobristHash};

/// The result of a fallible game operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the Zobrist key of a position.
pub fn zobrist_key(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// A game: the current position together with the Zobrist keys of every position reached by the
/// moves played to get there.
///
/// The key history is what makes repetition detection possible: the search treats any position
/// whose key already occurred as drawn.
#[derive(Debug, Clone)]
pub struct Game {
    position: Chess,
    keys: Vec<u64>,
}

impl Game {
    /// Creates a game at the standard starting position.
    pub fn new() -> Game {
        let position = Chess::default();
        let keys = vec![ zobrist_key(&position) ];

        Game { position, keys }
    }

    /// Creates a game starting at the position given in Forsyth-Edwards Notation.
    pub fn from_fen(fen: &str) -> Result<Game> {
        let position = fen.parse::<Fen>()
            .map_err(|_| Error::InvalidFen(fen.to_string()))?
            .into_position(CastlingMode::Standard)
            .map_err(|_| Error::InvalidFen(fen.to_string()))?;
        let keys = vec![ zobrist_key(&position) ];

        Ok(Game { position, keys })
    }

    /// Plays a move given in long algebraic notation (eg. `e2e4` or `e7e8q`).
    pub fn make_move(&mut self, mv: &str) -> Result<()> {
        let uci = mv.parse::<UciMove>()
            .map_err(|_| Error::IllegalMove(mv.to_string()))?;
        let mv = uci.to_move(&self.position)
            .map_err(|_| Error::IllegalMove(mv.to_string()))?;

        self.position.play_unchecked(&mv);
        self.keys.push(zobrist_key(&self.position));

        Ok(())
    }

    /// Returns the current position.
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Returns the Zobrist keys of every position the game passed through before the current
    /// one, oldest first.
    pub fn prior_keys(&self) -> &[u64] {
        &self.keys[..self.keys.len() - 1]
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// An error raised when setting up or updating a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The given string is not a valid FEN for a legal position.
    InvalidFen(String),
    /// The given string is not a legal move in the current position.
    IllegalMove(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFen(fen) => write!(f, "invalid position: {}", fen),
            Error::IllegalMove(mv) => write!(f, "illegal move: {}", mv),
        }
    }
}

impl std::error::Error for Error { }

////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_game_has_no_prior_positions() {
        let game = Game::new();
        assert!(game.prior_keys().is_empty());
        assert_eq!(zobrist_key(game.position()), zobrist_key(&Chess::default()));
    }

    #[test]
    fn moves_extend_the_key_history() {
        let mut game = Game::new();
        game.make_move("e2e4").unwrap();
        game.make_move("e7e5").unwrap();

        assert_eq!(game.prior_keys().len(), 2);
        assert_eq!(game.prior_keys()[0], zobrist_key(&Chess::default()));
    }

    #[test]
    fn returning_to_an_earlier_position_repeats_its_key() {
        let mut game = Game::new();
        for mv in &["g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_move(mv).unwrap();
        }

        assert!(game.prior_keys().contains(&zobrist_key(game.position())));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            Game::from_fen("not a position").err(),
            Some(Error::InvalidFen("not a position".to_string())),
        );

        let mut game = Game::new();
        assert_eq!(game.make_move("e2e5"), Err(Error::IllegalMove("e2e5".to_string())));
        assert_eq!(game.make_move("scrambled"), Err(Error::IllegalMove("scrambled".to_string())));
        assert!(game.prior_keys().is_empty());
    }

    #[test]
    fn accepts_promotions() {
        let mut game = Game::from_fen("4k3/6P1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        game.make_move("g7g8q").unwrap();
        assert_eq!(game.prior_keys().len(), 1);
    }
}
