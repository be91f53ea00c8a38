//! The engine side of the client protocol.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use crate::engine::Thinking;
use crate::game::Game;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// An action that should be taken regarding the current search.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchAction {
    /// The engine should stop searching and report the best move found so far.
    Stop,

    /// The engine should stop searching and report nothing; the position or session no longer
    /// exists in the form that was being searched.
    Abort,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Trait used for structures that implement the engine side of a chess protocol.
pub trait Protocol {
    /// Waits until the engine should begin searching or should exit.
    ///
    /// Returns true if the engine should begin searching, or false if it should exit.
    fn wait_for_search(&mut self) -> bool;

    /// Returns true if the client started a new game since the last call. The engine discards
    /// state carried between searches, such as the transposition table, when this is the case.
    fn take_new_game(&mut self) -> bool;

    /// Sends the engine's move to the client once a search has been stopped.
    fn send_move(&mut self, thinking: &Thinking);

    /// Sends the engine's thinking for one completed search depth to the client.
    fn send_thinking(&mut self, thinking: &Thinking);

    /// Allows the protocol to check the input during a search.
    ///
    /// If the search should end for any reason, returns how it should end.
    fn check_input(&mut self) -> Option<SearchAction>;

    /// Returns the current state of the game.
    fn game(&self) -> &Game;
}

pub mod io;
pub mod uci;
