//! The engine: an iterative-deepening negamax search.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::cmp::Reverse;
use std::time::{Duration, Instant};
use log::debug;
use shakmaty::{Chess, Color, Move, Position, Role};
use crate::game::zobrist_key;
use crate::protocol::{Protocol, SearchAction};

mod eval;
mod hash;
mod order;

use eval::{evaluate, piece_val, EVAL_LIMIT};
use hash::{HashEntry, HashMove, HashTable};

/// Null-move pruning is tried at this depth and above, and reduces the search by this many plies.
const NULL_MOVE_DEPTH: i32 = 4;

/// How many nodes are searched between checks for new input.
const POLL_INTERVAL: u64 = 1024;

////////////////////////////////////////////////////////////////////////////////////////////////////
/// Thinking output: the result of one completed search iteration.
#[derive(Debug, Clone)]
pub struct Thinking {
    score: i32,
    depth: i32,
    time: Duration,
    nodes: u64,
    pv: Vec<Move>,
}

impl Thinking {
    fn new() -> Self {
        Thinking {
            score: 0,
            depth: 0,
            time: Duration::from_secs(0),
            nodes: 0,
            pv: Vec::new(),
        }
    }

    /// Returns the score of the principal variation, in centipawns for the side to move.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Returns the search depth that was reached.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Returns the amount of time used for the search.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Returns the number of nodes searched.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Returns the average number of nodes searched per second, or zero if no measurable time
    /// has passed.
    pub fn nps(&self) -> u64 {
        let millis = self.time.as_millis() as u64;

        if millis > 0 {
            self.nodes * 1000 / millis
        } else {
            0
        }
    }

    /// Returns the principal variation.
    pub fn pv(&self) -> &[Move] {
        &self.pv
    }

    /// Returns the best move found in the search.
    pub fn best_move(&self) -> Option<&Move> {
        self.pv.first()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
/// The engine.
///
/// Owns the protocol connection to the client and the transposition table, which persists from
/// one search to the next until the client starts a new game.
#[derive(Debug)]
pub struct Engine<T> where T: Protocol {
    protocol: T,
    table: HashTable,

    nodes: u64,
    start_time: Instant,
    action: Option<SearchAction>,
    keys: Vec<u64>,
}

impl<T> Engine<T> where T: Protocol {
    /// Creates a new engine with a transposition table of `hash_size` bytes.
    pub fn new(protocol: T, hash_size: usize) -> Self {
        Engine {
            protocol,
            table: HashTable::new(hash_size),
            nodes: 0,
            start_time: Instant::now(),
            action: None,
            keys: Vec::new(),
        }
    }

    /// Runs the engine until the client disconnects or asks it to quit.
    pub fn run(&mut self) {
        while self.protocol.wait_for_search() {
            if self.protocol.take_new_game() {
                self.table.clear();
            }

            self.search_root();
        }
    }

    /// Searches the current position by iterative deepening.
    ///
    /// There is no depth limit: one `info` line is emitted per completed depth until the client
    /// interrupts the search. The principal variation of each iteration seeds the move ordering
    /// of the next. An interrupted iteration is discarded, and if the client asked the engine to
    /// stop (rather than abandon the position), the best move of the last completed iteration is
    /// sent.
    fn search_root(&mut self) {
        let pos = self.protocol.game().position().clone();
        self.keys = self.protocol.game().prior_keys().to_vec();
        self.nodes = 0;
        self.action = None;
        self.start_time = Instant::now();
        debug!("searching from {} prior positions", self.keys.len());

        let mut thinking = Thinking::new();
        for depth in 1.. {
            let seed = thinking.pv.clone();

            match self.negamax(&pos, depth, -EVAL_LIMIT, EVAL_LIMIT, &seed) {
                Some((score, pv)) => {
                    thinking = Thinking {
                        score,
                        depth,
                        time: self.start_time.elapsed(),
                        nodes: self.nodes,
                        pv,
                    };
                    self.protocol.send_thinking(&thinking);
                },
                None => break,
            }
        }

        if self.action == Some(SearchAction::Stop) {
            thinking.time = self.start_time.elapsed();
            thinking.nodes = self.nodes;
            self.protocol.send_move(&thinking);
        }
    }

    /// Searches `pos` to `depth` looking for a score within `(alpha, beta)`, returning the score
    /// for the side to move and the principal variation. The score is exact whenever it falls
    /// inside the window, and a bound on the true score otherwise.
    ///
    /// Returns `None` if the search was interrupted; nothing computed on the way out of an
    /// interrupted search is meaningful.
    fn negamax(&mut self, pos: &Chess, depth: i32, mut alpha: i32, beta: i32, pv_seed: &[Move])
        -> Option<(i32, Vec<Move>)>
    {
        if self.check_stop() {
            return None;
        }

        if depth == 0 {
            let score = self.quiesce(pos, alpha, beta)?;
            return Some((score, Vec::new()));
        }

        if pos.halfmoves() >= 100 {
            let score = if pos.is_checkmate() { -EVAL_LIMIT } else { 0 };
            return Some((score, Vec::new()));
        }

        let zobrist = zobrist_key(pos);
        if self.keys.contains(&zobrist) || pos.is_insufficient_material() {
            return Some((0, Vec::new()));
        }

        let mut hash_move = None;
        if let Some(entry) = self.table.get(zobrist) {
            if i32::from(entry.depth()) >= depth {
                return Some((entry.score(), Vec::new()));
            }
            hash_move = entry.best_move();
        }

        if depth >= NULL_MOVE_DEPTH && !pos.is_check() {
            if let Ok(skipped) = pos.clone().swap_turn() {
                self.keys.push(zobrist);
                let result = self.negamax(&skipped, depth - NULL_MOVE_DEPTH, -beta, -beta + 1, &[]);
                self.keys.pop();

                let score = -result?.0;
                if score >= beta {
                    return Some((score, Vec::new()));
                }
            }
        }

        let mut moves = pos.legal_moves();
        if moves.is_empty() {
            let score = if pos.is_check() { -EVAL_LIMIT } else { 0 };
            return Some((score, Vec::new()));
        }
        order::order_moves(pos, &mut moves, pv_seed.first(), hash_move);

        let mut best = -EVAL_LIMIT;
        let mut pv = Vec::new();
        for (n, mv) in moves.iter().enumerate() {
            let mut next = pos.clone();
            next.play_unchecked(mv);
            let seed = if pv_seed.first() == Some(mv) { &pv_seed[1..] } else { &[][..] };

            self.keys.push(zobrist);
            let result = self.search_move(&next, depth, n + 1, alpha, beta, seed);
            self.keys.pop();
            let (score, child_pv) = result?;

            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                }
                pv.clear();
                pv.push(mv.clone());
                pv.extend(child_pv);
            }
            if score >= beta {
                return Some((best, pv));
            }
        }

        let best_move = pv.first().map(HashMove::from);
        self.table.insert(HashEntry::new(zobrist, depth as i16, best, best_move));

        Some((best, pv))
    }

    /// Searches the position reached by the `count`th move of the parent node, applying late-move
    /// reduction, and returns the score from the parent's point of view.
    ///
    /// At depth 2 and above, the move is first searched `round(ln(depth)·ln(count)/2)` plies
    /// shallower than normal; if that search comes back above `alpha` the move is re-searched at
    /// full depth before being trusted.
    fn search_move(
        &mut self,
        pos: &Chess,
        depth: i32,
        count: usize,
        alpha: i32,
        beta: i32,
        pv_seed: &[Move],
    ) -> Option<(i32, Vec<Move>)> {
        if depth >= 2 {
            let reduction = reduction(depth, count).min(depth - 1);

            let (score, child_pv) = self.negamax(pos, depth - 1 - reduction, -beta, -alpha, pv_seed)?;
            if reduction > 0 && -score > alpha {
                let (score, child_pv) = self.negamax(pos, depth - 1, -beta, -alpha, pv_seed)?;
                return Some((-score, child_pv));
            }

            Some((-score, child_pv))
        } else {
            let (score, child_pv) = self.negamax(pos, depth - 1, -beta, -alpha, pv_seed)?;
            Some((-score, child_pv))
        }
    }

    /// Searches the captures from `pos` until the position is quiet, returning a score for the
    /// side to move. Standing pat is always an option, so the score is never worse than the
    /// static evaluation.
    fn quiesce(&mut self, pos: &Chess, mut alpha: i32, beta: i32) -> Option<i32> {
        if self.check_stop() {
            return None;
        }

        let stand_pat = match pos.turn() {
            Color::White => evaluate(pos),
            Color::Black => -evaluate(pos),
        };

        if stand_pat >= beta {
            return Some(stand_pat);
        }
        // no capture can close a gap of more than a queen
        if stand_pat < alpha - piece_val(Role::Queen) {
            return Some(alpha);
        }

        let mut best = stand_pat;
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut captures = pos.capture_moves();
        captures.sort_by_key(|mv| Reverse(order::mvv_lva(mv)));

        for mv in &captures {
            let mut next = pos.clone();
            next.play_unchecked(mv);

            let score = -self.quiesce(&next, -beta, -alpha)?;

            if score >= beta {
                return Some(score);
            }
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        Some(best)
    }

    /// Counts a node, and checks for input at regular intervals. Should be called exactly once
    /// per node. Returns true once the search should unwind.
    fn check_stop(&mut self) -> bool {
        self.nodes += 1;

        if self.action.is_none() && self.nodes % POLL_INTERVAL == 0 {
            self.action = self.protocol.check_input();
        }

        self.action.is_some()
    }
}

/// The late-move reduction for the `count`th move searched at the given depth.
fn reduction(depth: i32, count: usize) -> i32 {
    ((depth as f64).ln() * (count as f64).ln() / 2.0).round() as i32
}

////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod test {
    use crate::game::Game;
    use super::*;

    /// A protocol stub for driving the search directly.
    struct Mute(Game);

    impl Protocol for Mute {
        fn wait_for_search(&mut self) -> bool { false }
        fn take_new_game(&mut self) -> bool { false }
        fn send_move(&mut self, _: &Thinking) { }
        fn send_thinking(&mut self, _: &Thinking) { }
        fn check_input(&mut self) -> Option<SearchAction> { None }
        fn game(&self) -> &Game { &self.0 }
    }

    fn engine(fen: &str) -> Engine<Mute> {
        Engine::new(Mute(Game::from_fen(fen).unwrap()), 1 << 16)
    }

    fn search(engine: &mut Engine<Mute>, depth: i32) -> (i32, Vec<Move>) {
        let pos = engine.protocol.game().position().clone();
        engine.keys = engine.protocol.game().prior_keys().to_vec();
        engine.negamax(&pos, depth, -EVAL_LIMIT, EVAL_LIMIT, &[]).unwrap()
    }

    #[test]
    fn checkmate_scores_the_limit() {
        // the final position of the fool's mate
        let mut engine = engine("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");

        for depth in 1..4 {
            let (score, pv) = search(&mut engine, depth);
            assert_eq!(score, -EVAL_LIMIT);
            assert!(pv.is_empty());
        }
    }

    #[test]
    fn stalemate_scores_zero() {
        let mut engine = engine("7k/8/5KQ1/8/8/8/8/8 b - - 0 1");

        let (score, pv) = search(&mut engine, 3);
        assert_eq!(score, 0);
        assert!(pv.is_empty());
    }

    #[test]
    fn finds_mate_in_one() {
        let mut engine = engine("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1");

        let (score, pv) = search(&mut engine, 2);
        assert_eq!(score, EVAL_LIMIT);
        assert_eq!(pv[0].to_uci(shakmaty::CastlingMode::Standard).to_string(), "a1a8");
    }

    #[test]
    fn quiescence_resolves_hanging_pieces() {
        // white wins the undefended queen with rook takes d5
        let mut engine = engine("3qk3/8/8/3q4/8/8/3R4/3RK3 w - - 0 1");

        let score = {
            let pos = engine.protocol.game().position().clone();
            engine.quiesce(&pos, -EVAL_LIMIT, EVAL_LIMIT).unwrap()
        };
        assert!(score > 300, "score {} should reflect winning a queen", score);
    }

    #[test]
    fn repeated_position_is_a_draw() {
        let mut game = Game::new();
        for mv in &["g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_move(mv).unwrap();
        }
        let mut engine = Engine::new(Mute(game), 1 << 16);

        let (score, _) = search(&mut engine, 4);
        assert_eq!(score, 0);
    }

    #[test]
    fn search_is_deterministic() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3";

        let (first_score, first_pv) = search(&mut engine(fen), 4);
        let (second_score, second_pv) = search(&mut engine(fen), 4);
        assert_eq!(first_score, second_score);
        assert_eq!(first_pv, second_pv);
    }

    #[test]
    fn pv_replays_as_legal_moves() {
        let mut engine = engine("r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3");

        let (_, pv) = search(&mut engine, 4);
        assert!(!pv.is_empty());

        let mut pos = engine.protocol.game().position().clone();
        for mv in &pv {
            assert!(pos.legal_moves().contains(mv), "{:?} is not legal", mv);
            pos.play_unchecked(mv);
        }
    }

    #[test]
    fn search_leaves_the_position_untouched() {
        let mut engine = engine("r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3");

        let before = engine.protocol.game().position().clone();
        let _ = search(&mut engine, 4);
        let after = engine.protocol.game().position();
        assert_eq!(zobrist_key(after), zobrist_key(&before));
        assert_eq!(after.halfmoves(), before.halfmoves());
        assert_eq!(after.fullmoves(), before.fullmoves());
    }

    #[test]
    fn root_entry_reaches_the_searched_depth() {
        let mut engine = engine("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");

        let depth = 5;
        let _ = search(&mut engine, depth);
        let zobrist = zobrist_key(engine.protocol.game().position());
        let entry = engine.table.get(zobrist).unwrap();
        assert!(i32::from(entry.depth()) >= depth);
    }

    #[test]
    fn pv_spans_the_search_depth() {
        // a quiet king-and-pawn position with no tactics to cut the line short
        let mut engine = engine("8/5pk1/6p1/8/8/6P1/5PK1/8 w - - 0 1");

        let depth = 6;
        let (_, pv) = search(&mut engine, depth);
        assert!(
            pv.len() as i32 >= depth - 2,
            "pv of length {} should approach depth {}", pv.len(), depth,
        );
    }

    #[test]
    fn deeper_search_prefers_the_pawn_up_endgame() {
        let mut engine = engine("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");

        let (score, _) = search(&mut engine, 6);
        assert!(score >= 100, "score {} should show the extra pawn", score);
    }

    #[test]
    fn reductions_grow_slowly() {
        assert_eq!(reduction(2, 1), 0);
        assert_eq!(reduction(2, 2), 0);
        assert_eq!(reduction(4, 4), 1);
        assert_eq!(reduction(8, 20), 3);
        assert!(reduction(3, 30) <= 2);
    }
}
