//! Move ordering for the search.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use std::cmp::Reverse;
use shakmaty::{Chess, Color, Move, MoveList, Position};
use super::eval::{phase, piece_val, PHASE_LIMIT, PST_EG, PST_MG};
use super::hash::HashMove;

const PV_RANK: i32 = 1 << 30;
const HASH_RANK: i32 = 1 << 29;
const CAPTURE_RANK: i32 = 1 << 20;

/// Sorts a move list so that the most promising moves are searched first.
///
/// The order is: the principal-variation move, then the hash move, then captures by decreasing
/// MVV-LVA value, then the remaining moves by the decreasing piece-square gain of the moving
/// piece. The sort is stable, so ties keep the move generator's order.
pub fn order_moves(
    pos: &Chess,
    moves: &mut MoveList,
    pv_move: Option<&Move>,
    hash_move: Option<HashMove>,
) {
    let phase = phase(pos);
    let turn = pos.turn();

    moves.sort_by_key(|mv| {
        if pv_move == Some(mv) {
            return Reverse(PV_RANK);
        }
        if hash_move == Some(HashMove::from(mv)) {
            return Reverse(HASH_RANK);
        }
        if mv.is_capture() {
            return Reverse(CAPTURE_RANK + mvv_lva(mv));
        }

        Reverse(pst_gain(mv, turn, phase))
    });
}

/// Scores a capture as the value of the victim minus the value of the aggressor.
///
/// The king's value is zero, so king captures rank as pure victim value.
pub fn mvv_lva(mv: &Move) -> i32 {
    mv.capture().map_or(0, piece_val) - piece_val(mv.role())
}

/// The tapered piece-square gain of moving a piece from its origin to its destination.
fn pst_gain(mv: &Move, turn: Color, phase: i32) -> i32 {
    let piece = mv.role() as usize - 1;
    let flip = match turn {
        Color::White => 0,
        Color::Black => 56,
    };
    let from = mv.from().expect("INFALLIBLE") as usize ^ flip;
    let to = mv.to() as usize ^ flip;

    let mg = PST_MG[piece][to] - PST_MG[piece][from];
    let eg = PST_EG[piece][to] - PST_EG[piece][from];

    (mg*phase + eg*(PHASE_LIMIT - phase)) / PHASE_LIMIT
}

////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod test {
    use shakmaty::CastlingMode;
    use shakmaty::fen::Fen;
    use shakmaty::uci::UciMove;
    use super::*;

    fn position(fen: &str) -> Chess {
        fen.parse::<Fen>().unwrap().into_position(CastlingMode::Standard).unwrap()
    }

    fn find(pos: &Chess, uci: &str) -> Move {
        uci.parse::<UciMove>().unwrap().to_move(pos).unwrap()
    }

    #[test]
    fn pv_move_comes_first() {
        let pos = Chess::default();
        let pv = find(&pos, "b1a3");

        let mut moves = pos.legal_moves();
        order_moves(&pos, &mut moves, Some(&pv), None);
        assert_eq!(moves[0], pv);
    }

    #[test]
    fn hash_move_follows_the_pv_move() {
        let pos = Chess::default();
        let pv = find(&pos, "b1a3");
        let hash = find(&pos, "h2h3");

        let mut moves = pos.legal_moves();
        order_moves(&pos, &mut moves, Some(&pv), Some(HashMove::from(&hash)));
        assert_eq!(moves[0], pv);
        assert_eq!(moves[1], hash);
    }

    #[test]
    fn captures_by_descending_victim_value() {
        // both the c5 pawn and the d2 rook can take the queen, and the rook can take the b2 pawn
        let pos = position("4k3/8/3q4/2P5/8/8/1p1R4/4K3 w - - 0 1");

        let mut moves = pos.legal_moves();
        order_moves(&pos, &mut moves, None, None);

        assert_eq!(moves[0], find(&pos, "c5d6"));
        assert_eq!(moves[1], find(&pos, "d2d6"));
        assert_eq!(moves[2], find(&pos, "d2b2"));
        assert!(!moves[3].is_capture());
    }

    #[test]
    fn quiet_moves_by_piece_square_gain() {
        let pos = Chess::default();

        let mut moves = pos.legal_moves();
        order_moves(&pos, &mut moves, None, None);

        let phase = phase(&pos);
        let gains: Vec<i32> = moves.iter()
            .map(|mv| pst_gain(mv, Color::White, phase))
            .collect();
        assert!(gains.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn ordering_is_deterministic() {
        let pos = position("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");

        let mut first = pos.legal_moves();
        order_moves(&pos, &mut first, None, None);
        let mut second = pos.legal_moves();
        order_moves(&pos, &mut second, None, None);
        assert_eq!(first, second);
    }

    #[test]
    fn black_gains_use_flipped_squares() {
        let white = Chess::default();
        let black = position("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1");

        let phase = phase(&black);
        assert_eq!(
            pst_gain(&find(&white, "e2e4"), Color::White, phase),
            pst_gain(&find(&black, "e7e5"), Color::Black, phase),
        );
    }
}
