//! Tapered evaluation of a position.
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////
use shakmaty::{Chess, Color, Piece, Position, Role};

/// Upper bound on the magnitude of any score returned by the search.
pub const EVAL_LIMIT: i32 = 31_800;

/// The game phase of a full board (32 pieces), and the divisor of the taper.
pub const PHASE_LIMIT: i32 = 30;

const PIECE_VAL: [i32; 6] = [ 100, 305, 333, 563, 950, 0 ];

/// Middle-game piece-square tables, indexed by piece and then square, from white's point of view
/// with square 0 being a1. Black pieces flip the rank of the square (`square ^ 56`) before lookup.
///
/// The pawn tables are intentionally not mirrored between the two wings.
pub const PST_MG: [[i32; 64]; 6] = [
    [ // Pawn
      //  a    b    c    d    e    f    g    h
          0,   0,   0,   0,   0,   0,   0,   0, // 1
          3,   5,   5, -12, -10,   8,  10,   4, // 2
          2,  -2,  -4,   2,   6,  -6,   4,   0, // 3
         -4,  -3,   6,  18,  20,   4,  -8,  -6, // 4
          4,   2,  10,  22,  24,   8,  -2,   0, // 5
         12,  16,  20,  28,  30,  22,  10,   8, // 6
         44,  48,  52,  56,  56,  50,  46,  40, // 7
          0,   0,   0,   0,   0,   0,   0,   0, // 8
    ],
    [ // Knight
      //  a    b    c    d    e    f    g    h
        -50, -38, -28, -24, -24, -28, -38, -50, // 1
        -36, -18,  -6,   0,   0,  -6, -18, -36, // 2
        -26,  -4,  10,  14,  14,  10,  -4, -26, // 3
        -22,   2,  16,  24,  24,  16,   2, -22, // 4
        -20,   4,  18,  26,  26,  18,   4, -20, // 5
        -24,   0,  14,  20,  20,  14,   0, -24, // 6
        -34, -14,  -2,   4,   4,  -2, -14, -34, // 7
        -48, -34, -24, -20, -20, -24, -34, -48, // 8
    ],
    [ // Bishop
      //  a    b    c    d    e    f    g    h
        -16,  -8, -12,  -6,  -6, -12,  -8, -16, // 1
         -6,   8,   2,   4,   4,   2,   8,  -6, // 2
         -4,  10,   8,   6,   6,   8,  10,  -4, // 3
         -2,   4,  10,  14,  14,  10,   4,  -2, // 4
          0,   6,  12,  14,  14,  12,   6,   0, // 5
         -2,   8,   8,   8,   8,   8,   8,  -2, // 6
         -8,   2,   0,   2,   2,   0,   2,  -8, // 7
        -14,  -6,  -8,  -4,  -4,  -8,  -6, -14, // 8
    ],
    [ // Rook
      //  a    b    c    d    e    f    g    h
        -10,  -6,   2,   8,   8,   2,  -6, -10, // 1
        -12,  -4,   0,   4,   4,   0,  -4, -12, // 2
        -10,  -2,   0,   2,   2,   0,  -2, -10, // 3
         -8,   0,   2,   4,   4,   2,   0,  -8, // 4
         -6,   2,   4,   6,   6,   4,   2,  -6, // 5
         -4,   4,   8,  10,  10,   8,   4,  -4, // 6
         10,  16,  20,  24,  24,  20,  16,  10, // 7
          6,   8,  10,  12,  12,  10,   8,   6, // 8
    ],
    [ // Queen
      //  a    b    c    d    e    f    g    h
        -20, -12,  -8,  -2,  -2,  -8, -12, -20, // 1
        -10,  -2,   2,   4,   4,   2,  -2, -10, // 2
         -8,   2,   6,   8,   8,   6,   2,  -8, // 3
         -4,   4,  10,  12,  12,  10,   4,  -4, // 4
         -4,   4,  10,  12,  12,  10,   4,  -4, // 5
         -8,   2,   6,   8,   8,   6,   2,  -8, // 6
        -10,  -2,   2,   4,   4,   2,  -2, -10, // 7
        -20, -12,  -8,  -2,  -2,  -8, -12, -20, // 8
    ],
    [ // King
      //  a    b    c    d    e    f    g    h
        288, 304, 276, 240, 240, 256, 312, 296, // 1
        276, 280, 252, 228, 228, 240, 284, 272, // 2
        248, 244, 228, 208, 208, 220, 248, 240, // 3
        232, 228, 212, 200, 200, 208, 228, 224, // 4
        224, 220, 208, 200, 200, 204, 220, 216, // 5
        220, 216, 206, 200, 200, 202, 214, 212, // 6
        212, 210, 204, 200, 200, 202, 208, 206, // 7
        208, 206, 202, 200, 200, 200, 204, 202, // 8
    ],
];

/// End-game piece-square tables, laid out like [`PST_MG`].
pub const PST_EG: [[i32; 64]; 6] = [
    [ // Pawn
      //  a    b    c    d    e    f    g    h
          0,   0,   0,   0,   0,   0,   0,   0, // 1
          6,   4,   4,   2,   2,   0,   2,   4, // 2
          6,   4,   2,   0,   0,   2,   2,   4, // 3
         10,   8,   4,   0,   0,   2,   6,   8, // 4
         18,  14,  10,   6,   6,   8,  12,  14, // 5
         34,  28,  22,  18,  18,  20,  26,  30, // 6
         72,  66,  60,  56,  56,  58,  64,  68, // 7
          0,   0,   0,   0,   0,   0,   0,   0, // 8
    ],
    [ // Knight
      //  a    b    c    d    e    f    g    h
        -40, -28, -20, -16, -16, -20, -28, -40, // 1
        -26, -12,  -4,   2,   2,  -4, -12, -26, // 2
        -18,   0,   8,  12,  12,   8,   0, -18, // 3
        -14,   4,  14,  18,  18,  14,   4, -14, // 4
        -14,   4,  14,  18,  18,  14,   4, -14, // 5
        -18,   0,   8,  12,  12,   8,   0, -18, // 6
        -26, -12,  -4,   2,   2,  -4, -12, -26, // 7
        -40, -28, -20, -16, -16, -20, -28, -40, // 8
    ],
    [ // Bishop
      //  a    b    c    d    e    f    g    h
        -12,  -6,  -8,  -4,  -4,  -8,  -6, -12, // 1
         -6,   0,   2,   2,   2,   2,   0,  -6, // 2
         -4,   2,   6,   8,   8,   6,   2,  -4, // 3
         -2,   4,   8,  10,  10,   8,   4,  -2, // 4
         -2,   4,   8,  10,  10,   8,   4,  -2, // 5
         -4,   2,   6,   8,   8,   6,   2,  -4, // 6
         -6,   0,   2,   2,   2,   2,   0,  -6, // 7
        -12,  -6,  -8,  -4,  -4,  -8,  -6, -12, // 8
    ],
    [ // Rook
      //  a    b    c    d    e    f    g    h
          0,   2,   4,   6,   6,   4,   2,   0, // 1
         -2,   0,   2,   4,   4,   2,   0,  -2, // 2
         -2,   0,   2,   4,   4,   2,   0,  -2, // 3
          0,   2,   4,   6,   6,   4,   2,   0, // 4
          2,   4,   6,   8,   8,   6,   4,   2, // 5
          4,   6,   8,  10,  10,   8,   6,   4, // 6
         12,  14,  16,  18,  18,  16,  14,  12, // 7
          8,  10,  12,  14,  14,  12,  10,   8, // 8
    ],
    [ // Queen
      //  a    b    c    d    e    f    g    h
        -16, -10,  -6,  -2,  -2,  -6, -10, -16, // 1
         -8,  -2,   2,   4,   4,   2,  -2,  -8, // 2
         -6,   2,   8,  10,  10,   8,   2,  -6, // 3
         -2,   6,  12,  16,  16,  12,   6,  -2, // 4
         -2,   6,  12,  16,  16,  12,   6,  -2, // 5
         -6,   2,   8,  10,  10,   8,   2,  -6, // 6
         -8,  -2,   2,   4,   4,   2,  -2,  -8, // 7
        -16, -10,  -6,  -2,  -2,  -6, -10, -16, // 8
    ],
    [ // King
      //  a    b    c    d    e    f    g    h
          4,  18,  28,  34,  34,  28,  18,   4, // 1
         16,  30,  42,  48,  48,  42,  30,  16, // 2
         26,  42,  56,  62,  62,  56,  42,  26, // 3
         32,  50,  64,  72,  72,  64,  50,  32, // 4
         32,  50,  64,  72,  72,  64,  50,  32, // 5
         26,  42,  56,  62,  62,  56,  42,  26, // 6
         16,  30,  42,  48,  48,  42,  30,  16, // 7
          4,  18,  28,  34,  34,  28,  18,   4, // 8
    ],
];

/// Returns the material value of a piece in centipawns. The king is worth zero.
pub fn piece_val(role: Role) -> i32 {
    PIECE_VAL[role as usize - 1]
}

/// Returns the game phase of a position: the number of pieces on the board beyond the two kings.
///
/// Ranges from 0 (bare kings) to [`PHASE_LIMIT`] (nothing captured yet).
pub fn phase(pos: &Chess) -> i32 {
    pos.board().occupied().count() as i32 - 2
}

/// Returns the estimated static score of a position, in centipawns from white's point of view.
///
/// Middle-game and end-game scores are computed from material and the piece-square tables, then
/// interpolated by the game phase using integer arithmetic.
pub fn evaluate(pos: &Chess) -> i32 {
    let board = pos.board();
    let mut mg = 0;
    let mut eg = 0;

    for &role in &Role::ALL {
        let piece = role as usize - 1;

        for sq in board.by_piece(Piece { color: Color::White, role }) {
            let sq = sq as usize;
            mg += PIECE_VAL[piece] + PST_MG[piece][sq];
            eg += PIECE_VAL[piece] + PST_EG[piece][sq];
        }

        for sq in board.by_piece(Piece { color: Color::Black, role }) {
            let sq = sq as usize ^ 56;
            mg -= PIECE_VAL[piece] + PST_MG[piece][sq];
            eg -= PIECE_VAL[piece] + PST_EG[piece][sq];
        }
    }

    let phase = phase(pos);

    (mg*phase + eg*(PHASE_LIMIT - phase)) / PHASE_LIMIT
}
