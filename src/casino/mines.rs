//! Mines: a 5x5 board with hidden bombs. Each safe cell raises the cash-out
//! multiplier; a bomb loses the stake.

use super::payout::Multiplier;
use crate::errors::{CasinoError, HomyakResult};
use crate::random::DrawSource;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const BOARD_SIDE: u8 = 5;
pub const BOARD_CELLS: u8 = BOARD_SIDE * BOARD_SIDE;
pub const BOMB_OPTIONS: [u8; 4] = [2, 3, 5, 7];

const TABLE_2: [u64; 23] = [
    102, 111, 122, 134, 148, 164, 184, 207, 235, 268, 309, 361, 427, 512, 626, 783, 1007, 1342,
    1880, 2820, 4700, 9400, 28200,
];
const TABLE_3: [u64; 22] = [
    106, 122, 140, 162, 189, 223, 264, 317, 386, 475, 593, 755, 982, 1310, 1801, 2573, 3860, 6177,
    10810, 21620, 54050, 216200,
];
const TABLE_5: [u64; 20] = [
    117, 148, 189, 245, 322, 429, 582, 807, 1143, 1663, 2494, 3880, 6305, 10809, 19818, 39636,
    89182, 237819, 832369, 4994220,
];
const TABLE_7: [u64; 18] = [
    130, 184, 264, 388, 582, 896, 1419, 2323, 3949, 7021, 13166, 26332, 57052, 136926, 376548,
    1255161, 5648225, 45185800,
];

/// Multiplier table (hundredths) for a bomb count, indexed by safe reveals - 1
pub fn multiplier_table(bombs: u8) -> Option<&'static [u64]> {
    match bombs {
        2 => Some(&TABLE_2),
        3 => Some(&TABLE_3),
        5 => Some(&TABLE_5),
        7 => Some(&TABLE_7),
        _ => None,
    }
}

/// Cash-out multiplier after `opened` safe reveals; `None` before the first one
pub fn cashout_multiplier(bombs: u8, opened: usize) -> Option<Multiplier> {
    let table = multiplier_table(bombs)?;
    let index = opened.checked_sub(1)?;
    table.get(index).copied().map(Multiplier::from_hundredths)
}

/// `stake * table[opened - 1]` rounded down, 0 with nothing opened
pub fn cashout_value(bombs: u8, opened: usize, stake: u64) -> u64 {
    cashout_multiplier(bombs, opened).map_or(0, |m| m.apply(stake))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    pub fn new(row: u8, col: u8) -> HomyakResult<Self> {
        if row >= BOARD_SIDE || col >= BOARD_SIDE {
            return Err(CasinoError::CellOutOfBounds { row, col }.into());
        }
        Ok(Self { row, col })
    }

    fn from_index(index: u8) -> Self {
        Self { row: index / BOARD_SIDE, col: index % BOARD_SIDE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Safe { opened: usize, cashout: u64 },
    Mine,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinesBoard {
    bombs: u8,
    mines: Vec<Cell>,
    revealed: Vec<Cell>,
    stake: u64,
    exploded: bool,
}

impl MinesBoard {
    pub fn new(bombs: u8, stake: u64, mines: Vec<Cell>) -> HomyakResult<Self> {
        if multiplier_table(bombs).is_none() {
            return Err(CasinoError::InvalidBombCount(bombs).into());
        }
        let mut unique = mines.clone();
        unique.sort_by_key(|c| (c.row, c.col));
        unique.dedup();
        if unique.len() != bombs as usize || mines.len() != bombs as usize {
            return Err(CasinoError::InvalidBombCount(bombs).into());
        }
        Ok(Self { bombs, mines, revealed: Vec::new(), stake, exploded: false })
    }

    /// Place `bombs` mines uniformly without replacement
    pub fn generate(bombs: u8, stake: u64, rng: &dyn DrawSource) -> HomyakResult<Self> {
        if multiplier_table(bombs).is_none() {
            return Err(CasinoError::InvalidBombCount(bombs).into());
        }
        let mines = rng
            .sample_distinct(BOARD_CELLS, bombs as usize)
            .into_iter()
            .map(|i| Cell::from_index(i % BOARD_CELLS))
            .collect();
        Self::new(bombs, stake, mines)
    }

    pub fn bombs(&self) -> u8 {
        self.bombs
    }

    pub fn stake(&self) -> u64 {
        self.stake
    }

    pub fn opened(&self) -> usize {
        self.revealed.len()
    }

    pub fn revealed(&self) -> &[Cell] {
        &self.revealed
    }

    pub fn mines(&self) -> &[Cell] {
        &self.mines
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    pub fn is_revealed(&self, cell: Cell) -> bool {
        self.revealed.contains(&cell)
    }

    pub fn exploded(&self) -> bool {
        self.exploded
    }

    pub fn current_cashout(&self) -> u64 {
        cashout_value(self.bombs, self.opened(), self.stake)
    }

    pub fn current_multiplier(&self) -> Multiplier {
        cashout_multiplier(self.bombs, self.opened()).unwrap_or(Multiplier::ZERO)
    }

    /// Open a cell. Re-opening a cell is rejected with no change.
    pub fn reveal(&mut self, cell: Cell) -> HomyakResult<RevealOutcome> {
        if self.exploded {
            return Err(CasinoError::RoundFinished.into());
        }
        if self.is_revealed(cell) {
            return Err(CasinoError::CellAlreadyRevealed.into());
        }
        self.revealed.push(cell);
        if self.is_mine(cell) {
            self.exploded = true;
            return Ok(RevealOutcome::Mine);
        }
        Ok(RevealOutcome::Safe { opened: self.opened(), cashout: self.current_cashout() })
    }

    /// The cell that ended the round, if a bomb did
    pub fn losing_cell(&self) -> Option<Cell> {
        self.revealed.last().copied().filter(|c| self.exploded && self.is_mine(*c))
    }

    /// Hex digest of the mine layout, logged when the round opens so the
    /// final board can be checked against it
    pub fn commitment(&self, round_id: &str) -> String {
        let mut cells: Vec<u8> = self.mines.iter().map(|c| c.row * BOARD_SIDE + c.col).collect();
        cells.sort_unstable();
        let mut hasher = Sha256::new();
        hasher.update(round_id.as_bytes());
        hasher.update(&cells);
        hex::encode(hasher.finalize())
    }

    /// Final board for the operator log: 💣❌ hit mine, 💎 revealed, 💣 mine, 🟦 hidden
    pub fn render_final(&self) -> Vec<Vec<&'static str>> {
        let lost = self.losing_cell();
        (0..BOARD_SIDE)
            .map(|row| {
                (0..BOARD_SIDE)
                    .map(|col| {
                        let cell = Cell { row, col };
                        if Some(cell) == lost {
                            "💣❌"
                        } else if self.is_revealed(cell) {
                            "💎"
                        } else if self.is_mine(cell) {
                            "💣"
                        } else {
                            "🟦"
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HomyakError;
    use crate::random::{ScriptedDraws, ThreadRngSource};

    fn cell(row: u8, col: u8) -> Cell {
        Cell::new(row, col).unwrap()
    }

    #[test]
    fn test_tables_cover_every_safe_cell() {
        for bombs in BOMB_OPTIONS {
            let table = multiplier_table(bombs).unwrap();
            assert_eq!(table.len(), (BOARD_CELLS - bombs) as usize);
            assert!(table.windows(2).all(|w| w[0] < w[1]), "table {} not increasing", bombs);
        }
        assert!(multiplier_table(4).is_none());
    }

    #[test]
    fn test_cashout_values() {
        assert_eq!(cashout_value(2, 0, 10), 0);
        assert_eq!(cashout_value(2, 1, 10), 10);
        assert_eq!(cashout_value(3, 3, 20), 28);
        assert_eq!(cashout_value(7, 18, 3), 1355574);
        for bombs in BOMB_OPTIONS {
            let table = multiplier_table(bombs).unwrap();
            for k in 1..=table.len() {
                assert_eq!(cashout_value(bombs, k, 17), 17 * table[k - 1] / 100);
            }
        }
    }

    #[test]
    fn test_reveal_and_cashout() {
        let mut board = MinesBoard::new(2, 10, vec![cell(0, 0), cell(4, 4)]).unwrap();
        assert_eq!(board.reveal(cell(1, 1)).unwrap(), RevealOutcome::Safe { opened: 1, cashout: 10 });
        assert_eq!(board.reveal(cell(1, 2)).unwrap(), RevealOutcome::Safe { opened: 2, cashout: 11 });

        let err = board.reveal(cell(1, 1)).unwrap_err();
        assert!(matches!(err, HomyakError::Casino(CasinoError::CellAlreadyRevealed)));
        assert_eq!(board.opened(), 2);
    }

    #[test]
    fn test_mine_ends_round() {
        let mut board = MinesBoard::new(3, 10, vec![cell(0, 0), cell(0, 1), cell(0, 2)]).unwrap();
        board.reveal(cell(3, 3)).unwrap();
        assert_eq!(board.reveal(cell(0, 1)).unwrap(), RevealOutcome::Mine);
        assert!(board.exploded());
        assert_eq!(board.losing_cell(), Some(cell(0, 1)));
        assert!(board.reveal(cell(4, 4)).is_err());
        assert_eq!(board.render_final()[0][1], "💣❌");
        assert_eq!(board.render_final()[3][3], "💎");
        assert_eq!(board.render_final()[0][0], "💣");
    }

    #[test]
    fn test_invalid_boards() {
        assert!(MinesBoard::new(4, 10, vec![]).is_err());
        assert!(MinesBoard::new(2, 10, vec![cell(0, 0), cell(0, 0)]).is_err());
        assert!(Cell::new(5, 0).is_err());
    }

    #[test]
    fn test_generate_places_distinct_mines() {
        let board = MinesBoard::generate(7, 5, &ThreadRngSource).unwrap();
        assert_eq!(board.mines().len(), 7);

        let scripted = ScriptedDraws::new();
        scripted.push_sample(vec![0, 24]);
        let board = MinesBoard::generate(2, 5, &scripted).unwrap();
        assert!(board.is_mine(cell(0, 0)));
        assert!(board.is_mine(cell(4, 4)));
    }

    #[test]
    fn test_commitment_is_order_independent() {
        let a = MinesBoard::new(2, 10, vec![cell(0, 0), cell(4, 4)]).unwrap();
        let b = MinesBoard::new(2, 10, vec![cell(4, 4), cell(0, 0)]).unwrap();
        assert_eq!(a.commitment("r1"), b.commitment("r1"));
        assert_ne!(a.commitment("r1"), a.commitment("r2"));
    }
}
