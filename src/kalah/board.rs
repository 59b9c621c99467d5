use std::fmt::{Debug, Display};

type House = u16;
type HouseNum = u8;

/*====================================================================================================================*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    White,
    Black,
}

impl Player {
    // symbol used on the broadcast channel and in reports
    pub fn symbol(&self) -> char {
        match self {
            Player::White => 'O',
            Player::Black => 'X',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Player> {
        match symbol {
            'O' => Some(Player::White),
            'X' => Some(Player::Black),
            _ => None,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Player::White => 0,
            Player::Black => 1,
        }
    }
}

// flip the player, i.e. White -> Black and Black -> White
impl std::ops::Not for Player {
    type Output = Player;

    fn not(self) -> Self::Output {
        match self {
            Player::White => Player::Black,
            Player::Black => Player::White,
        }
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/*====================================================================================================================*/

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Move {
    // bits 0..6 : number of house the move starts from
    // bit 7 : whether the move is by White or Black
    data: u8,
}

impl Move {
    pub fn new(house_num: HouseNum, player: Player) -> Self {
        assert!(house_num < 128, "House needs to be smaller than 128");

        let mut data = house_num;
        if player == Player::Black {
            data |= 1 << 7;
        }
        Move { data }
    }

    pub fn house(&self) -> HouseNum {
        self.data & 0b0111_1111
    }

    pub fn player(&self) -> Player {
        if (self.data & 0b1000_0000) == 0 {
            Player::White
        } else {
            Player::Black
        }
    }

    pub fn with_player(&self, player: Player) -> Move {
        Move::new(self.house(), player)
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.house() + 1)
    }
}

impl Debug for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Move({}, {})", self.house(), self.player())
    }
}

/*====================================================================================================================*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBoardError(String);

impl Display for ParseBoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid board \"{}\"", self.0)
    }
}

impl std::error::Error for ParseBoardError {}

/*====================================================================================================================*/

/// Kalah board seen from White's side: White's houses and store are "ours".
///
/// The search flips the board so that the player to move is always White, which lets a single
/// sowing routine serve both sides.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    // first h entries are our houses, the next h entries are theirs, each in sowing order
    houses: Vec<House>,

    pub our_store: u16,
    pub their_store: u16,

    flipped: bool,
}

impl Board {
    pub fn new(h: u8, s: House) -> Self {
        assert!((1..128).contains(&h), "Board needs between 1 and 127 houses per side");
        assert!(
            2 * h as u32 * s as u32 <= House::MAX as u32,
            "Board can hold at most {} seeds",
            House::MAX
        );

        Board {
            houses: vec![s; 2 * h as usize],
            our_store: 0,
            their_store: 0,
            flipped: false,
        }
    }

    pub fn from_kgp(kgp: &str) -> Result<Self, ParseBoardError> {
        let err = || ParseBoardError(kgp.to_owned());

        let compact: String = kgp.chars().filter(|c| !c.is_whitespace()).collect();

        let inner = compact
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(err)?;

        let nums = inner
            .split(',')
            .map(|num_s| num_s.parse::<u16>())
            .collect::<Result<Vec<u16>, _>>()
            .map_err(|_| err())?;

        let (&h, rest) = nums.split_first().ok_or_else(err)?;

        if h == 0 || h >= 128 || rest.len() != 2 + 2 * h as usize {
            return Err(err());
        }

        // sowing never creates seeds, so this bounds every house and store for the rest of the game
        let total_seeds = rest.iter().map(|&seeds| seeds as u32).sum::<u32>();
        if total_seeds > House::MAX as u32 {
            return Err(err());
        }

        Ok(Board {
            houses: rest[2..].to_vec(),
            our_store: rest[0],
            their_store: rest[1],
            flipped: false,
        })
    }

    pub fn to_kgp(&self) -> String {
        // always written from White's side, regardless of the current perspective
        let (first_store, second_store, first_houses, second_houses) = if self.flipped {
            (self.their_store, self.our_store, self.their_houses(), self.our_houses())
        } else {
            (self.our_store, self.their_store, self.our_houses(), self.their_houses())
        };

        let mut parts = vec![self.h() as u16, first_store, second_store];
        parts.extend_from_slice(first_houses);
        parts.extend_from_slice(second_houses);

        let parts: Vec<String> = parts.iter().map(|num| num.to_string()).collect();

        format!("<{}>", parts.join(", "))
    }

    pub fn h(&self) -> u8 {
        (self.houses.len() / 2) as u8
    }

    pub fn our_houses(&self) -> &[House] {
        &self.houses[..self.h() as usize]
    }

    pub fn our_houses_mut(&mut self) -> &mut [House] {
        let h = self.h() as usize;
        &mut self.houses[..h]
    }

    pub fn their_houses(&self) -> &[House] {
        &self.houses[self.h() as usize..]
    }

    pub fn their_houses_mut(&mut self) -> &mut [House] {
        let h = self.h() as usize;
        &mut self.houses[h..]
    }

    pub fn flip_board(&mut self) {
        let h = self.h() as usize;
        self.houses.rotate_left(h);

        std::mem::swap(&mut self.our_store, &mut self.their_store);

        self.flipped = !self.flipped
    }

    pub fn total_seeds(&self) -> u32 {
        self.houses.iter().map(|&seeds| seeds as u32).sum::<u32>() + self.our_store as u32 + self.their_store as u32
    }

    /// Score each side would end up with if the game stopped now: store plus remaining houses.
    pub fn final_scores(&self) -> (u32, u32) {
        let our = self.our_store as u32 + self.our_houses().iter().map(|&s| s as u32).sum::<u32>();
        let their = self.their_store as u32 + self.their_houses().iter().map(|&s| s as u32).sum::<u32>();
        (our, their)
    }

    /// Sow the seeds of `move_`. Returns whether the mover gets to move again.
    pub fn apply_move(&mut self, move_: Move) -> bool {
        assert!(move_.house() < self.h(), "Trying to apply a move that is out of range");

        if move_.player() == Player::Black {
            // if the move is by Black: flip the board, apply the move as if by White, flip the board again
            self.flip_board();
            let ret = self.apply_move(move_.with_player(Player::White));
            self.flip_board();
            return ret;
        }

        let h = self.h() as usize;
        let start_house = move_.house() as usize;

        let mut seeds_in_hand = self.our_houses()[start_house];
        assert!(seeds_in_hand != 0, "Trying to move out of empty house");
        self.our_houses_mut()[start_house] = 0;

        // positions 0..h are our houses, h is our store, h+1..2h+1 are their houses; their store is skipped
        let cycle = 2 * h + 1;
        let mut pos = start_house;

        while seeds_in_hand > 0 {
            pos = (pos + 1) % cycle;

            match pos {
                p if p < h => self.our_houses_mut()[p] += 1,
                p if p == h => self.our_store += 1,
                p => self.their_houses_mut()[p - h - 1] += 1,
            }

            seeds_in_hand -= 1;
        }

        let bonus_move = pos == h;

        // last seed landed in one of our empty houses: capture it together with the opposing house
        if pos < h && self.our_houses()[pos] == 1 && self.their_houses()[h - pos - 1] != 0 {
            self.our_store += 1 + self.their_houses()[h - pos - 1];

            self.our_houses_mut()[pos] = 0;
            self.their_houses_mut()[h - pos - 1] = 0;
        }

        if !self.has_legal_move() {
            self.finish_game();
        }

        bonus_move
    }

    pub fn is_legal_move(&self, move_: Move) -> bool {
        let houses = match move_.player() {
            Player::White => self.our_houses(),
            Player::Black => self.their_houses(),
        };

        houses.get(move_.house() as usize).is_some_and(|&seeds| seeds != 0)
    }

    pub fn legal_moves(&self, player: Player) -> Vec<Move> {
        let houses = match player {
            Player::White => self.our_houses(),
            Player::Black => self.their_houses(),
        };

        houses
            .iter()
            .enumerate()
            .filter(|&(_house_num, &house)| house != 0)
            .map(|(house_num, _house)| Move::new(house_num as u8, player))
            .collect()
    }

    pub fn has_legal_move(&self) -> bool {
        self.our_houses().iter().any(|&house| house != 0) && self.their_houses().iter().any(|&house| house != 0)
    }

    pub fn finish_game(&mut self) {
        self.our_store += self.our_houses().iter().sum::<u16>();
        self.their_store += self.their_houses().iter().sum::<u16>();

        self.houses.fill(0);
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>3} |", self.their_store)?;

        for their_house in self.their_houses().iter().rev() {
            write!(f, " {:>3}", *their_house)?;
        }

        write!(f, "\n\n      ")?;

        for our_house in self.our_houses() {
            write!(f, "{:>3} ", our_house)?;
        }

        write!(f, "| {:>3}", self.our_store)
    }
}

impl Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Board({})", self.to_kgp())
    }
}

/*====================================================================================================================*/

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Board, Move, Player};

    #[test]
    fn test_board_new() {
        let h = 6;
        let s = 4;

        let board = Board::new(h, s);

        assert_eq!(board.h(), h);
        assert!(board.our_houses().iter().all(|&house| house == s));
        assert!(board.their_houses().iter().all(|&house| house == s));
        assert_eq!(board.total_seeds(), 48);
    }

    #[test]
    fn test_board_flip() {
        let mut board = Board::new(6, 4);

        for (i, our_house) in board.our_houses_mut().iter_mut().enumerate() {
            *our_house = i as u16;
        }

        for (i, their_house) in board.their_houses_mut().iter_mut().enumerate() {
            *their_house = i as u16 + 10;
        }

        board.our_store = 42;
        board.their_store = 24;

        board.flip_board();

        assert_eq!(board.our_houses(), &[10, 11, 12, 13, 14, 15]);
        assert_eq!(board.their_houses(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(board.our_store, 24);
        assert_eq!(board.their_store, 42);
        assert!(board.flipped);
    }

    #[test]
    fn test_from_to_kgp() {
        let kgp = "<3, 2, 3, 11, 12, 13, 21, 22, 23>";

        let board = Board::from_kgp(kgp).unwrap();

        assert_eq!(board.h(), 3);
        assert_eq!(board.our_store, 2);
        assert_eq!(board.their_store, 3);
        assert_eq!(board.our_houses(), &[11, 12, 13]);
        assert_eq!(board.their_houses(), &[21, 22, 23]);

        assert_eq!(board.to_kgp(), kgp);

        // kgp is always written from White's side
        let mut flipped = board.clone();
        flipped.flip_board();
        assert_eq!(flipped.to_kgp(), kgp);
    }

    #[test]
    fn test_from_kgp_rejects_garbage() {
        assert!(Board::from_kgp("3, 2, 3, 1, 1, 1, 1, 1, 1").is_err());
        assert!(Board::from_kgp("<3, 2, 3, 1, 1, 1, 1, 1>").is_err());
        assert!(Board::from_kgp("<0, 0, 0>").is_err());
        assert!(Board::from_kgp("<1, 0, 0, a, 1>").is_err());
        assert!(Board::from_kgp("").is_err());
    }

    #[test]
    fn test_from_kgp_rejects_seed_overflow() {
        // any move would push a store or a sweep past u16
        assert!(Board::from_kgp("<1, 65535, 0, 1, 1>").is_err());
        assert!(Board::from_kgp("<2, 0, 0, 0, 1, 40000, 40000>").is_err());

        let mut board = Board::from_kgp("<1, 65533, 0, 1, 1>").unwrap();
        assert_eq!(board.total_seeds(), 65535);

        board.apply_move(Move::new(0, Player::White));
        assert_eq!(board.final_scores(), (65534, 1));
    }

    #[test]
    fn test_bonus_move() {
        // 4 seeds from the third house of six: last seed lands in our store
        let mut board = Board::new(6, 4);

        let bonus = board.apply_move(Move::new(2, Player::White));

        assert!(bonus);
        assert_eq!(board.our_houses(), &[4, 4, 0, 5, 5, 5]);
        assert_eq!(board.our_store, 1);
        assert_eq!(board.their_houses(), &[4, 4, 4, 4, 4, 4]);
    }

    #[test]
    fn test_sowing_skips_their_store() {
        let mut board = Board::from_kgp("<2, 0, 0, 3, 4, 1, 1>").unwrap();

        // our store, their 0, their 1, (their store skipped), our 0
        let bonus = board.apply_move(Move::new(1, Player::White));

        assert!(!bonus);
        assert_eq!(board.to_kgp(), "<2, 1, 0, 4, 0, 2, 2>");
    }

    #[test]
    fn test_capture() {
        // the single seed lands in our empty house 1, which faces their house 1
        let mut board = Board::from_kgp("<3, 0, 0, 1, 0, 2, 3, 7, 4>").unwrap();

        let bonus = board.apply_move(Move::new(0, Player::White));

        assert!(!bonus);
        assert_eq!(board.our_houses(), &[0, 0, 2]);
        assert_eq!(board.their_houses(), &[3, 0, 4]);
        assert_eq!(board.our_store, 8);
    }

    #[test]
    fn test_black_move() {
        let mut board = Board::new(6, 4);

        let bonus = board.apply_move(Move::new(2, Player::Black));

        assert!(bonus);
        assert_eq!(board.their_houses(), &[4, 4, 0, 5, 5, 5]);
        assert_eq!(board.their_store, 1);
        assert_eq!(board.our_houses(), &[4, 4, 4, 4, 4, 4]);
        assert!(!board.flipped);
    }

    #[test]
    fn test_finish_game_sweeps_houses() {
        let mut board = Board::from_kgp("<2, 5, 3, 0, 1, 2, 2>").unwrap();

        board.apply_move(Move::new(1, Player::White));

        assert!(!board.has_legal_move());
        assert_eq!(board.to_kgp(), "<2, 6, 7, 0, 0, 0, 0>");
        assert_eq!(board.final_scores(), (6, 7));
    }

    #[test]
    fn test_legal_moves() {
        let board = Board::from_kgp("<3, 0, 0, 0, 2, 1, 4, 0, 0>").unwrap();

        assert_eq!(
            board.legal_moves(Player::White),
            vec![Move::new(1, Player::White), Move::new(2, Player::White)]
        );
        assert_eq!(board.legal_moves(Player::Black), vec![Move::new(0, Player::Black)]);
        assert!(board.is_legal_move(Move::new(1, Player::White)));
        assert!(!board.is_legal_move(Move::new(0, Player::White)));
        assert!(!board.is_legal_move(Move::new(7, Player::Black)));
    }
}
