//! Animal Shogi Game Engine
//!
//! A Markov game state engine for dōbutsu shōgi ("animal shogi"), designed
//! for RL training. Core object is a single `State` (plain data); pure
//! functions operate on it. The engine keeps a per-color pseudo-legal action
//! mask up to date incrementally, so enumerating legal actions never rescans
//! the board from scratch.

// =============================================================================
// Basic types and constants
// =============================================================================

/// Board square index: `column * 4 + row`, 0..=11.
///
/// Row 0 is the second player's home row (and the first player's promotion
/// and try target); row 3 is the mirror image.
pub type Square = u8;

/// Discrete action identifier (0..ACTION_SPACE_SIZE-1)
pub type ActionId = u16;

pub const NUM_COLS: usize = 3;
pub const NUM_ROWS: usize = 4;
pub const NUM_SQUARES: usize = NUM_COLS * NUM_ROWS;
pub const PIECE_KINDS: usize = 11;
pub const HAND_KINDS: usize = 6;

/// Action planes: 8 relative move directions, 1 promoting move, 6 drops.
pub const NUM_DIRECTIONS: usize = 15;

/// Total size of the discrete action space: 15 directions × 12 squares.
pub const ACTION_SPACE_SIZE: usize = NUM_DIRECTIONS * NUM_SQUARES;

/// Column of a square (0..=2).
pub const fn column_of(sq: Square) -> u8 {
    sq / NUM_ROWS as u8
}

/// Row of a square (0..=3).
pub const fn row_of(sq: Square) -> u8 {
    sq % NUM_ROWS as u8
}

/// Square at the given column and row.
pub const fn square_at(column: u8, row: u8) -> Square {
    column * NUM_ROWS as u8 + row
}

/// Side to move / piece ownership.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Color {
    /// Moves first; pushes toward row 0.
    Black = 0,
    /// Pushes toward row 3.
    White = 1,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Index into per-color arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The row a Chick promotes on and a Lion tries into.
    pub fn promotion_row(self) -> u8 {
        match self {
            Color::Black => 0,
            Color::White => 3,
        }
    }
}

/// Contents of one board square (order fixed: it doubles as the table index).
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Piece {
    Empty = 0,
    BlackChick = 1,
    BlackGiraffe = 2,
    BlackElephant = 3,
    BlackLion = 4,
    BlackHen = 5,
    WhiteChick = 6,
    WhiteGiraffe = 7,
    WhiteElephant = 8,
    WhiteLion = 9,
    WhiteHen = 10,
}

impl Piece {
    /// Convert from u8 index to Piece
    pub fn from_index(idx: u8) -> Option<Piece> {
        match idx {
            0 => Some(Piece::Empty),
            1 => Some(Piece::BlackChick),
            2 => Some(Piece::BlackGiraffe),
            3 => Some(Piece::BlackElephant),
            4 => Some(Piece::BlackLion),
            5 => Some(Piece::BlackHen),
            6 => Some(Piece::WhiteChick),
            7 => Some(Piece::WhiteGiraffe),
            8 => Some(Piece::WhiteElephant),
            9 => Some(Piece::WhiteLion),
            10 => Some(Piece::WhiteHen),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Who owns this piece; `None` for `Empty`.
    pub fn owner(self) -> Option<Color> {
        match self as u8 {
            0 => None,
            1..=5 => Some(Color::Black),
            _ => Some(Color::White),
        }
    }

    /// The Lion of the given color.
    pub fn lion_of(color: Color) -> Piece {
        match color {
            Color::Black => Piece::BlackLion,
            Color::White => Piece::WhiteLion,
        }
    }

    /// Chick → Hen; every other piece is returned unchanged.
    pub fn promoted(self) -> Piece {
        match self {
            Piece::BlackChick => Piece::BlackHen,
            Piece::WhiteChick => Piece::WhiteHen,
            p => p,
        }
    }

    /// Reserve counter slot (0..6) for droppable kinds, `None` otherwise.
    pub fn hand_slot(self) -> Option<usize> {
        match self {
            Piece::BlackChick => Some(0),
            Piece::BlackGiraffe => Some(1),
            Piece::BlackElephant => Some(2),
            Piece::WhiteChick => Some(3),
            Piece::WhiteGiraffe => Some(4),
            Piece::WhiteElephant => Some(5),
            _ => None,
        }
    }
}

/// Droppable piece per reserve slot; slot `i` drops with direction `9 + i`.
pub const RESERVE_PIECES: [Piece; HAND_KINDS] = [
    Piece::BlackChick,
    Piece::BlackGiraffe,
    Piece::BlackElephant,
    Piece::WhiteChick,
    Piece::WhiteGiraffe,
    Piece::WhiteElephant,
];

/// Board: exactly one piece kind (or `Empty`) per square.
pub type Board = [Piece; NUM_SQUARES];

/// Captured-piece reserves: counts per `RESERVE_PIECES` slot.
pub type Hand = [u8; HAND_KINDS];

// =============================================================================
// Square sets
// =============================================================================

/// A set of board squares, one bit per square.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct SquareSet(u16);

impl SquareSet {
    pub const EMPTY: SquareSet = SquareSet(0);
    pub const ALL: SquareSet = SquareSet((1 << NUM_SQUARES) - 1);

    pub const fn single(sq: Square) -> SquareSet {
        SquareSet(1 << sq)
    }

    /// Copy of `self` with `sq` added (usable in const evaluation).
    pub const fn with(self, sq: Square) -> SquareSet {
        SquareSet(self.0 | (1 << sq))
    }

    pub fn contains(self, sq: Square) -> bool {
        self.0 & (1 << sq) != 0
    }

    pub fn insert(&mut self, sq: Square) {
        self.0 |= 1 << sq;
    }

    pub fn remove(&mut self, sq: Square) {
        self.0 &= !(1 << sq);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// All squares not in this set.
    pub fn complement(self) -> SquareSet {
        SquareSet(!self.0 & Self::ALL.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Square> {
        (0..NUM_SQUARES as Square).filter(move |&sq| self.contains(sq))
    }
}

impl std::ops::BitOr for SquareSet {
    type Output = SquareSet;
    fn bitor(self, rhs: SquareSet) -> SquareSet {
        SquareSet(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for SquareSet {
    type Output = SquareSet;
    fn bitand(self, rhs: SquareSet) -> SquareSet {
        SquareSet(self.0 & rhs.0)
    }
}

// =============================================================================
// Movement pattern table
// =============================================================================

/// Relative square offsets for directions 0..=7 in the first player's frame:
/// forward, forward-left, forward-right, left, right, back, back-left,
/// back-right. The second player uses the negated offset. Direction 8 is the
/// promoting forward move and reuses offset −1.
pub const MOVE_OFFSETS: [i8; 8] = [-1, 3, -5, 4, -4, 1, 5, -3];

/// (column, row) deltas matching `MOVE_OFFSETS` (`offset = 4*dc + dr`).
const DIR_DELTAS: [(i8, i8); 8] = [
    (0, -1),
    (1, -1),
    (-1, -1),
    (1, 0),
    (-1, 0),
    (0, 1),
    (1, 1),
    (-1, 1),
];

/// Directions (bit `d` = direction `d`, own frame) each piece kind may step.
const fn piece_direction_mask(piece: usize) -> u8 {
    match piece {
        1 | 6 => 0b0000_0001,  // Chick: forward only
        2 | 7 => 0b0011_1001,  // Giraffe: the four orthogonals
        3 | 8 => 0b1100_0110,  // Elephant: the four diagonals
        4 | 9 => 0b1111_1111,  // Lion: all eight
        5 | 10 => 0b0011_1111, // Hen: all but the rear diagonals
        _ => 0,
    }
}

const fn reachable_squares(sq: usize, piece: usize) -> SquareSet {
    let dirs = piece_direction_mask(piece);
    let col = (sq / NUM_ROWS) as i8;
    let row = (sq % NUM_ROWS) as i8;
    let mut set = SquareSet::EMPTY;
    let mut d = 0;
    while d < 8 {
        if dirs & (1 << d) != 0 {
            let mut dc = DIR_DELTAS[d].0;
            let mut dr = DIR_DELTAS[d].1;
            if piece >= 6 {
                // second player's frame
                dc = -dc;
                dr = -dr;
            }
            let c = col + dc;
            let r = row + dr;
            if c >= 0 && c < NUM_COLS as i8 && r >= 0 && r < NUM_ROWS as i8 {
                set = set.with((c * NUM_ROWS as i8 + r) as Square);
            }
        }
        d += 1;
    }
    set
}

const fn build_move_table() -> [[SquareSet; PIECE_KINDS]; NUM_SQUARES] {
    let mut table = [[SquareSet::EMPTY; PIECE_KINDS]; NUM_SQUARES];
    let mut sq = 0;
    while sq < NUM_SQUARES {
        let mut piece = 0;
        while piece < PIECE_KINDS {
            table[sq][piece] = reachable_squares(sq, piece);
            piece += 1;
        }
        sq += 1;
    }
    table
}

/// `MOVE_TABLE[square][piece]`: squares reachable in one step, ignoring
/// occupancy. Nothing in this game slides, so there is no blocking to model.
/// Built at compile time from the movement rules; read-only thereafter.
pub static MOVE_TABLE: [[SquareSet; PIECE_KINDS]; NUM_SQUARES] = build_move_table();

// =============================================================================
// Action representation and codec
// =============================================================================

/// A concrete player action, decoded against a position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Move the piece on `from` to `to`. `captured` is the piece previously
    /// on `to` (`Empty` when the destination was free). `promote` turns a
    /// Chick entering the far row into a Hen.
    Move {
        from: Square,
        to: Square,
        piece: Piece,
        captured: Piece,
        promote: bool,
    },
    /// Place a reserve piece on the empty square `to`.
    Drop { piece: Piece, to: Square },
}

/// Offset applied when recovering `from` out of (direction, to); entry 8 is
/// the promoting forward move.
const DIRECTION_OFFSETS: [i8; 9] = [-1, 3, -5, 4, -4, 1, 5, -3, -1];

/// Packs a direction plane and destination square into an action id.
pub fn action_id(direction: usize, to: Square) -> ActionId {
    (direction * NUM_SQUARES + to as usize) as ActionId
}

/// Direction plane (0..=7) of a single step from `from` to `to`, in the
/// mover's frame.
fn direction_between(from: Square, to: Square, mover: Color) -> usize {
    let mut diff = to as i8 - from as i8;
    if mover == Color::White {
        diff = -diff;
    }
    match diff {
        -1 => 0,
        3 => 1,
        -5 => 2,
        4 => 3,
        -4 => 4,
        1 => 5,
        5 => 6,
        -3 => 7,
        _ => unreachable!("no single step leads from square {from} to {to}"),
    }
}

/// Encode an action into its dense id, from the mover's perspective.
///
/// Exact inverse of [`decode_action`] for every action reachable from a
/// representable position. Panics if the action is not representable (a
/// move between non-adjacent squares, or a drop of a non-reserve kind).
pub fn encode_action(action: &Action, turn: Color) -> ActionId {
    match *action {
        Action::Move {
            from, to, promote, ..
        } => {
            let mut direction = direction_between(from, to, turn);
            if promote {
                direction += 8;
            }
            action_id(direction, to)
        }
        Action::Drop { piece, to } => {
            let slot = piece.hand_slot().expect("dropped pieces are reserve kinds");
            action_id(9 + slot, to)
        }
    }
}

/// Decode an action id against the current board.
///
/// Returns `None` when the implied origin square falls outside the board —
/// the transition layer treats such ids as forfeiting, not as errors. The
/// decoded action may still be illegal in the position; only the legality
/// filter decides that. Panics if `id >= ACTION_SPACE_SIZE`.
pub fn decode_action(id: ActionId, board: &Board, turn: Color) -> Option<Action> {
    assert!(
        (id as usize) < ACTION_SPACE_SIZE,
        "ActionId {id} out of range"
    );
    let direction = id as usize / NUM_SQUARES;
    let to = (id as usize % NUM_SQUARES) as Square;

    if direction >= 9 {
        return Some(Action::Drop {
            piece: RESERVE_PIECES[direction - 9],
            to,
        });
    }

    let offset = DIRECTION_OFFSETS[direction] as i16;
    let from = match turn {
        Color::Black => to as i16 - offset,
        Color::White => to as i16 + offset,
    };
    if !(0..NUM_SQUARES as i16).contains(&from) {
        return None;
    }
    let from = from as Square;
    Some(Action::Move {
        from,
        to,
        piece: board[from as usize],
        captured: board[to as usize],
        promote: direction == 8,
    })
}

// =============================================================================
// Action sets (180-bit masks, one 12-square row per direction plane)
// =============================================================================

/// A set of action ids, stored as one [`SquareSet`] row per direction plane.
/// Drop planes and per-direction filtering become whole-row operations.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionSet {
    rows: [SquareSet; NUM_DIRECTIONS],
}

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet {
        rows: [SquareSet::EMPTY; NUM_DIRECTIONS],
    };

    pub fn contains(&self, id: ActionId) -> bool {
        self.rows[id as usize / NUM_SQUARES].contains((id as usize % NUM_SQUARES) as Square)
    }

    pub fn insert(&mut self, id: ActionId) {
        self.rows[id as usize / NUM_SQUARES].insert((id as usize % NUM_SQUARES) as Square);
    }

    pub fn remove(&mut self, id: ActionId) {
        self.rows[id as usize / NUM_SQUARES].remove((id as usize % NUM_SQUARES) as Square);
    }

    /// Destination squares flagged in one direction plane.
    pub fn row(&self, direction: usize) -> SquareSet {
        self.rows[direction]
    }

    pub fn set_row(&mut self, direction: usize, squares: SquareSet) {
        self.rows[direction] = squares;
    }

    pub fn clear_row(&mut self, direction: usize) {
        self.rows[direction] = SquareSet::EMPTY;
    }

    /// Intersect one direction plane with `keep`.
    pub fn retain_row(&mut self, direction: usize, keep: SquareSet) {
        self.rows[direction] = self.rows[direction] & keep;
    }

    pub fn union_with(&mut self, other: &ActionSet) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows.iter()) {
            *row = *row | *other_row;
        }
    }

    pub fn subtract(&mut self, other: &ActionSet) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows.iter()) {
            *row = *row & other_row.complement();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    pub fn count(&self) -> u32 {
        self.rows.iter().map(|row| row.count()).sum()
    }

    pub fn iter(self) -> impl Iterator<Item = ActionId> {
        (0..ACTION_SPACE_SIZE as ActionId).filter(move |&id| self.contains(id))
    }
}

// =============================================================================
// Game state
// =============================================================================

/// Complete game state - fully Markov (the game has no history rules).
///
/// `pseudo_legal` holds, per color, every move the pieces on the board could
/// make ignoring check safety and friendly occupancy of the destination,
/// plus one full drop row per non-empty reserve slot. It is maintained
/// incrementally by [`step`] and must always equal what
/// [`rebuild_pseudo_legal`] computes from scratch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct State {
    /// Whose turn it is
    pub turn: Color,
    pub board: Board,
    pub hand: Hand,
    /// Per-color pseudo-legal action masks, indexed by `Color::index`
    pub pseudo_legal: [ActionSet; 2],
    /// `Some(sq)` when the side to move is in check from the piece on `sq`.
    /// Recorded by the previous transition; nothing slides, so the checker
    /// is always the piece that just moved or dropped.
    pub check: Option<Square>,
}

/// The fixed starting layout. Black's camp is rows 2-3, White's rows 0-1.
pub const INIT_BOARD: Board = [
    Piece::WhiteElephant, // c0 r0
    Piece::Empty,
    Piece::Empty,
    Piece::BlackGiraffe, // c0 r3
    Piece::WhiteLion,    // c1 r0
    Piece::WhiteChick,   // c1 r1
    Piece::BlackChick,   // c1 r2
    Piece::BlackLion,    // c1 r3
    Piece::WhiteGiraffe, // c2 r0
    Piece::Empty,
    Piece::Empty,
    Piece::BlackElephant, // c2 r3
];

/// The starting position: fixed layout, empty reserves, Black to move.
pub fn init() -> State {
    position_from(Color::Black, INIT_BOARD, [0; HAND_KINDS])
}

/// Build a full `State` around an arbitrary board and reserves, rebuilding
/// the pseudo-legal masks and the check cache from scratch. Intended for
/// setting up test and analysis positions; played games only ever go
/// through [`init`] and [`step`].
pub fn position_from(turn: Color, board: Board, hand: Hand) -> State {
    let pseudo_legal = rebuild_pseudo_legal(&board, &hand);
    let king_sq = lion_square(&board, turn);
    let check = (0..NUM_SQUARES).find_map(|sq| {
        let piece = board[sq];
        let attacks = piece.owner() == Some(turn.opponent())
            && MOVE_TABLE[sq][piece.index()].contains(king_sq);
        attacks.then_some(sq as Square)
    });
    State {
        turn,
        board,
        hand,
        pseudo_legal,
        check,
    }
}

// =============================================================================
// Board queries
// =============================================================================

fn occupied_by(board: &Board, color: Color) -> SquareSet {
    let mut set = SquareSet::EMPTY;
    for (sq, piece) in board.iter().enumerate() {
        if piece.owner() == Some(color) {
            set.insert(sq as Square);
        }
    }
    set
}

fn occupied(board: &Board) -> SquareSet {
    occupied_by(board, Color::Black) | occupied_by(board, Color::White)
}

fn lion_square(board: &Board, color: Color) -> Square {
    let lion = Piece::lion_of(color);
    board
        .iter()
        .position(|&p| p == lion)
        .expect("each side keeps its lion until the game ends") as Square
}

/// Union of the squares `color`'s pieces reach in one step.
pub fn attacked_squares(board: &Board, color: Color) -> SquareSet {
    let mut attacked = SquareSet::EMPTY;
    for (sq, piece) in board.iter().enumerate() {
        if piece.owner() == Some(color) {
            attacked = attacked | MOVE_TABLE[sq][piece.index()];
        }
    }
    attacked
}

/// Whether `color`'s Lion stands on a square the opponent attacks.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    attacked_squares(board, color.opponent()).contains(lion_square(board, color))
}

// =============================================================================
// Incremental pseudo-legal mask maintenance
// =============================================================================

fn can_promote(piece: Piece, to: Square) -> bool {
    (piece == Piece::BlackChick && row_of(to) == 0)
        || (piece == Piece::WhiteChick && row_of(to) == 3)
}

/// Every action the given piece contributes from `from`: one bit per
/// reachable destination, plus the promoting bit where a Chick enters the
/// far row.
fn piece_actions(from: Square, piece: Piece) -> ActionSet {
    let owner = piece.owner().expect("empty squares contribute no actions");
    let mut actions = ActionSet::EMPTY;
    for to in MOVE_TABLE[from as usize][piece.index()].iter() {
        actions.insert(action_id(direction_between(from, to, owner), to));
        if can_promote(piece, to) {
            actions.insert(action_id(8, to));
        }
    }
    actions
}

fn add_move_actions(from: Square, piece: Piece, mask: &mut ActionSet) {
    mask.union_with(&piece_actions(from, piece));
}

fn remove_move_actions(from: Square, piece: Piece, mask: &mut ActionSet) {
    mask.subtract(&piece_actions(from, piece));
}

fn add_drop_actions(piece: Piece, mask: &mut ActionSet) {
    let slot = piece.hand_slot().expect("only reserve kinds have drop rows");
    mask.set_row(9 + slot, SquareSet::ALL);
}

fn remove_drop_actions(piece: Piece, mask: &mut ActionSet) {
    let slot = piece.hand_slot().expect("only reserve kinds have drop rows");
    mask.clear_row(9 + slot);
}

/// Reference builder: both colors' pseudo-legal masks from scratch.
///
/// Seeds [`init`] and backs the equivalence property the incremental
/// updates in [`step`] must preserve.
pub fn rebuild_pseudo_legal(board: &Board, hand: &Hand) -> [ActionSet; 2] {
    let mut masks = [ActionSet::EMPTY; 2];
    for (sq, &piece) in board.iter().enumerate() {
        if let Some(owner) = piece.owner() {
            add_move_actions(sq as Square, piece, &mut masks[owner.index()]);
        }
    }
    for (slot, &count) in hand.iter().enumerate() {
        if count > 0 {
            masks[slot / 3].set_row(9 + slot, SquareSet::ALL);
        }
    }
    masks
}

/// The basic reserve kind a captured piece turns into for the captor
/// (a Hen demotes to a Chick; Lions are never captured).
fn reserve_of(captured: Piece, captor: Color) -> Piece {
    let slot = match captured {
        Piece::BlackChick | Piece::BlackHen | Piece::WhiteChick | Piece::WhiteHen => 0,
        Piece::BlackGiraffe | Piece::WhiteGiraffe => 1,
        Piece::BlackElephant | Piece::WhiteElephant => 2,
        _ => unreachable!("lions and empty squares never enter a reserve"),
    };
    RESERVE_PIECES[3 * captor.index() + slot]
}

fn apply_move(
    state: &mut State,
    from: Square,
    to: Square,
    piece: Piece,
    captured: Piece,
    promote: bool,
) {
    let mover = piece.owner().expect("moves originate from occupied squares");
    let landed = if promote { piece.promoted() } else { piece };

    state.board[from as usize] = Piece::Empty;
    state.board[to as usize] = landed;

    remove_move_actions(from, piece, &mut state.pseudo_legal[mover.index()]);
    add_move_actions(to, landed, &mut state.pseudo_legal[mover.index()]);

    if captured != Piece::Empty {
        let enemy = mover.opponent();
        remove_move_actions(to, captured, &mut state.pseudo_legal[enemy.index()]);
        let reserve = reserve_of(captured, mover);
        let slot = reserve.hand_slot().expect("reserve kinds map to hand slots");
        state.hand[slot] += 1;
        add_drop_actions(reserve, &mut state.pseudo_legal[mover.index()]);
    }
}

fn apply_drop(state: &mut State, piece: Piece, to: Square) {
    let owner = piece.owner().expect("only owned pieces are dropped");
    let slot = piece.hand_slot().expect("dropped pieces come from the reserve");

    state.hand[slot] -= 1;
    state.board[to as usize] = piece;

    add_move_actions(to, piece, &mut state.pseudo_legal[owner.index()]);
    if state.hand[slot] == 0 {
        remove_drop_actions(piece, &mut state.pseudo_legal[owner.index()]);
    }
}

// =============================================================================
// Legality filter
// =============================================================================

/// The true legal-action set for the side to move, derived from its
/// pseudo-legal mask by a constant number of row operations.
pub fn legal_actions(state: &State) -> ActionSet {
    let mover = state.turn;
    let mut actions = state.pseudo_legal[mover.index()];
    let king = Piece::lion_of(mover);
    let king_sq = lion_square(&state.board, mover);
    let king_moves = MOVE_TABLE[king_sq as usize][king.index()];

    // While in check, only king moves and captures of the checking piece can
    // help: nothing slides, so interposing is impossible and drops are dead.
    if let Some(checker) = state.check {
        let checker_only = SquareSet::single(checker);
        for direction in 0..9 {
            actions.retain_row(direction, checker_only);
        }
        for direction in 9..NUM_DIRECTIONS {
            actions.clear_row(direction);
        }
        // King escapes got swept up in the restriction above; restore them.
        // The occupancy and suicide passes below still apply to these bits.
        for to in king_moves.iter() {
            actions.insert(action_id(direction_between(king_sq, to, mover), to));
        }
    }

    // Moves may not land on the mover's own pieces.
    let own_free = occupied_by(&state.board, mover).complement();
    for direction in 0..9 {
        actions.retain_row(direction, own_free);
    }

    // Drops require a fully empty square.
    let free = occupied(&state.board).complement();
    for slot in 0..3 {
        actions.retain_row(9 + 3 * mover.index() + slot, free);
    }

    // The king may not step onto an attacked square.
    let danger = attacked_squares(&state.board, mover.opponent());
    for to in (king_moves & danger).iter() {
        actions.remove(action_id(direction_between(king_sq, to, mover), to));
    }

    actions
}

// =============================================================================
// State transition
// =============================================================================

/// Result of applying one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub state: State,
    /// +1 if the first player has won, −1 if the second has, else 0.
    pub reward: i8,
    pub terminated: bool,
}

/// Error type for [`step`]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepError {
    /// The action id is not within `[0, ACTION_SPACE_SIZE)` — a caller
    /// contract violation, not a representable (even if illegal) action.
    ActionIdOutOfRange(ActionId),
}

fn winner_reward(winner: Color) -> i8 {
    match winner {
        Color::Black => 1,
        Color::White => -1,
    }
}

/// A Lion entering the opponent's home row wins on the spot.
fn is_try(piece: Piece, to: Square) -> bool {
    (piece == Piece::BlackLion && row_of(to) == 0)
        || (piece == Piece::WhiteLion && row_of(to) == 3)
}

/// Apply one action id to a position.
///
/// An id whose implied origin lies off the board, or that the legality
/// filter rejects, forfeits the game for the side to move. A position with
/// no legal actions therefore resolves itself on the next attempted action;
/// there is no separate checkmate or stalemate state.
///
/// The input state is never mutated; the returned state is a fresh value.
pub fn step(state: &State, action: ActionId) -> Result<StepOutcome, StepError> {
    if action as usize >= ACTION_SPACE_SIZE {
        return Err(StepError::ActionIdOutOfRange(action));
    }
    let mover = state.turn;
    let legal = legal_actions(state);

    let decoded = match decode_action(action, &state.board, mover) {
        Some(act) if legal.contains(action) => act,
        _ => {
            // Forfeit: board and reserves stay as they are.
            let mut next = state.clone();
            next.turn = mover.opponent();
            next.check = None;
            return Ok(StepOutcome {
                state: next,
                reward: winner_reward(mover.opponent()),
                terminated: true,
            });
        }
    };

    let mut next = state.clone();
    let (destination, tried) = match decoded {
        Action::Move {
            from,
            to,
            piece,
            captured,
            promote,
        } => {
            apply_move(&mut next, from, to, piece, captured, promote);
            (to, is_try(piece, to))
        }
        Action::Drop { piece, to } => {
            apply_drop(&mut next, piece, to);
            (to, false)
        }
    };
    next.turn = mover.opponent();

    if tried {
        next.check = None;
        return Ok(StepOutcome {
            state: next,
            reward: winner_reward(mover),
            terminated: true,
        });
    }

    next.check = is_in_check(&next.board, next.turn).then_some(destination);
    Ok(StepOutcome {
        state: next,
        reward: 0,
        terminated: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_legal(legal: ActionSet, rng: &mut StdRng) -> Option<ActionId> {
        let ids: Vec<ActionId> = legal.iter().collect();
        if ids.is_empty() {
            None
        } else {
            Some(ids[rng.random_range(0..ids.len())])
        }
    }

    /// Play random legal moves, invoking `inspect` on every visited state.
    fn random_playout(seed: u64, max_steps: usize, mut inspect: impl FnMut(&State)) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = init();
        for _ in 0..max_steps {
            inspect(&state);
            let Some(action) = random_legal(legal_actions(&state), &mut rng) else {
                break;
            };
            let outcome = step(&state, action).expect("legal ids are in range");
            state = outcome.state;
            if outcome.terminated {
                inspect(&state);
                break;
            }
        }
    }

    // =========================================================================
    // Movement pattern table
    // =========================================================================

    /// Independent formulation of the movement rules, by (column, row) delta.
    fn reachable_by_rule(piece: Piece, from: Square, to: Square) -> bool {
        let Some(owner) = piece.owner() else {
            return false;
        };
        let mut dc = column_of(to) as i8 - column_of(from) as i8;
        let mut dr = row_of(to) as i8 - row_of(from) as i8;
        if owner == Color::White {
            dc = -dc;
            dr = -dr;
        }
        let adjacent = dc.abs() <= 1 && dr.abs() <= 1 && (dc, dr) != (0, 0);
        match piece {
            Piece::BlackChick | Piece::WhiteChick => (dc, dr) == (0, -1),
            Piece::BlackGiraffe | Piece::WhiteGiraffe => adjacent && (dc == 0 || dr == 0),
            Piece::BlackElephant | Piece::WhiteElephant => adjacent && dc != 0 && dr != 0,
            Piece::BlackLion | Piece::WhiteLion => adjacent,
            Piece::BlackHen | Piece::WhiteHen => adjacent && !(dr == 1 && dc != 0),
            Piece::Empty => false,
        }
    }

    #[test]
    fn move_table_matches_movement_rules() {
        for from in 0..NUM_SQUARES as Square {
            for piece_idx in 0..PIECE_KINDS as u8 {
                let piece = Piece::from_index(piece_idx).unwrap();
                for to in 0..NUM_SQUARES as Square {
                    assert_eq!(
                        MOVE_TABLE[from as usize][piece.index()].contains(to),
                        reachable_by_rule(piece, from, to),
                        "table disagrees for {piece:?} from {from} to {to}"
                    );
                }
            }
        }
    }

    #[test]
    fn move_offsets_match_deltas() {
        for (direction, &(dc, dr)) in DIR_DELTAS.iter().enumerate() {
            assert_eq!(MOVE_OFFSETS[direction], 4 * dc + dr);
        }
    }

    #[test]
    fn move_table_spot_checks() {
        // Black lion on its starting square
        let lion = MOVE_TABLE[7][Piece::BlackLion.index()];
        let expected = SquareSet::EMPTY.with(2).with(3).with(6).with(10).with(11);
        assert_eq!(lion, expected);
        // A chick on its own far row has nowhere left to go
        assert!(MOVE_TABLE[4][Piece::BlackChick.index()].is_empty()); // row 0
        assert!(MOVE_TABLE[7][Piece::WhiteChick.index()].is_empty()); // row 3
        // Empty squares contribute nothing
        for sq in 0..NUM_SQUARES {
            assert!(MOVE_TABLE[sq][Piece::Empty.index()].is_empty());
        }
    }

    // =========================================================================
    // Initial position
    // =========================================================================

    #[test]
    fn init_position_layout() {
        let state = init();
        assert_eq!(state.turn, Color::Black);
        assert_eq!(state.board, INIT_BOARD);
        assert_eq!(state.hand, [0; HAND_KINDS]);
        assert_eq!(state.check, None);
        assert_eq!(
            state.pseudo_legal,
            rebuild_pseudo_legal(&state.board, &state.hand)
        );
        // Move contributions per side: chick 1, giraffe 2, elephant 1, lion 5
        assert_eq!(state.pseudo_legal[0].count(), 9);
        assert_eq!(state.pseudo_legal[1].count(), 9);
    }

    #[test]
    fn init_position_has_four_legal_moves() {
        let legal: Vec<ActionId> = legal_actions(&init()).iter().collect();
        // giraffe up, chick takes chick, lion up-left, lion up-right
        assert_eq!(
            legal,
            vec![
                action_id(0, 2),
                action_id(0, 5),
                action_id(1, 10),
                action_id(2, 2),
            ]
        );
    }

    #[test]
    fn legal_actions_is_pure() {
        let state = init();
        let snapshot = state.clone();
        let first = legal_actions(&state);
        let second = legal_actions(&state);
        assert_eq!(first, second);
        assert_eq!(state, snapshot);
    }

    // =========================================================================
    // Action codec
    // =========================================================================

    #[test]
    fn codec_round_trips_every_legal_action() {
        for seed in 0..8u64 {
            random_playout(seed, 150, |state| {
                for id in legal_actions(state).iter() {
                    let action =
                        decode_action(id, &state.board, state.turn).expect("legal ids decode");
                    assert_eq!(encode_action(&action, state.turn), id);
                }
            });
        }
    }

    #[test]
    fn decode_rejects_off_board_origins() {
        let state = init();
        // Direction 3 into column 0 would originate outside the board.
        assert_eq!(
            decode_action(action_id(3, 1), &state.board, Color::Black),
            None
        );
        // The same id is well-formed for White, whose offsets are mirrored.
        assert!(decode_action(action_id(3, 1), &state.board, Color::White).is_some());
    }

    #[test]
    fn decode_drop_ids() {
        let state = init();
        assert_eq!(
            decode_action(action_id(9, 5), &state.board, Color::Black),
            Some(Action::Drop {
                piece: Piece::BlackChick,
                to: 5
            })
        );
        assert_eq!(
            decode_action(action_id(14, 2), &state.board, Color::White),
            Some(Action::Drop {
                piece: Piece::WhiteElephant,
                to: 2
            })
        );
    }

    // =========================================================================
    // Incremental maintenance vs. full rebuild
    // =========================================================================

    #[test]
    fn incremental_masks_match_full_rebuild() {
        for seed in 0..10u64 {
            random_playout(seed, 250, |state| {
                assert_eq!(
                    state.pseudo_legal,
                    rebuild_pseudo_legal(&state.board, &state.hand),
                    "masks drifted from rebuild on\n{:?}",
                    state.board
                );
            });
        }
    }

    #[test]
    fn chick_push_updates_only_touched_bits() {
        let state = init();
        // Black's chick takes the white chick one step ahead.
        let outcome = step(&state, action_id(0, 5)).unwrap();
        let next = &outcome.state;
        assert!(!outcome.terminated);
        assert_eq!(next.board[6], Piece::Empty);
        assert_eq!(next.board[5], Piece::BlackChick);
        assert_eq!(next.hand[0], 1);

        let mut expected_black = state.pseudo_legal[0];
        expected_black.remove(action_id(0, 5)); // old square no longer pushes
        expected_black.insert(action_id(0, 4)); // new square pushes into row 0
        expected_black.insert(action_id(8, 4)); // ... optionally promoting
        expected_black.set_row(9, SquareSet::ALL); // a chick sits in reserve now
        assert_eq!(next.pseudo_legal[0], expected_black);

        let mut expected_white = state.pseudo_legal[1];
        expected_white.remove(action_id(0, 6)); // the captured chick's push
        assert_eq!(next.pseudo_legal[1], expected_white);

        // The push attacks the white lion: check, from the chick's square.
        assert_eq!(next.turn, Color::White);
        assert_eq!(next.check, Some(5));
    }

    #[test]
    fn check_restricts_white_to_escapes_and_captures() {
        let state = init();
        let next = step(&state, action_id(0, 5)).unwrap().state;
        let legal: Vec<ActionId> = legal_actions(&next).iter().collect();
        // Lion takes the chick, lion sidesteps twice, elephant takes the chick.
        assert_eq!(
            legal,
            vec![
                action_id(0, 5),
                action_id(1, 1),
                action_id(2, 5),
                action_id(2, 9),
            ]
        );
    }

    // =========================================================================
    // Legality soundness
    // =========================================================================

    #[test]
    fn legal_actions_never_leave_own_lion_attacked() {
        for seed in 0..8u64 {
            random_playout(seed, 120, |state| {
                for id in legal_actions(state).iter() {
                    let outcome = step(state, id).expect("legal ids are in range");
                    assert!(
                        !is_in_check(&outcome.state.board, state.turn),
                        "action {id} left {:?}'s lion attacked",
                        state.turn
                    );
                }
            });
        }
    }

    #[test]
    fn drops_never_resolve_check() {
        // Black's king is checked by a white hen; a chick waits in reserve.
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[7] = Piece::BlackLion;
        board[6] = Piece::WhiteHen;
        board[0] = Piece::WhiteLion;
        let state = position_from(Color::Black, board, [1, 0, 0, 0, 0, 0]);
        assert_eq!(state.check, Some(6));

        // Capturing the undefended hen is the only way out; no drop survives.
        let legal: Vec<ActionId> = legal_actions(&state).iter().collect();
        assert_eq!(legal, vec![action_id(0, 6)]);
    }

    #[test]
    fn captured_hen_demotes_to_reserve_chick() {
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[7] = Piece::BlackLion;
        board[6] = Piece::WhiteHen;
        board[0] = Piece::WhiteLion;
        let state = position_from(Color::Black, board, [0; HAND_KINDS]);

        let outcome = step(&state, action_id(0, 6)).unwrap();
        assert!(!outcome.terminated);
        let next = &outcome.state;
        assert_eq!(next.board[6], Piece::BlackLion);
        assert_eq!(next.hand[0], 1); // the hen came back as a chick
        assert_eq!(next.pseudo_legal[0].row(9), SquareSet::ALL);
        assert_eq!(
            next.pseudo_legal,
            rebuild_pseudo_legal(&next.board, &next.hand)
        );
    }

    // =========================================================================
    // Promotion
    // =========================================================================

    #[test]
    fn promoting_push_yields_a_hen() {
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[5] = Piece::BlackChick;
        board[7] = Piece::BlackLion;
        board[0] = Piece::WhiteLion;
        let state = position_from(Color::Black, board, [0; HAND_KINDS]);

        let outcome = step(&state, action_id(8, 4)).unwrap();
        assert!(!outcome.terminated);
        let next = &outcome.state;
        assert_eq!(next.board[4], Piece::BlackHen);
        // The fresh hen attacks the white lion along row 0.
        assert_eq!(next.check, Some(4));
        assert_eq!(
            next.pseudo_legal,
            rebuild_pseudo_legal(&next.board, &next.hand)
        );
    }

    #[test]
    fn declined_promotion_keeps_the_chick() {
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[5] = Piece::BlackChick;
        board[7] = Piece::BlackLion;
        board[0] = Piece::WhiteLion;
        let state = position_from(Color::Black, board, [0; HAND_KINDS]);

        let outcome = step(&state, action_id(0, 4)).unwrap();
        let next = &outcome.state;
        assert_eq!(next.board[4], Piece::BlackChick);
        // A chick on the far row has no moves and gives no check.
        assert_eq!(next.check, None);
        assert_eq!(
            next.pseudo_legal,
            rebuild_pseudo_legal(&next.board, &next.hand)
        );
    }

    // =========================================================================
    // Drops
    // =========================================================================

    #[test]
    fn drop_consumes_reserve_and_clears_exhausted_row() {
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[7] = Piece::BlackLion;
        board[0] = Piece::WhiteLion;
        let state = position_from(Color::Black, board, [1, 0, 0, 0, 0, 0]);

        // Drops are allowed exactly on the empty squares.
        let legal = legal_actions(&state);
        for to in 0..NUM_SQUARES as Square {
            assert_eq!(
                legal.contains(action_id(9, to)),
                state.board[to as usize] == Piece::Empty
            );
        }

        let outcome = step(&state, action_id(9, 5)).unwrap();
        let next = &outcome.state;
        assert_eq!(next.board[5], Piece::BlackChick);
        assert_eq!(next.hand[0], 0);
        assert!(next.pseudo_legal[0].row(9).is_empty());
        assert_eq!(
            next.pseudo_legal,
            rebuild_pseudo_legal(&next.board, &next.hand)
        );
    }

    // =========================================================================
    // Termination: try rule and forfeiture
    // =========================================================================

    #[test]
    fn lion_reaching_far_row_wins_even_out_of_check() {
        // The black lion is in check but can step into the far row.
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[1] = Piece::BlackLion;
        board[2] = Piece::WhiteGiraffe;
        board[8] = Piece::WhiteLion;
        let state = position_from(Color::Black, board, [0; HAND_KINDS]);
        assert_eq!(state.check, Some(2));

        let outcome = step(&state, action_id(0, 0)).unwrap();
        assert!(outcome.terminated);
        assert_eq!(outcome.reward, 1);
        assert_eq!(outcome.state.board[0], Piece::BlackLion);
    }

    #[test]
    fn checkmate_means_every_action_forfeits() {
        // Black's lion is cornered: the checker is defended and every escape
        // square is covered or blocked by black's own chick.
        let mut board = [Piece::Empty; NUM_SQUARES];
        board[1] = Piece::WhiteLion;
        board[2] = Piece::WhiteGiraffe;
        board[3] = Piece::BlackLion;
        board[7] = Piece::BlackChick;
        let state = position_from(Color::Black, board, [0; HAND_KINDS]);
        assert_eq!(state.check, Some(2));
        assert!(legal_actions(&state).is_empty());

        for id in [0, action_id(0, 2), action_id(9, 10), 179] {
            let outcome = step(&state, id).unwrap();
            assert!(outcome.terminated);
            assert_eq!(outcome.reward, -1);
            // Forfeits leave the board untouched.
            assert_eq!(outcome.state.board, state.board);
        }
    }

    #[test]
    fn malformed_origin_forfeits_immediately() {
        let state = init();
        // Decodes to an origin outside the board for Black.
        let outcome = step(&state, action_id(3, 1)).unwrap();
        assert!(outcome.terminated);
        assert_eq!(outcome.reward, -1);
    }

    #[test]
    fn pseudo_legal_but_filtered_action_forfeits() {
        let state = init();
        // The giraffe stepping onto its own lion is pseudo-legal but filtered.
        let outcome = step(&state, action_id(3, 7)).unwrap();
        assert!(outcome.terminated);
        assert_eq!(outcome.reward, -1);
    }

    #[test]
    fn out_of_range_ids_are_contract_violations() {
        let state = init();
        assert_eq!(
            step(&state, ACTION_SPACE_SIZE as ActionId),
            Err(StepError::ActionIdOutOfRange(ACTION_SPACE_SIZE as ActionId))
        );
        assert_eq!(
            step(&state, u16::MAX),
            Err(StepError::ActionIdOutOfRange(u16::MAX))
        );
    }

    // =========================================================================
    // Full playouts
    // =========================================================================

    #[test]
    fn random_playouts_stay_consistent() {
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = init();
            for _ in 0..300 {
                let Some(action) = random_legal(legal_actions(&state), &mut rng) else {
                    // No legal actions: any id forfeits in the opponent's favor.
                    let outcome = step(&state, 0).unwrap();
                    assert!(outcome.terminated);
                    assert_eq!(outcome.reward, winner_reward(state.turn.opponent()));
                    break;
                };
                let outcome = step(&state, action).unwrap();
                if outcome.terminated {
                    assert!(outcome.reward == 1 || outcome.reward == -1);
                    break;
                }
                assert_eq!(outcome.reward, 0);
                state = outcome.state;
            }
        }
    }
}
