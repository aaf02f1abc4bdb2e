use std::collections::BTreeMap;
use std::fmt;

pub mod config;
pub mod planner;
pub mod pool;
pub mod solver;
#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

pub use config::SolverConfig;
pub use planner::{FloorSource, Step, plan_moves, plan_steps, planning_floor};
pub use pool::CardPool;
pub use solver::{
    Deadline, HandSolution, SolveError, VerifyError, solve_hand, solve_hand_with_config,
    solve_partition, verify_solution,
};

/// Maximum number of copies of one (rank, suit) in play: the game uses two decks.
pub const MAX_COPIES: u8 = 2;

/// One of the four suits, in canonical index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// Index 0-3, used as the column of a [`CardPool`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index]
    }

    pub fn letter(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'S' => Some(Suit::Spades),
            'H' => Some(Suit::Hearts),
            'D' => Some(Suit::Diamonds),
            'C' => Some(Suit::Clubs),
            _ => None,
        }
    }
}

/// A playing card represented as a u8.
/// - Bits 0-1: Suit (00 = Spades, 01 = Hearts, 10 = Diamonds, 11 = Clubs)
/// - Bits 2-5: Rank (1 = Ace ... 13 = King)
///
/// The packing makes the derived ordering (rank, suit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Card(u8);

impl Card {
    const SUIT_MASK: u8 = 0b0000_0011;
    const RANK_MASK: u8 = 0b0011_1100;
    const RANK_SHIFT: u8 = 2;

    /// Create a new card from rank (1-13) and suit
    pub fn new(rank: u8, suit: Suit) -> Self {
        assert!((1..=13).contains(&rank), "Rank must be 1-13");
        Card((rank << Self::RANK_SHIFT) | suit as u8)
    }

    /// Rank 1-13, where 1 is the ace
    pub fn rank(&self) -> u8 {
        (self.0 & Self::RANK_MASK) >> Self::RANK_SHIFT
    }

    pub fn suit(&self) -> Suit {
        Suit::from_index((self.0 & Self::SUIT_MASK) as usize)
    }

    /// Parse a card from its notation: rank (A, 2-10, J, Q, K) followed by a
    /// suit letter (S, H, D, C). Case-insensitive: "7S", "AH", "10D", "kc".
    pub fn parse(text: &str) -> Result<Self, CardError> {
        let text = text.trim();
        let mut chars = text.chars();
        let suit_char = chars.next_back().ok_or_else(|| CardError::Invalid(text.to_string()))?;
        let rank_str = chars.as_str();
        if rank_str.is_empty() {
            return Err(CardError::Invalid(text.to_string()));
        }

        let suit = Suit::from_letter(suit_char)
            .ok_or_else(|| CardError::InvalidSuit(text.to_string()))?;
        let rank = match rank_str.to_ascii_uppercase().as_str() {
            "A" => 1,
            "J" => 11,
            "Q" => 12,
            "K" => 13,
            digits => digits
                .parse::<u8>()
                .map_err(|_| CardError::Invalid(text.to_string()))?,
        };

        if !(1..=13).contains(&rank) {
            return Err(CardError::Invalid(text.to_string()));
        }

        Ok(Card::new(rank, suit))
    }

    /// ASCII notation accepted by [`Card::parse`], e.g. "AS", "10C"
    pub fn code(&self) -> String {
        format!("{}{}", rank_name(self.rank()), self.suit().letter())
    }

    /// Sort key for listing cards to a player: rank, then suit letter
    /// (C, D, H, S). Independent of the (rank, suit index) `Ord`.
    pub fn display_key(&self) -> (u8, char) {
        (self.rank(), self.suit().letter())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", rank_name(self.rank()), self.suit().symbol())
    }
}

fn rank_name(rank: u8) -> String {
    match rank {
        1 => "A".to_string(),
        11 => "J".to_string(),
        12 => "Q".to_string(),
        13 => "K".to_string(),
        n => n.to_string(),
    }
}

/// Parse whitespace-separated card notation, e.g. "3S 4S 7D"
pub fn parse_cards(text: &str) -> Result<Vec<Card>, CardError> {
    text.split_whitespace().map(Card::parse).collect()
}

/// Reject card collections holding more copies of a card than two decks allow.
pub fn check_copy_limit(cards: &[Card]) -> Result<(), CardError> {
    let mut counts: BTreeMap<Card, u8> = BTreeMap::new();
    for card in cards {
        let count = counts.entry(*card).or_insert(0);
        *count += 1;
        if *count > MAX_COPIES {
            return Err(CardError::TooManyCopies(*card));
        }
    }
    Ok(())
}

/// Errors from card notation and card-collection checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    Invalid(String),
    InvalidSuit(String),
    TooManyCopies(Card),
}

impl fmt::Display for CardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardError::Invalid(text) => write!(f, "Invalid card: {}", text),
            CardError::InvalidSuit(text) => {
                write!(f, "Invalid suit in '{}'. Use S, H, D, or C.", text)
            }
            CardError::TooManyCopies(card) => {
                write!(f, "More than {} copies of {}", MAX_COPIES, card)
            }
        }
    }
}

impl std::error::Error for CardError {}

/// Kind of a valid group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Same rank, distinct suits, 3-4 cards
    Set,
    /// Same suit, consecutive ranks, ace low or high
    Run,
}

/// Same rank, pairwise distinct suits, 3+ cards (at most 4 follows from the suits).
pub fn is_valid_set(cards: &[Card]) -> bool {
    if cards.len() < 3 {
        return false;
    }
    let rank = cards[0].rank();
    if cards.iter().any(|c| c.rank() != rank) {
        return false;
    }
    let mut seen = [false; 4];
    for card in cards {
        let slot = &mut seen[card.suit().index()];
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}

/// Same suit, consecutive distinct ranks, 3+ cards. The ace may sit below the
/// 2 or above the king but a run never wraps through it (K, A, 2 is invalid).
pub fn is_valid_run(cards: &[Card]) -> bool {
    if cards.len() < 3 {
        return false;
    }
    let suit = cards[0].suit();
    if cards.iter().any(|c| c.suit() != suit) {
        return false;
    }

    let mut ranks: Vec<u8> = cards.iter().map(|c| c.rank()).collect();
    ranks.sort_unstable();
    if ranks.windows(2).any(|w| w[0] == w[1]) {
        return false;
    }
    if is_consecutive(&ranks) {
        return true;
    }

    if ranks.contains(&1) && ranks.contains(&13) {
        let mut high: Vec<u8> = ranks.iter().map(|&r| if r == 1 { 14 } else { r }).collect();
        high.sort_unstable();
        return is_consecutive(&high);
    }
    false
}

fn is_consecutive(sorted: &[u8]) -> bool {
    sorted.windows(2).all(|w| w[0] + 1 == w[1])
}

pub fn is_valid_group(cards: &[Card]) -> bool {
    is_valid_set(cards) || is_valid_run(cards)
}

/// A group of cards on the table.
///
/// Groups are not validated at construction: floor input may hold lone cross
/// cards. Two groups with the same card multiset are the same group.
#[derive(Debug, Clone, Default)]
pub struct Group(Vec<Card>);

impl Group {
    pub fn new(cards: Vec<Card>) -> Self {
        Group(cards)
    }

    /// Parse a group from whitespace-separated notation, e.g. "7S 7H 7C"
    pub fn parse(text: &str) -> Result<Self, CardError> {
        parse_cards(text).map(Group)
    }

    pub fn cards(&self) -> &[Card] {
        &self.0
    }

    pub fn kind(&self) -> Option<GroupKind> {
        if is_valid_set(&self.0) {
            Some(GroupKind::Set)
        } else if is_valid_run(&self.0) {
            Some(GroupKind::Run)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind().is_some()
    }

    /// Cards in display order: by [`Card::display_key`], except that an
    /// ace-high run puts the ace after the king.
    pub fn display_order(&self) -> Vec<Card> {
        let mut cards = self.0.clone();
        let single_suit = cards.windows(2).all(|w| w[0].suit() == w[1].suit());
        let has = |rank: u8| self.0.iter().any(|c| c.rank() == rank);
        if !cards.is_empty() && single_suit && has(1) && has(13) && !has(2) {
            cards.sort_by_key(|c| if c.rank() == 1 { 14 } else { c.rank() });
        } else {
            cards.sort_by_key(Card::display_key);
        }
        cards
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        let mut a = self.0.clone();
        let mut b = other.0.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl Eq for Group {}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", join_cards(&self.display_order()))
    }
}

/// Render cards as "A♠, 2♠, 3♠"
pub fn join_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Card, Group};

    pub fn c(text: &str) -> Card {
        Card::parse(text).unwrap()
    }

    pub fn cards(text: &str) -> Vec<Card> {
        super::parse_cards(text).unwrap()
    }

    pub fn g(text: &str) -> Group {
        Group::parse(text).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{c, cards, g};
    use super::*;

    #[test]
    fn test_card_parse() {
        assert_eq!(c("7S"), Card::new(7, Suit::Spades));
        assert_eq!(c("AH"), Card::new(1, Suit::Hearts));
        assert_eq!(c("KD"), Card::new(13, Suit::Diamonds));
        assert_eq!(c("10C"), Card::new(10, Suit::Clubs));
        assert_eq!(c("jh"), Card::new(11, Suit::Hearts));

        assert!(Card::parse("").is_err());
        assert!(Card::parse("S").is_err());
        assert!(Card::parse("14S").is_err());
        assert!(Card::parse("0H").is_err());
        assert_eq!(
            Card::parse("7X"),
            Err(CardError::InvalidSuit("7X".to_string()))
        );
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(1, Suit::Spades).to_string(), "A♠");
        assert_eq!(Card::new(13, Suit::Diamonds).to_string(), "K♦");
        assert_eq!(Card::new(10, Suit::Clubs).to_string(), "10♣");
        assert_eq!(Card::new(7, Suit::Hearts).to_string(), "7♥");
        assert_eq!(Card::new(12, Suit::Clubs).code(), "QC");
    }

    #[test]
    fn test_card_ordering_is_rank_then_suit() {
        assert!(c("2C") < c("3S"));
        assert!(c("7S") < c("7H"));
        assert!(c("7D") < c("7C"));
    }

    #[test]
    fn test_valid_set() {
        assert!(is_valid_set(&cards("7S 7H 7D")));
        assert!(is_valid_set(&cards("7S 7H 7D 7C")));
        assert!(!is_valid_set(&cards("7S 7H")));
        assert!(!is_valid_set(&cards("7S 7S 7H")));
        assert!(!is_valid_set(&cards("7S 8H 7D")));
        assert!(!is_valid_set(&cards("7S 7H 7D 7C 7S")));
    }

    #[test]
    fn test_valid_run() {
        assert!(is_valid_run(&cards("5C 6C 7C")));
        assert!(is_valid_run(&cards("8C 5C 7C 6C")));
        assert!(is_valid_run(&cards("AS 2S 3S")));
        assert!(is_valid_run(&cards("QS KS AS")));
        assert!(is_valid_run(&cards("JS QS KS AS")));
        assert!(is_valid_run(&cards("AS 2S 3S 4S 5S 6S 7S 8S 9S 10S JS QS KS")));
    }

    #[test]
    fn test_invalid_run() {
        // K, A, 2 wraps through the ace
        assert!(!is_valid_run(&cards("KS AS 2S")));
        assert!(!is_valid_run(&cards("5C 6H 7C")));
        assert!(!is_valid_run(&cards("5C 5C 6C")));
        assert!(!is_valid_run(&cards("5C 6C")));
        assert!(!is_valid_run(&cards("5C 6C 8C")));
    }

    #[test]
    fn test_group_kind() {
        assert_eq!(g("7S 7H 7D").kind(), Some(GroupKind::Set));
        assert_eq!(g("QS KS AS").kind(), Some(GroupKind::Run));
        assert_eq!(g("2S").kind(), None);
        assert!(is_valid_group(&cards("3H 4H 5H")));
    }

    #[test]
    fn test_group_display() {
        assert_eq!(g("AS QS KS").to_string(), "[Q♠, K♠, A♠]");
        assert_eq!(g("3S AS 2S").to_string(), "[A♠, 2♠, 3♠]");
        assert_eq!(g("7C 7S 7H").to_string(), "[7♣, 7♥, 7♠]");
        assert_eq!(g("9D 9S 9C 9H").to_string(), "[9♣, 9♦, 9♥, 9♠]");
        assert_eq!(Group::default().to_string(), "[]");
    }

    #[test]
    fn test_display_order_differs_from_scan_order() {
        let group = g("7S 7H 7C");
        assert_eq!(group.display_order(), cards("7C 7H 7S"));
        // Ord keeps suit index order for the solver
        assert!(c("7S") < c("7C"));
        assert_eq!(g("2H AH 3H").display_order(), cards("AH 2H 3H"));
    }

    #[test]
    fn test_group_equality_ignores_order() {
        assert_eq!(g("3S 4S 5S"), g("5S 3S 4S"));
        assert_ne!(g("3S 4S 5S"), g("3S 4S 5S 6S"));
        assert_ne!(g("7S 7S 7H"), g("7S 7H 7H"));
    }

    #[test]
    fn test_check_copy_limit() {
        assert!(check_copy_limit(&cards("7S 7S 7H")).is_ok());
        assert_eq!(
            check_copy_limit(&cards("7S 7S 7S")),
            Err(CardError::TooManyCopies(c("7S")))
        );
    }
}
