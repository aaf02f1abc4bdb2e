use crate::{Card, Group, MAX_COPIES, Suit};

/// Cards available for grouping, tracked as a 13x4 count matrix.
///
/// Each cell holds 0, 1 or 2 (two decks). `total` is always the sum of all
/// cells. Search code provisionally removes a group and must add it back
/// before returning, so the matrix a frame hands back is the one it received.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardPool {
    counts: [[u8; 4]; 13],
    total: usize,
}

impl CardPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards<'a, I>(cards: I) -> Self
    where
        I: IntoIterator<Item = &'a Card>,
    {
        let mut pool = Self::new();
        for card in cards {
            pool.add(*card);
        }
        pool
    }

    pub fn add(&mut self, card: Card) {
        let cell = &mut self.counts[card.rank() as usize - 1][card.suit().index()];
        assert!(*cell < MAX_COPIES, "Cannot add {}: already {} copies", card, MAX_COPIES);
        *cell += 1;
        self.total += 1;
    }

    pub fn remove(&mut self, card: Card) {
        let cell = &mut self.counts[card.rank() as usize - 1][card.suit().index()];
        assert!(*cell > 0, "Cannot remove {}: count is 0", card);
        *cell -= 1;
        self.total -= 1;
    }

    /// Count of (rank, suit) currently available
    pub fn get(&self, rank: u8, suit: Suit) -> u8 {
        self.counts[rank as usize - 1][suit.index()]
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn add_group(&mut self, group: &Group) {
        for card in group.cards() {
            self.add(*card);
        }
    }

    pub fn remove_group(&mut self, group: &Group) {
        for card in group.cards() {
            self.remove(*card);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{c, cards, g};

    #[test]
    fn test_add_remove() {
        let mut pool = CardPool::new();
        pool.add(c("7S"));
        pool.add(c("7S"));
        assert_eq!(pool.get(7, Suit::Spades), 2);
        assert_eq!(pool.total(), 2);

        pool.remove(c("7S"));
        assert_eq!(pool.get(7, Suit::Spades), 1);
        assert_eq!(pool.total(), 1);
        assert!(!pool.is_empty());
    }

    #[test]
    fn test_from_cards() {
        let pool = CardPool::from_cards(&cards("7S 7H 7D"));
        assert_eq!(pool.total(), 3);
        assert_eq!(pool.get(7, Suit::Spades), 1);
        assert_eq!(pool.get(7, Suit::Clubs), 0);
    }

    #[test]
    fn test_group_round_trip_restores_matrix() {
        let mut pool = CardPool::from_cards(&cards("5C 6C 7C 7S 7H"));
        let original = pool.clone();
        let run = g("5C 6C 7C");

        pool.remove_group(&run);
        assert_eq!(pool.total(), 2);
        assert_eq!(pool.get(6, Suit::Clubs), 0);

        pool.add_group(&run);
        assert_eq!(pool, original);
    }

    #[test]
    #[should_panic(expected = "count is 0")]
    fn test_remove_missing_card_panics() {
        let mut pool = CardPool::new();
        pool.remove(c("3D"));
    }

    #[test]
    #[should_panic(expected = "already 2 copies")]
    fn test_third_copy_panics() {
        let _ = CardPool::from_cards(&cards("3D 3D 3D"));
    }
}
