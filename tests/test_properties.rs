//! Property-based tests for grouping, solving and verification.

use proptest::prelude::*;
use std::time::Duration;

use makiaveli_solver::solver::{PartitionOutcome, search_partition};
use makiaveli_solver::{
    Card, CardPool, Deadline, Group, Suit, check_copy_limit, is_valid_group, solve_hand,
    solve_partition, verify_solution,
};

/// Strategy: any card.
fn card_strategy() -> impl Strategy<Value = Card> {
    (1..=13u8, 0..4usize).prop_map(|(rank, suit)| Card::new(rank, Suit::from_index(suit)))
}

/// Strategy: a valid set of 3 or 4 distinct suits.
fn set_strategy() -> impl Strategy<Value = Group> {
    (1..=13u8, prop::sample::subsequence(vec![0usize, 1, 2, 3], 3..=4)).prop_map(|(rank, suits)| {
        Group::new(suits.into_iter().map(|s| Card::new(rank, Suit::from_index(s))).collect())
    })
}

/// Strategy: a valid run of 3-5 cards, ace-high allowed.
fn run_strategy() -> impl Strategy<Value = Group> {
    (0..4usize, 1..=12u8, 3..=5u8)
        .prop_filter("run past the ace", |&(_, start, len)| start + len - 1 <= 14)
        .prop_map(|(suit, start, len)| {
            Group::new(
                (start..start + len)
                    .map(|r| Card::new(if r == 14 { 1 } else { r }, Suit::from_index(suit)))
                    .collect(),
            )
        })
}

fn group_strategy() -> impl Strategy<Value = Group> {
    prop_oneof![set_strategy(), run_strategy()]
}

/// Strategy: 1-4 valid groups that fit in two decks.
fn layout_strategy() -> impl Strategy<Value = Vec<Group>> {
    prop::collection::vec(group_strategy(), 1..=4).prop_filter("more than two copies", |groups| {
        let cards: Vec<Card> = groups.iter().flat_map(|g| g.cards().to_vec()).collect();
        check_copy_limit(&cards).is_ok()
    })
}

fn flatten(groups: &[Group]) -> Vec<Card> {
    groups.iter().flat_map(|g| g.cards().to_vec()).collect()
}

proptest! {
    // 1. Fewer than three cards never form a group
    #[test]
    fn short_groups_invalid(cards in prop::collection::vec(card_strategy(), 0..3)) {
        prop_assert!(!is_valid_group(&cards));
    }

    // 2. A multiset built from valid groups is always partitioned
    #[test]
    fn solver_finds_known_partition(layout in layout_strategy()) {
        let cards = flatten(&layout);
        let mut pool = CardPool::from_cards(&cards);
        let partition = solve_partition(&mut pool, None);
        prop_assert!(partition.is_some(), "no partition for {:?}", layout);
        prop_assert!(verify_solution(&cards, &partition.unwrap()).is_ok());
    }

    // 3. A layout verifies against its own cards, in any card order
    #[test]
    fn verify_accepts_own_cards(layout in layout_strategy()) {
        let mut cards = flatten(&layout);
        cards.reverse();
        prop_assert!(verify_solution(&cards, &layout).is_ok());
    }

    // 4. Verification leaves its inputs untouched
    #[test]
    fn verify_is_pure(layout in layout_strategy(), extra in card_strategy()) {
        let mut cards = flatten(&layout);
        cards.push(extra);
        let (cards_before, layout_before) = (cards.clone(), layout.clone());
        prop_assert!(verify_solution(&cards, &layout).is_err());
        prop_assert_eq!(cards, cards_before);
        prop_assert_eq!(layout, layout_before);
    }

    // 5. The pool a search receives is the pool it leaves behind
    #[test]
    fn search_restores_pool(cards in prop::collection::vec(card_strategy(), 0..12)) {
        prop_assume!(check_copy_limit(&cards).is_ok());
        let mut pool = CardPool::from_cards(&cards);
        let before = pool.clone();
        let outcome = search_partition(&mut pool, Deadline::after(Duration::from_secs(5)));
        prop_assert_eq!(&pool, &before);
        if let PartitionOutcome::Found(groups) = outcome {
            prop_assert!(verify_solution(&cards, &groups).is_ok());
        }
    }

    // 6. A hand that is itself a group is always playable, and the layout verifies
    #[test]
    fn hand_group_always_playable(hand in group_strategy(), floor in layout_strategy()) {
        let mut all = flatten(&floor);
        all.extend_from_slice(hand.cards());
        prop_assume!(check_copy_limit(&all).is_ok());

        let solution = solve_hand(hand.cards(), &floor, &[], Duration::from_secs(10));
        prop_assert!(solution.solvable);
        prop_assert!(solution.verified(hand.cards(), &floor, &[]).is_ok());
    }
}
