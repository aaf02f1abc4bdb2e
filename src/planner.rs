//! Human-readable steps from an initial floor to a solver layout.
//!
//! Target groups have no identity of their own, so each is matched to the
//! floor group it overlaps most. Cards a matched floor group does not keep
//! are released, and the steps then say which hand or released cards each
//! target group needs.

use crate::solver::incorporated_cross;
use crate::{Card, Group, join_cards};
use std::collections::BTreeMap;
use std::fmt;

/// Cards moved out of one floor group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorSource {
    /// Index of the origin group in the initial floor
    pub group: usize,
    pub cards: Vec<Card>,
}

/// One move of the re-lay, describing cards by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A group with no counterpart on the initial floor
    NewGroup {
        group: Group,
        from_hand: Vec<Card>,
        from_floor: Vec<FloorSource>,
        /// Floor cards that could not be traced to a released origin group
        from_floor_unattributed: Vec<Card>,
    },

    /// An initial floor group that gains or loses cards
    Reshape {
        floor_index: usize,
        before: Group,
        after: Group,
        from_hand: Vec<Card>,
        from_floor: Vec<FloorSource>,
        from_floor_unattributed: Vec<Card>,
        /// Cards the group gives up
        released: Vec<Card>,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::NewGroup {
                group,
                from_hand,
                from_floor,
                from_floor_unattributed,
            } => {
                let mut parts = Vec::new();
                if !from_hand.is_empty() {
                    parts.push(format!("{} from hand", join_cards(from_hand)));
                }
                if !from_floor.is_empty() {
                    parts.push(describe_sources(from_floor));
                }
                if !from_floor_unattributed.is_empty() {
                    parts.push(format!("{} from floor", join_cards(from_floor_unattributed)));
                }
                write!(f, "new group {} ← {}", group, parts.join(" + "))
            }
            Step::Reshape {
                before,
                after,
                from_hand,
                from_floor,
                from_floor_unattributed,
                released,
                ..
            } => {
                let mut parts = Vec::new();
                if !from_hand.is_empty() {
                    parts.push(format!("play {} from hand", join_cards(from_hand)));
                }
                if !from_floor.is_empty() {
                    parts.push(format!("move {}", describe_sources(from_floor)));
                }
                if !from_floor_unattributed.is_empty() {
                    parts.push(format!("move {} from floor", join_cards(from_floor_unattributed)));
                }
                if parts.is_empty() {
                    parts.push(format!("take out {}", join_cards(released)));
                }
                write!(f, "{} → {} becomes {}", parts.join(" + "), before, after)
            }
        }
    }
}

fn describe_sources(sources: &[FloorSource]) -> String {
    sources
        .iter()
        .map(|s| format!("{} from group {}", join_cards(&s.cards), s.group))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Card multiset with the counter arithmetic the planner needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Counts(BTreeMap<Card, u32>);

impl Counts {
    fn of(cards: &[Card]) -> Self {
        let mut counts = Counts::default();
        for card in cards {
            *counts.0.entry(*card).or_insert(0) += 1;
        }
        counts
    }

    fn total(&self) -> u32 {
        self.0.values().sum()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Per-card minimum
    fn intersect(&self, other: &Counts) -> Counts {
        Counts(
            self.0
                .iter()
                .filter_map(|(card, &n)| {
                    let m = other.0.get(card).copied().unwrap_or(0).min(n);
                    (m > 0).then_some((*card, m))
                })
                .collect(),
        )
    }

    /// Per-card difference, floored at zero
    fn minus(&self, other: &Counts) -> Counts {
        Counts(
            self.0
                .iter()
                .filter_map(|(card, &n)| {
                    let m = n.saturating_sub(other.0.get(card).copied().unwrap_or(0));
                    (m > 0).then_some((*card, m))
                })
                .collect(),
        )
    }

    /// Cards in display order, one entry per copy
    fn cards(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .0
            .iter()
            .flat_map(|(card, &n)| std::iter::repeat_n(*card, n as usize))
            .collect();
        cards.sort_by_key(Card::display_key);
        cards
    }
}

/// The floor a plan should start from: the floor groups followed by one
/// single-card group per cross card the solution incorporated.
pub fn planning_floor(
    floor: &[Group],
    cross: &[Option<Card>],
    remaining_cross: &[Card],
) -> Vec<Group> {
    let mut groups = floor.to_vec();
    groups.extend(
        incorporated_cross(cross, remaining_cross)
            .into_iter()
            .map(|card| Group::new(vec![card])),
    );
    groups
}

/// Steps turning `initial_floor` into `target`, in target order.
///
/// Matching is greedy by overlap, not globally optimal, and the steps
/// describe one atomic re-lay rather than a dependency-ordered sequence.
pub fn plan_moves(initial_floor: &[Group], target: &[Group], hand: &[Card]) -> Vec<Step> {
    let floor_counts: Vec<Counts> = initial_floor.iter().map(|g| Counts::of(g.cards())).collect();
    let target_counts: Vec<Counts> = target.iter().map(|g| Counts::of(g.cards())).collect();

    // Greedy matching on (overlap, target, floor), largest first
    let mut pairs = Vec::new();
    for (ti, tc) in target_counts.iter().enumerate() {
        for (fi, fc) in floor_counts.iter().enumerate() {
            let overlap = tc.intersect(fc).total();
            if overlap > 0 {
                pairs.push((overlap, ti, fi));
            }
        }
    }
    pairs.sort_by(|a, b| b.cmp(a));

    let mut matched: Vec<Option<usize>> = vec![None; target.len()];
    let mut used_floor = vec![false; initial_floor.len()];
    for &(_, ti, fi) in &pairs {
        if matched[ti].is_none() && !used_floor[fi] {
            matched[ti] = Some(fi);
            used_floor[fi] = true;
        }
    }

    // What each floor group keeps, and what it releases
    let mut staying: Vec<Counts> = vec![Counts::default(); initial_floor.len()];
    for (ti, fi) in matched.iter().enumerate() {
        if let Some(fi) = *fi {
            staying[fi] = target_counts[ti].intersect(&floor_counts[fi]);
        }
    }
    let mut released: Vec<Counts> = floor_counts
        .iter()
        .zip(&staying)
        .map(|(fc, stay)| fc.minus(stay))
        .collect();

    let mut remaining_hand = Counts::of(hand);
    let mut steps = Vec::new();

    for (ti, group) in target.iter().enumerate() {
        let tc = &target_counts[ti];
        let needed = match matched[ti] {
            Some(fi) => tc.minus(&staying[fi]),
            None => tc.clone(),
        };

        let from_hand = needed.intersect(&remaining_hand);
        remaining_hand = remaining_hand.minus(&from_hand);
        let (from_floor, unattributed) = take_released(&needed.minus(&from_hand), &mut released);

        match matched[ti] {
            Some(fi) => {
                let lost = floor_counts[fi].minus(&staying[fi]);
                if needed.is_empty() && lost.is_empty() {
                    continue;
                }
                steps.push(Step::Reshape {
                    floor_index: fi,
                    before: initial_floor[fi].clone(),
                    after: group.clone(),
                    from_hand: from_hand.cards(),
                    from_floor,
                    from_floor_unattributed: unattributed,
                    released: lost.cards(),
                });
            }
            None => steps.push(Step::NewGroup {
                group: group.clone(),
                from_hand: from_hand.cards(),
                from_floor,
                from_floor_unattributed: unattributed,
            }),
        }
    }

    steps
}

/// [`plan_moves`] rendered as text
pub fn plan_steps(initial_floor: &[Group], target: &[Group], hand: &[Card]) -> Vec<String> {
    plan_moves(initial_floor, target, hand)
        .iter()
        .map(|step| step.to_string())
        .collect()
}

/// Trace `needed` back to released cards, lowest group index first, and
/// consume them. Returns the traced sources and whatever could not be traced.
fn take_released(needed: &Counts, released: &mut [Counts]) -> (Vec<FloorSource>, Vec<Card>) {
    let mut remaining = needed.clone();
    let mut sources = Vec::new();

    for (fi, freed) in released.iter_mut().enumerate() {
        if remaining.is_empty() {
            break;
        }
        let overlap = remaining.intersect(freed);
        if !overlap.is_empty() {
            remaining = remaining.minus(&overlap);
            *freed = freed.minus(&overlap);
            sources.push(FloorSource {
                group: fi,
                cards: overlap.cards(),
            });
        }
    }

    (sources, remaining.cards())
}
