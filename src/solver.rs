use crate::{Card, CardPool, Group, SolverConfig, Suit};
use log::{debug, trace};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Cross-platform wall-clock cutoff, passed by value through the search.
///
/// Checked cooperatively at the top of every recursive call and before every
/// sub-problem; the solver may overrun it by one enumeration step.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    #[cfg(not(target_arch = "wasm32"))]
    at: Option<std::time::Instant>,
    #[cfg(target_arch = "wasm32")]
    at_ms: Option<f64>,
}

impl Deadline {
    /// A deadline that never expires
    pub fn never() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            at: None,
            #[cfg(target_arch = "wasm32")]
            at_ms: None,
        }
    }

    /// Expires `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            at: std::time::Instant::now().checked_add(budget),
            #[cfg(target_arch = "wasm32")]
            at_ms: Some(now_ms() + budget.as_secs_f64() * 1000.0),
        }
    }

    pub fn is_expired(&self) -> bool {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.at.is_some_and(|at| std::time::Instant::now() >= at)
        }
        #[cfg(target_arch = "wasm32")]
        {
            self.at_ms.is_some_and(|at| now_ms() >= at)
        }
    }

    /// Whichever of the two deadlines comes first
    pub fn earliest(self, other: Deadline) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let at = match (self.at, other.at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            Self { at }
        }
        #[cfg(target_arch = "wasm32")]
        {
            let at_ms = match (self.at_ms, other.at_ms) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            Self { at_ms }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

// ============================================================================
// Group Enumeration
// ============================================================================

/// All sets (same rank, 3-4 distinct suits) containing (rank, suit) that the
/// pool can currently afford.
pub fn sets_containing(rank: u8, suit: Suit, pool: &CardPool) -> Vec<Group> {
    let others: Vec<Suit> = Suit::ALL
        .iter()
        .copied()
        .filter(|&s| s != suit && pool.get(rank, s) > 0)
        .collect();

    let mut sets = Vec::new();
    for size in 2..=others.len() {
        for combo in Combinations::new(others.len(), size) {
            let mut cards = Vec::with_capacity(size + 1);
            cards.push(Card::new(rank, suit));
            cards.extend(combo.iter().map(|&i| Card::new(rank, others[i])));
            sets.push(Group::new(cards));
        }
    }
    sets
}

/// All runs (same suit, 3+ consecutive ranks) containing (rank, suit) that the
/// pool can currently afford, ace-high runs included.
pub fn runs_containing(rank: u8, suit: Suit, pool: &CardPool) -> Vec<Group> {
    // avail[r] for r in 1..=13; index 0 unused
    let mut avail = [false; 14];
    for r in 1..=13u8 {
        avail[r as usize] = pool.get(r, suit) > 0;
    }
    if !avail[rank as usize] {
        return Vec::new();
    }

    let mut runs = Vec::new();

    let mut lo = rank;
    while lo > 1 && avail[lo as usize - 1] {
        lo -= 1;
    }
    let mut hi = rank;
    while hi < 13 && avail[hi as usize + 1] {
        hi += 1;
    }
    for start in lo..=rank {
        for end in rank.max(start + 2)..=hi {
            runs.push(run_of(suit, start..=end));
        }
    }

    // Ace-high: start..=K followed by the ace
    if avail[1] && avail[13] {
        let mut ace_lo = 13;
        while ace_lo > 2 && avail[ace_lo as usize - 1] {
            ace_lo -= 1;
        }
        for start in ace_lo..13 {
            if rank == 1 || rank >= start {
                runs.push(run_of(suit, (start..=13).chain(std::iter::once(1))));
            }
        }
    }

    runs
}

fn run_of(suit: Suit, ranks: impl IntoIterator<Item = u8>) -> Group {
    Group::new(ranks.into_iter().map(|r| Card::new(r, suit)).collect())
}

/// All valid groups containing the card: sets first, then runs.
pub fn groups_for(card: Card, pool: &CardPool) -> Vec<Group> {
    let mut groups = sets_containing(card.rank(), card.suit(), pool);
    groups.extend(runs_containing(card.rank(), card.suit(), pool));
    groups
}

// ============================================================================
// Exhaustive Partition Solver
// ============================================================================

/// Result of an exhaustive partition search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// Every card in the pool was placed into these groups
    Found(Vec<Group>),
    /// No partition of the pool exists
    Impossible,
    /// The deadline elapsed before the search could decide
    TimedOut,
}

/// Partition every card of `pool` into valid groups, or prove that no
/// partition exists.
///
/// Backtracking on the most constrained card (the one with the fewest
/// candidate groups). The pool is mutated during the search but is identical
/// to its input state when this returns.
pub fn search_partition(pool: &mut CardPool, deadline: Deadline) -> PartitionOutcome {
    if pool.is_empty() {
        return PartitionOutcome::Found(Vec::new());
    }
    if pool.total() < 3 {
        return PartitionOutcome::Impossible;
    }
    if deadline.is_expired() {
        return PartitionOutcome::TimedOut;
    }

    let Some(candidates) = most_constrained_groups(pool) else {
        return PartitionOutcome::Impossible;
    };

    for group in candidates {
        pool.remove_group(&group);
        let outcome = search_partition(pool, deadline);
        pool.add_group(&group);

        match outcome {
            PartitionOutcome::Found(mut rest) => {
                rest.insert(0, group);
                return PartitionOutcome::Found(rest);
            }
            PartitionOutcome::TimedOut => return PartitionOutcome::TimedOut,
            PartitionOutcome::Impossible => {}
        }
    }

    PartitionOutcome::Impossible
}

/// Candidate groups of the present card with the fewest of them, scanning
/// rank-major. `None` if some present card has no group at all.
fn most_constrained_groups(pool: &CardPool) -> Option<Vec<Group>> {
    let mut best: Option<Vec<Group>> = None;

    'scan: for rank in 1..=13u8 {
        for suit in Suit::ALL {
            if pool.get(rank, suit) == 0 {
                continue;
            }
            let groups = groups_for(Card::new(rank, suit), pool);
            if groups.is_empty() {
                return None;
            }
            if best.as_ref().is_none_or(|b| groups.len() < b.len()) {
                let forced = groups.len() == 1;
                best = Some(groups);
                if forced {
                    break 'scan;
                }
            }
        }
    }

    best
}

/// Partition the pool into valid groups. `None` covers both "impossible" and
/// "deadline elapsed"; use [`search_partition`] to tell them apart.
pub fn solve_partition(pool: &mut CardPool, deadline: Option<Deadline>) -> Option<Vec<Group>> {
    match search_partition(pool, deadline.unwrap_or_else(Deadline::never)) {
        PartitionOutcome::Found(groups) => Some(groups),
        PartitionOutcome::Impossible => None,
        PartitionOutcome::TimedOut => {
            debug!("partition search of {} cards hit its deadline", pool.total());
            None
        }
    }
}

// ============================================================================
// Combinations
// ============================================================================

/// Lazy k-subsets of `0..n` in lexicographic order.
///
/// `k == 0` yields one empty subset; `k > n` yields nothing.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        // Bump the rightmost index that still has room, then reset the tail
        // to the smallest increasing run after it
        let k = self.indices.len();
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) else {
            self.done = true;
            return None;
        };
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

// ============================================================================
// Incremental Solver
// ============================================================================

/// Outcome of [`solve_hand`].
///
/// `solvable == false` is approximate: it may mean that no placement exists,
/// or that a budget ran out first. `budget_exhausted` records whether any
/// deadline or the attempt cap was hit during the search, on success too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandSolution {
    pub solvable: bool,
    /// The new layout: re-solved groups first, then untouched floor groups
    pub target: Option<Vec<Group>>,
    /// Cross cards left as singles
    pub remaining_cross: Vec<Card>,
    pub budget_exhausted: bool,
}

impl HandSolution {
    fn unsolvable(budget_exhausted: bool) -> Self {
        Self {
            solvable: false,
            target: None,
            remaining_cross: Vec::new(),
            budget_exhausted,
        }
    }

    /// Cross cards that were placed into groups, in slot order
    pub fn incorporated_cross(&self, cross: &[Option<Card>]) -> Vec<Card> {
        incorporated_cross(cross, &self.remaining_cross)
    }

    /// The multiset the target must account for: hand, every floor card and
    /// the incorporated cross cards.
    pub fn consumed_cards(
        &self,
        hand: &[Card],
        floor: &[Group],
        cross: &[Option<Card>],
    ) -> Vec<Card> {
        let mut cards = hand.to_vec();
        for group in floor {
            cards.extend_from_slice(group.cards());
        }
        cards.extend(self.incorporated_cross(cross));
        cards
    }

    /// The target layout, after checking it against the inputs with
    /// [`verify_solution`].
    pub fn verified(
        &self,
        hand: &[Card],
        floor: &[Group],
        cross: &[Option<Card>],
    ) -> Result<&[Group], SolveError> {
        let target = match (&self.target, self.solvable) {
            (Some(target), true) => target,
            _ => {
                return Err(SolveError::Unsolvable {
                    budget_exhausted: self.budget_exhausted,
                })
            }
        };
        verify_solution(&self.consumed_cards(hand, floor, cross), target)
            .map_err(SolveError::Invariant)?;
        Ok(target.as_slice())
    }
}

/// Present cross cards minus the ones left as singles, in slot order
pub fn incorporated_cross(cross: &[Option<Card>], remaining: &[Card]) -> Vec<Card> {
    let mut remaining = remaining.to_vec();
    let mut incorporated = Vec::new();
    for card in cross.iter().flatten() {
        if let Some(pos) = remaining.iter().position(|c| c == card) {
            remaining.swap_remove(pos);
        } else {
            incorporated.push(*card);
        }
    }
    incorporated
}

/// Result of one incremental solve
struct Search {
    partition: Option<Vec<Group>>,
    budget_exhausted: bool,
}

/// Decide whether every hand card can be placed, keeping as much of the floor
/// intact as possible. Cross cards are optional: the solver prefers to place
/// all of them and leaves the fewest possible as singles.
///
/// Default budgets apart from `overall_timeout`.
pub fn solve_hand(
    hand: &[Card],
    floor: &[Group],
    cross: &[Option<Card>],
    overall_timeout: Duration,
) -> HandSolution {
    let config = SolverConfig::with_overall_timeout(overall_timeout);
    solve_hand_with_config(hand, floor, cross, &config)
}

/// [`solve_hand`] with explicit budgets.
///
/// Panics if hand, floor and cross together hold more than two copies of a
/// card; boundary code should call [`check_copy_limit`](crate::check_copy_limit) first.
pub fn solve_hand_with_config(
    hand: &[Card],
    floor: &[Group],
    cross: &[Option<Card>],
    config: &SolverConfig,
) -> HandSolution {
    let deadline = Deadline::after(config.overall_timeout);
    let present: Vec<Card> = cross.iter().flatten().copied().collect();
    let mut budget_exhausted = false;

    'exclusions: for n_exclude in 0..=present.len() {
        for excluded in Combinations::new(present.len(), n_exclude) {
            if deadline.is_expired() {
                debug!("overall deadline hit at {} excluded cross card(s)", n_exclude);
                budget_exhausted = true;
                break 'exclusions;
            }

            let mut cards = hand.to_vec();
            cards.extend(
                present
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !excluded.contains(i))
                    .map(|(_, c)| *c),
            );

            let search = solve_incremental(&cards, floor, deadline, config);
            budget_exhausted |= search.budget_exhausted;
            if let Some(partition) = search.partition {
                return HandSolution {
                    solvable: true,
                    target: Some(partition),
                    remaining_cross: excluded.iter().map(|&i| present[i]).collect(),
                    budget_exhausted,
                };
            }
        }
    }

    HandSolution::unsolvable(budget_exhausted)
}

/// Relevance of each floor group to the hand: +2 per card sharing a rank with
/// some hand card, +1 per card sharing a suit.
pub fn relevance_scores(hand: &[Card], floor: &[Group]) -> Vec<u32> {
    let mut hand_ranks = [false; 14];
    let mut hand_suits = [false; 4];
    for card in hand {
        hand_ranks[card.rank() as usize] = true;
        hand_suits[card.suit().index()] = true;
    }

    floor
        .iter()
        .map(|group| {
            group
                .cards()
                .iter()
                .map(|c| {
                    let mut score = 0u32;
                    if hand_ranks[c.rank() as usize] {
                        score += 2;
                    }
                    if hand_suits[c.suit().index()] {
                        score += 1;
                    }
                    score
                })
                .sum::<u32>()
        })
        .collect()
}

/// Place `hand` by dissolving 0, 1, 2, ... relevant floor groups and
/// re-partitioning only the dissolved cards plus the hand. Falls back to
/// dissolving the whole floor, since relevance is only a heuristic.
fn solve_incremental(
    hand: &[Card],
    floor: &[Group],
    deadline: Deadline,
    config: &SolverConfig,
) -> Search {
    if hand.is_empty() {
        return Search {
            partition: Some(floor.to_vec()),
            budget_exhausted: false,
        };
    }

    if floor.is_empty() {
        let mut pool = CardPool::from_cards(hand);
        return from_outcome(search_partition(&mut pool, deadline));
    }

    let scores = relevance_scores(hand, floor);
    let mut relevant: Vec<usize> = (0..floor.len()).filter(|&i| scores[i] > 0).collect();
    relevant.sort_by(|&a, &b| scores[b].cmp(&scores[a]));

    let mut budget_exhausted = false;
    let mut attempts = 0usize;

    'deepening: for k in 0..=relevant.len() {
        for combo in Combinations::new(relevant.len(), k) {
            if deadline.is_expired() {
                debug!("deadline hit while dissolving {} floor group(s)", k);
                return Search {
                    partition: None,
                    budget_exhausted: true,
                };
            }
            attempts += 1;
            if attempts > config.max_attempts {
                debug!("attempt cap of {} reached", config.max_attempts);
                budget_exhausted = true;
                break 'deepening;
            }

            let dissolved: Vec<usize> = combo.iter().map(|&i| relevant[i]).collect();
            let mut pool = CardPool::from_cards(hand);
            for &i in &dissolved {
                pool.add_group(&floor[i]);
            }
            trace!("attempt {}: dissolving {:?}, {} cards", attempts, dissolved, pool.total());

            let sub_deadline = deadline.earliest(Deadline::after(config.sub_timeout));
            match search_partition(&mut pool, sub_deadline) {
                PartitionOutcome::Found(mut groups) => {
                    groups.extend(
                        floor
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| !dissolved.contains(i))
                            .map(|(_, g)| g.clone()),
                    );
                    return Search {
                        partition: Some(groups),
                        budget_exhausted,
                    };
                }
                PartitionOutcome::TimedOut => {
                    trace!("attempt {} timed out", attempts);
                    budget_exhausted = true;
                }
                PartitionOutcome::Impossible => {}
            }
        }

        if deadline.is_expired() {
            budget_exhausted = true;
            break;
        }
    }

    if deadline.is_expired() {
        return Search {
            partition: None,
            budget_exhausted: true,
        };
    }

    debug!("falling back to dissolving all {} floor groups", floor.len());
    let mut pool = CardPool::from_cards(hand);
    for group in floor {
        pool.add_group(group);
    }
    let mut search = from_outcome(search_partition(&mut pool, deadline));
    search.budget_exhausted |= budget_exhausted;
    search
}

fn from_outcome(outcome: PartitionOutcome) -> Search {
    match outcome {
        PartitionOutcome::Found(groups) => Search {
            partition: Some(groups),
            budget_exhausted: false,
        },
        PartitionOutcome::Impossible => Search {
            partition: None,
            budget_exhausted: false,
        },
        PartitionOutcome::TimedOut => Search {
            partition: None,
            budget_exhausted: true,
        },
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Why a partition does not account for its cards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    InvalidGroup(Group),
    /// `missing`: expected but not placed; `extra`: placed but not expected
    CountMismatch { missing: Vec<Card>, extra: Vec<Card> },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::InvalidGroup(group) => write!(f, "Invalid group: {}", group),
            VerifyError::CountMismatch { missing, extra } => write!(
                f,
                "Card counts don't match (missing: [{}], extra: [{}])",
                crate::join_cards(missing),
                crate::join_cards(extra)
            ),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Failure to obtain a trustworthy layout from [`solve_hand`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// No layout found; possibly because a budget ran out
    Unsolvable { budget_exhausted: bool },
    /// The solver produced a layout the verifier rejects
    Invariant(VerifyError),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Unsolvable { .. } => write!(f, "No solution found"),
            SolveError::Invariant(err) => {
                write!(f, "Internal error: solver produced invalid result ({})", err)
            }
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Invariant(err) => Some(err),
            SolveError::Unsolvable { .. } => None,
        }
    }
}

/// Check that every group is valid and that the groups hold exactly the
/// multiset `all_cards`.
pub fn verify_solution(all_cards: &[Card], partition: &[Group]) -> Result<(), VerifyError> {
    if let Some(group) = partition.iter().find(|g| !g.is_valid()) {
        return Err(VerifyError::InvalidGroup(group.clone()));
    }

    let mut balance: BTreeMap<Card, i32> = BTreeMap::new();
    for card in all_cards {
        *balance.entry(*card).or_insert(0) += 1;
    }
    for card in partition.iter().flat_map(|g| g.cards()) {
        *balance.entry(*card).or_insert(0) -= 1;
    }

    let mut missing = Vec::new();
    let mut extra = Vec::new();
    for (card, count) in balance {
        for _ in 0..count.unsigned_abs() {
            if count > 0 {
                missing.push(card);
            } else {
                extra.push(card);
            }
        }
    }

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::CountMismatch { missing, extra })
    }
}
