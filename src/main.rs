#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use anyhow::{Context, Result, bail};
    use clap::Parser;
    use log::info;
    use makiaveli_solver::{
        Card, Group, SolveError, SolverConfig, check_copy_limit, join_cards, parse_cards,
        plan_steps, planning_floor, solve_hand_with_config,
    };
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    /// Decide whether a Makiaveli hand can be emptied onto the floor, and how.
    #[derive(Parser, Debug)]
    #[command(name = "makiaveli-solver", version)]
    struct Args {
        /// Hand cards, e.g. "3S 4S 7D"
        #[arg(long, default_value = "")]
        hand: String,

        /// One floor group, e.g. "2S 3S 4S 5S"; repeat for each group
        #[arg(long = "floor")]
        floor: Vec<String>,

        /// Cross cards in slot order; "-" marks an empty slot
        #[arg(long, default_value = "")]
        cross: String,

        /// Overall time budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// JSON file with solver budgets
        #[arg(long)]
        config: Option<PathBuf>,
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Args::parse();

        let hand = parse_cards(&args.hand).context("Invalid hand")?;
        let floor = args
            .floor
            .iter()
            .map(|text| {
                Group::parse(text).with_context(|| format!("Invalid floor group '{}'", text))
            })
            .collect::<Result<Vec<_>>>()?;
        let cross = args
            .cross
            .split_whitespace()
            .map(|token| match token {
                "-" => Ok(None),
                code => Card::parse(code).map(Some),
            })
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid cross")?;

        let mut all_cards = hand.clone();
        all_cards.extend(floor.iter().flat_map(|g| g.cards().iter().copied()));
        all_cards.extend(cross.iter().flatten().copied());
        check_copy_limit(&all_cards)?;

        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read config {}", path.display()))?;
                serde_json::from_str::<SolverConfig>(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => SolverConfig::default(),
        };
        if let Some(ms) = args.timeout_ms {
            config.overall_timeout = Duration::from_millis(ms);
        }

        println!("=== Makiaveli Solver ===");
        display_state(&hand, &floor, &cross);

        if hand.is_empty() {
            println!("Hand is empty, nothing to play.");
            return Ok(());
        }

        println!("Solving...\n");
        let started = Instant::now();
        let solution = solve_hand_with_config(&hand, &floor, &cross, &config);
        info!("solved in {:?}", started.elapsed());

        let target = match solution.verified(&hand, &floor, &cross) {
            Ok(target) => target,
            Err(SolveError::Unsolvable { budget_exhausted }) => {
                println!("No solution found. You cannot empty your hand from this state.");
                if budget_exhausted {
                    println!("(The search ran out of time; a solution may still exist.)");
                }
                return Ok(());
            }
            Err(e @ SolveError::Invariant(_)) => bail!(e),
        };

        println!("Solution found!\n");
        println!("Target layout:");
        for (i, group) in target.iter().enumerate() {
            println!("  [{}] {}", i, group);
        }
        if !solution.remaining_cross.is_empty() {
            println!("Cross cards left: {}", join_cards(&solution.remaining_cross));
        }

        let initial_floor = planning_floor(&floor, &cross, &solution.remaining_cross);
        let steps = plan_steps(&initial_floor, target, &hand);
        if steps.is_empty() {
            println!("\nNo rearrangement needed.");
        } else {
            println!("\nSteps ({}):", steps.len());
            for (i, step) in steps.iter().enumerate() {
                println!("  {}. {}", i + 1, step);
            }
        }
        Ok(())
    }

    fn display_state(hand: &[Card], floor: &[Group], cross: &[Option<Card>]) {
        println!("\n--- Current State ---");
        println!("Hand: {}", join_cards(hand));
        println!("Floor:");
        if floor.is_empty() {
            println!("  (empty)");
        }
        for (i, group) in floor.iter().enumerate() {
            println!("  [{}] {}", i, group);
        }
        let present: Vec<Card> = cross.iter().flatten().copied().collect();
        if !present.is_empty() {
            println!("Cross: {}", join_cards(&present));
        }
        println!();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
