use crate::solver::now_ms;
use crate::{
    Card, Group, GroupKind, SolveError, SolverConfig, check_copy_limit, plan_steps, planning_floor,
    solve_hand_with_config,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Solve request as sent by the browser
#[derive(Deserialize)]
pub struct SolveRequest {
    pub hand: Vec<String>,
    /// One entry per cross slot; `null` marks an empty slot
    #[serde(default)]
    pub cross: Vec<Option<String>>,
    #[serde(default)]
    pub floor_groups: Vec<Vec<String>>,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

/// JSON-serializable representation of a card
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct CardJson {
    pub code: String,
    pub rank: u8,
    pub suit: String,
    pub display: String,
}

impl From<&Card> for CardJson {
    fn from(card: &Card) -> Self {
        CardJson {
            code: card.code(),
            rank: card.rank(),
            suit: card.suit().letter().to_string(),
            display: card.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct StepJson {
    pub step_number: usize,
    pub description: String,
}

/// Result of the solve operation
#[derive(Serialize, Deserialize, Default)]
pub struct SolveResult {
    pub solvable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_groups: Option<Vec<Vec<CardJson>>>,
    pub remaining_cross: Vec<CardJson>,
    pub steps: Vec<StepJson>,
    pub elapsed_ms: f64,
    /// A deadline or the attempt cap was hit, so `solvable: false` may be a
    /// false negative
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of validating a single group
#[derive(Serialize, Deserialize, Default)]
pub struct ValidateResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    pub display: Vec<CardJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Main WASM API: decide whether a hand can be emptied onto the floor
///
/// # Arguments
/// * `request_json` - e.g.
///   `{"hand": ["7D"], "cross": ["2S", null], "floor_groups": [["7S", "7H", "7C"]]}`
///
/// # Returns
/// JSON string with SolveResult: the target layout and numbered steps, or an error
#[wasm_bindgen]
pub fn solve(request_json: &str) -> String {
    let result = solve_internal(request_json).unwrap_or_else(|e| SolveResult {
        error: Some(e),
        ..SolveResult::default()
    });
    serde_json::to_string(&result)
        .unwrap_or_else(|e| format!(r#"{{"solvable":false,"error":"Serialization error: {}"}}"#, e))
}

/// Internal implementation of solve
fn solve_internal(request_json: &str) -> Result<SolveResult, String> {
    let request: SolveRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid request JSON: {}", e))?;

    let hand = parse_codes(&request.hand)?;
    let cross = request
        .cross
        .iter()
        .map(|slot| slot.as_deref().map(Card::parse).transpose())
        .collect::<Result<Vec<Option<Card>>, _>>()
        .map_err(|e| e.to_string())?;
    let floor = request
        .floor_groups
        .iter()
        .map(|codes| parse_codes(codes).map(Group::new))
        .collect::<Result<Vec<Group>, String>>()?;

    let mut all_cards = hand.clone();
    all_cards.extend(floor.iter().flat_map(|g| g.cards().iter().copied()));
    all_cards.extend(cross.iter().flatten().copied());
    check_copy_limit(&all_cards).map_err(|e| e.to_string())?;

    let config = match request.time_limit_ms {
        Some(ms) => SolverConfig::with_overall_timeout(Duration::from_millis(ms)),
        None => SolverConfig::default(),
    };

    let started = now_ms();
    let solution = solve_hand_with_config(&hand, &floor, &cross, &config);
    let elapsed_ms = now_ms() - started;

    let target = match solution.verified(&hand, &floor, &cross) {
        Ok(target) => target,
        Err(SolveError::Unsolvable { budget_exhausted }) => {
            return Ok(SolveResult {
                elapsed_ms,
                timed_out: budget_exhausted,
                ..SolveResult::default()
            });
        }
        Err(e @ SolveError::Invariant(_)) => return Err(e.to_string()),
    };

    let initial_floor = planning_floor(&floor, &cross, &solution.remaining_cross);
    let steps = plan_steps(&initial_floor, target, &hand)
        .into_iter()
        .enumerate()
        .map(|(i, description)| StepJson {
            step_number: i + 1,
            description,
        })
        .collect();

    Ok(SolveResult {
        solvable: true,
        target_groups: Some(
            target
                .iter()
                .map(|g| g.display_order().iter().map(CardJson::from).collect())
                .collect(),
        ),
        remaining_cross: solution.remaining_cross.iter().map(CardJson::from).collect(),
        steps,
        elapsed_ms,
        timed_out: solution.budget_exhausted,
        error: None,
    })
}

/// Check whether a list of card codes forms a valid set or run
///
/// # Arguments
/// * `cards_json` - JSON array of card codes (e.g., ["QS", "KS", "AS"])
#[wasm_bindgen]
pub fn validate_group(cards_json: &str) -> String {
    let result = validate_internal(cards_json).unwrap_or_else(|e| ValidateResult {
        error: Some(e),
        ..ValidateResult::default()
    });
    serde_json::to_string(&result)
        .unwrap_or_else(|e| format!(r#"{{"valid":false,"error":"Serialization error: {}"}}"#, e))
}

fn validate_internal(cards_json: &str) -> Result<ValidateResult, String> {
    let codes: Vec<String> =
        serde_json::from_str(cards_json).map_err(|e| format!("Invalid cards JSON: {}", e))?;
    let group = Group::new(parse_codes(&codes)?);
    let kind = group.kind();

    Ok(ValidateResult {
        valid: kind.is_some(),
        group_type: kind.map(|k| match k {
            GroupKind::Set => "set".to_string(),
            GroupKind::Run => "run".to_string(),
        }),
        display: group.display_order().iter().map(CardJson::from).collect(),
        error: None,
    })
}

fn parse_codes(codes: &[String]) -> Result<Vec<Card>, String> {
    codes
        .iter()
        .map(|code| Card::parse(code).map_err(|e| e.to_string()))
        .collect()
}

/// Get the git commit hash that this WASM module was built from
///
/// Returns the first 8 characters of the commit hash, or "unknown" if not available
#[wasm_bindgen]
pub fn get_build_commit() -> String {
    env!("BUILD_COMMIT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_solve_extends_floor() {
        let json = solve(r#"{"hand": ["7D"], "floor_groups": [["7S", "7H", "7C"]]}"#);
        let result: SolveResult = serde_json::from_str(&json).unwrap();
        assert!(result.solvable);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].step_number, 1);
        assert!(result.error.is_none());
    }

    #[wasm_bindgen_test]
    fn test_solve_reports_parse_error() {
        let json = solve(r#"{"hand": ["7X"]}"#);
        let result: SolveResult = serde_json::from_str(&json).unwrap();
        assert!(!result.solvable);
        assert!(result.error.unwrap().contains("Invalid suit"));
    }

    #[wasm_bindgen_test]
    fn test_validate_group() {
        let json = validate_group(r#"["AS", "QS", "KS"]"#);
        let result: ValidateResult = serde_json::from_str(&json).unwrap();
        assert!(result.valid);
        assert_eq!(result.group_type.as_deref(), Some("run"));
        assert_eq!(result.display[2].display, "A♠");
    }
}
