//! Goal attainment probabilities.

use serde::{Deserialize, Serialize};
use wealth_core::types::{Goal, GoalId};
use wealth_simulation::path::SimulationPath;

/// Probability of meeting one goal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalAttainment {
    /// Goal identifier
    pub goal_id: GoalId,
    /// Goal priority (1 is highest)
    pub priority: u8,
    /// Target value
    pub target_amount: f64,
    /// Period at which the goal was evaluated
    pub evaluated_period: usize,
    /// Fraction of paths at or above target
    pub probability: f64,
    /// Mean surplus (negative = shortfall) at the evaluation period
    pub mean_surplus: f64,
}

/// Evaluates `goal` across `paths`.
///
/// A goal falling due after the simulated horizon is evaluated at the last
/// simulated period. Returns `None` when there are no paths.
///
/// # Examples
///
/// ```no_run
/// use wealth_core::types::Goal;
/// use wealth_risk::goals::goal_attainment;
/// # let paths: Vec<wealth_simulation::path::SimulationPath> = Vec::new();
///
/// let retirement = Goal::new("retire", 1_500_000.0, 120);
/// if let Some(result) = goal_attainment(&retirement, &paths) {
///     println!("{:.1}% likely", result.probability * 100.0);
/// }
/// ```
pub fn goal_attainment(goal: &Goal, paths: &[SimulationPath]) -> Option<GoalAttainment> {
    let horizon = paths.iter().map(SimulationPath::num_periods).min()?;
    let period = goal.horizon_periods.min(horizon);
    let values: Vec<f64> = paths
        .iter()
        .filter_map(|p| p.value_at(period))
        .collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let hits = values.iter().filter(|v| **v >= goal.target_amount).count();
    let surplus = values.iter().map(|v| v - goal.target_amount).sum::<f64>() / n;
    Some(GoalAttainment {
        goal_id: goal.id.clone(),
        priority: goal.priority,
        target_amount: goal.target_amount,
        evaluated_period: period,
        probability: hits as f64 / n,
        mean_surplus: surplus,
    })
}

/// Evaluates every goal, highest priority first.
pub fn evaluate_goals(goals: &[Goal], paths: &[SimulationPath]) -> Vec<GoalAttainment> {
    let mut results: Vec<GoalAttainment> = goals
        .iter()
        .filter_map(|g| goal_attainment(g, paths))
        .collect();
    results.sort_by_key(|r| r.priority);
    results
}
