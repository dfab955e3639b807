//! Offline conversion of recorded actions into scored trajectories.
//!
//! DESIGN
//! ======
//! Records are grouped by diagram id (first appearance order) and sorted by
//! timestamp within each group. Each record becomes one step: the prompt and
//! diagram before and after it, the action, a templated reasoning line, and a
//! reward. The trajectory total adds outcome bonuses and penalties on top of
//! the per-step rewards.
//!
//! TRADE-OFFS
//! ==========
//! Timestamps are compared as strings. Recorded timestamps are RFC 3339 in
//! UTC, so lexical order is chronological.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::telemetry::ActionType;

const UNKNOWN_DIAGRAM: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// INPUT
// =============================================================================

/// One stored action, as kept by the action-recording endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid_code: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_variations: Option<Vec<String>>,
}

impl ActionRecord {
    fn kind(&self) -> Option<ActionType> {
        serde_json::from_value(Value::String(self.action_type.clone())).ok()
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub prompt: String,
    pub diagram: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_variations: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub state: StepState,
    pub action: StepAction,
    pub reasoning: String,
    pub next_state: StepState,
    pub reward: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswerMetadata {
    pub prompt: String,
    pub diagram_id: String,
    pub num_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub answer: String,
    pub metadata: FinalAnswerMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryMetadata {
    pub diagram_id: String,
    pub num_actions: usize,
    pub start_timestamp: String,
    pub end_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub diagram_id: String,
    pub reward: f64,
    pub trajectory: Vec<Step>,
    pub final_answer: Option<FinalAnswer>,
    pub metadata: TrajectoryMetadata,
    pub metrics: Map<String, Value>,
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Group records by diagram and score each group.
#[must_use]
pub fn build_trajectories(records: &[ActionRecord]) -> Vec<Trajectory> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&ActionRecord>> = HashMap::new();
    for record in records {
        let key = record.diagram_id.clone().unwrap_or_else(|| UNKNOWN_DIAGRAM.to_owned());
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let mut actions = groups.remove(&key)?;
            actions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            Some(build_one(key, &actions))
        })
        .collect()
}

fn build_one(diagram_id: String, actions: &[&ActionRecord]) -> Trajectory {
    let mut prompt = String::new();
    let mut diagram = String::new();
    let mut steps = Vec::with_capacity(actions.len());

    for action in actions {
        let state = StepState { prompt: prompt.clone(), diagram: diagram.clone(), timestamp: action.timestamp.clone() };
        let reasoning = reasoning_for(action, &prompt);

        if let Some(p) = action.prompt.as_deref().filter(|p| !p.is_empty()) {
            p.clone_into(&mut prompt);
        }
        if let Some(code) = action.mermaid_code.as_deref().filter(|c| !c.is_empty()) {
            code.clone_into(&mut diagram);
        }

        let next_state = StepState { prompt: prompt.clone(), diagram: diagram.clone(), timestamp: action.timestamp.clone() };
        steps.push(Step {
            state,
            action: StepAction {
                action_type: action.action_type.clone(),
                metadata: action.metadata.clone(),
                variation_index: action.variation_index,
                rating: action.rating,
                feedback_text: action.feedback_text.clone(),
                all_variations: action.all_variations.clone(),
            },
            reasoning,
            next_state,
            reward: 0,
        });
    }

    let final_diagram = steps.last().map(|s| s.next_state.diagram.clone()).filter(|d| !d.is_empty());
    let final_prompt = steps.last().map(|s| s.next_state.prompt.clone()).unwrap_or_default();

    let (total, rewards) = score(&steps, final_diagram.is_some());
    for (step, reward) in steps.iter_mut().zip(rewards) {
        step.reward = reward;
    }

    let final_answer = final_diagram.map(|answer| FinalAnswer {
        answer,
        metadata: FinalAnswerMetadata { prompt: final_prompt, diagram_id: diagram_id.clone(), num_steps: steps.len() },
    });

    let metadata = TrajectoryMetadata {
        diagram_id: diagram_id.clone(),
        num_actions: actions.len(),
        start_timestamp: actions.first().map(|a| a.timestamp.clone()).unwrap_or_default(),
        end_timestamp: actions.last().map(|a| a.timestamp.clone()).unwrap_or_default(),
    };

    #[allow(clippy::cast_precision_loss)]
    let reward = total as f64;
    Trajectory { diagram_id, reward, trajectory: steps, final_answer, metadata, metrics: Map::new() }
}

// =============================================================================
// REWARDS
// =============================================================================

fn action_reward(kind: ActionType) -> i64 {
    match kind {
        ActionType::DiagramGenerated | ActionType::DiagramEdited => 2,
        ActionType::VariationSelection => 5,
        ActionType::MermaidCopy | ActionType::ImageCopy => 3,
        _ => 0,
    }
}

fn feedback_reward(rating: i64) -> i64 {
    match rating {
        1 => -5,
        2 => -2,
        3 => 1,
        4 => 3,
        5 => 5,
        _ => 0,
    }
}

/// Score a trajectory. Returns the total and the per-step rewards.
///
/// A trajectory without feedback counts as rating 0 for the outcome bonus.
#[must_use]
pub fn score(steps: &[Step], has_final_diagram: bool) -> (i64, Vec<i64>) {
    let mut has_diagram = false;
    let mut has_selection = false;
    let mut feedback_rating = 0;
    let mut prompt_updates = 0;

    let mut rewards = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let kind = serde_json::from_value::<ActionType>(Value::String(step.action.action_type.clone())).ok();
        let mut reward = kind.map_or(0, action_reward);

        match kind {
            Some(ActionType::Feedback) => {
                let rating = step.action.rating.unwrap_or(0);
                reward += feedback_reward(rating);
                feedback_rating = rating;
            }
            Some(ActionType::PromptUpdate) => {
                prompt_updates += 1;
                reward += match prompt_updates {
                    ..=2 => 1,
                    3..=4 => 0,
                    _ => -1,
                };
            }
            Some(ActionType::NewButton) => {
                let had_diagram = steps[..i].iter().any(|s| !s.state.diagram.is_empty());
                reward += if had_diagram { -5 } else { -1 };
            }
            Some(ActionType::TabAway) => {
                let had_diagram = step.action.metadata.get("had_diagram").and_then(Value::as_bool).unwrap_or(false);
                reward += if had_diagram { -3 } else { -2 };
            }
            Some(ActionType::DiagramGenerated) => has_diagram = true,
            Some(ActionType::VariationSelection) => has_selection = true,
            _ => {}
        }
        rewards.push(reward);
    }

    let mut total: i64 = rewards.iter().sum();
    let num_steps = steps.len();

    if has_final_diagram {
        total += 5;
        if has_diagram && has_selection {
            total += 3;
        }
        total += match feedback_rating {
            4.. => 3,
            3 => 1,
            _ => -2,
        };
        total += match num_steps {
            ..=5 => 3,
            6..=10 => 2,
            11..=15 => 1,
            _ => 0,
        };
    } else if num_steps > 20 {
        total -= 5;
    } else if num_steps > 15 {
        total -= 3;
    }

    if prompt_updates > 5 {
        total -= 2;
    }
    if prompt_updates > 8 {
        total -= 4;
    }
    if !has_diagram && num_steps > 3 {
        total -= 5;
    }
    if has_diagram && !has_selection && num_steps > 5 {
        total -= 2;
    }

    (total, rewards)
}

// =============================================================================
// REASONING
// =============================================================================

fn reasoning_for(action: &ActionRecord, current_prompt: &str) -> String {
    let Some(kind) = action.kind() else {
        return format!("User performed {}.", action.action_type);
    };
    match kind {
        ActionType::PromptUpdate => {
            let head: String = current_prompt.chars().take(80).collect();
            format!("User updated prompt to: '{head}...'")
        }
        ActionType::DiagramGenerated => {
            let n = action.metadata.get("num_variations").and_then(Value::as_i64).unwrap_or(3);
            format!("System generated {n} diagram variations.")
        }
        ActionType::VariationSelection => {
            format!("User selected variation {} as best match.", action.variation_index.unwrap_or(0) + 1)
        }
        ActionType::NewButton => "User clicked 'New' to generate fresh diagram.".to_owned(),
        ActionType::DiagramEdited => "User edited the diagram.".to_owned(),
        ActionType::Feedback => format!("User rated diagram {}/5 stars.", action.rating.unwrap_or(0)),
        ActionType::MermaidCopy => "User copied Mermaid code for external use.".to_owned(),
        ActionType::ImageCopy => "User copied diagram image.".to_owned(),
        ActionType::TabAway => "User navigated away.".to_owned(),
        ActionType::Zoom => "User zoomed diagram for better view.".to_owned(),
        ActionType::Pan => "User panned diagram.".to_owned(),
        ActionType::VariationHover => "User exploring variations.".to_owned(),
    }
}

// =============================================================================
// FILES
// =============================================================================

/// Read a JSON array of action records. A leading byte-order mark is ignored.
///
/// # Errors
///
/// Returns [`TrajectoryError`] when the file cannot be read or parsed.
pub fn load_records(path: &Path) -> Result<Vec<ActionRecord>, TrajectoryError> {
    let raw = fs::read_to_string(path)?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    Ok(serde_json::from_str(raw)?)
}

/// # Errors
///
/// Returns [`TrajectoryError`] when the file cannot be written.
pub fn write_trajectories(path: &Path, trajectories: &[Trajectory]) -> Result<(), TrajectoryError> {
    let json = serde_json::to_string_pretty(trajectories)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
#[path = "trajectory_test.rs"]
mod tests;
