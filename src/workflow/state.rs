use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::step::{StepKind, StepPayload, STEP_COUNT};

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn first_step() -> usize {
    1
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn yes() -> bool {
    true
}

fn default_page_type() -> String {
    "affiliate".to_string()
}

fn default_product_type() -> String {
    "supplement".to_string()
}

/// Page configuration captured alongside the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOptions {
    #[serde(default = "yes")]
    pub include_agitation_module: bool,
    #[serde(default = "yes")]
    pub include_comparison_table: bool,
    #[serde(default = "yes")]
    pub include_audience_qualifier: bool,
    #[serde(default)]
    pub include_before_after_slider: bool,
    #[serde(default = "default_page_type")]
    pub page_type: String,
    #[serde(default = "default_product_type")]
    pub product_type: String,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            include_agitation_module: true,
            include_comparison_table: true,
            include_audience_qualifier: true,
            include_before_after_slider: false,
            page_type: default_page_type(),
            product_type: default_product_type(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub payload: Option<StepPayload>,
}

/// Derived status of one step. There is no failed or skipped state; a
/// failed generation leaves the step pending and it is simply retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub project_name: String,
    pub current_step: usize,
    pub steps_completed: usize,
    pub progress_percentage: f32,
    pub selected_model: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Session-scoped record of the eight-step linear workflow.
///
/// Progression is gated: a step may only run once every earlier step is
/// completed. All step-indexed operations are bounds-checked to 1..=8
/// and out-of-range indices are no-ops, never panics. Fields added in
/// later schema revisions carry serde defaults, so importing an older
/// export back-fills them without overwriting present values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub project_name: String,
    #[serde(default = "default_model")]
    pub selected_model: String,
    #[serde(default = "first_step")]
    pub current_step: usize,
    #[serde(default = "now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub steps: [StepRecord; STEP_COUNT],
    #[serde(default)]
    pub options: WorkflowOptions,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        let created = Utc::now();
        Self {
            project_name: String::new(),
            selected_model: default_model(),
            current_step: 1,
            created_at: created,
            last_updated: created,
            steps: Default::default(),
            options: WorkflowOptions::default(),
        }
    }

    fn record(&self, step: usize) -> Option<&StepRecord> {
        (1..=STEP_COUNT).contains(&step).then(|| &self.steps[step - 1])
    }

    pub fn is_step_completed(&self, step: usize) -> bool {
        self.record(step).map(|r| r.completed).unwrap_or(false)
    }

    /// Set the completion flag for a step. Does not move the
    /// current-step pointer; see [`WorkflowState::complete_step`] for
    /// the composed operation the step flow uses.
    pub fn mark_step_completed(&mut self, step: usize) {
        if (1..=STEP_COUNT).contains(&step) {
            self.steps[step - 1].completed = true;
            self.last_updated = Utc::now();
        }
    }

    pub fn set_current_step(&mut self, step: usize) {
        if (1..=STEP_COUNT).contains(&step) {
            self.current_step = step;
        }
    }

    /// Mark a step completed and advance the pointer to the next step.
    /// Completing step 8 does not advance past the end.
    pub fn complete_step(&mut self, step: usize) {
        if !(1..=STEP_COUNT).contains(&step) {
            return;
        }
        self.mark_step_completed(step);
        if step < STEP_COUNT {
            self.current_step = step + 1;
        }
    }

    pub fn save_step_payload(&mut self, step: usize, payload: StepPayload) {
        if (1..=STEP_COUNT).contains(&step) {
            self.steps[step - 1].payload = Some(payload);
            self.last_updated = Utc::now();
        }
    }

    pub fn step_payload(&self, step: usize) -> Option<&StepPayload> {
        self.record(step).and_then(|r| r.payload.as_ref())
    }

    /// True iff every step before `step` is completed. Step 1 is always
    /// reachable.
    pub fn can_proceed_to_step(&self, step: usize) -> bool {
        if !(1..=STEP_COUNT).contains(&step) {
            return false;
        }
        (1..step).all(|i| self.is_step_completed(i))
    }

    pub fn step_status(&self, step: usize) -> StepStatus {
        if self.is_step_completed(step) {
            StepStatus::Completed
        } else if step == self.current_step {
            StepStatus::InProgress
        } else {
            StepStatus::Pending
        }
    }

    pub fn progress_percentage(&self) -> f32 {
        let completed = self.steps.iter().filter(|r| r.completed).count();
        (completed as f32 / STEP_COUNT as f32) * 100.0
    }

    /// Payloads of all completed steps, in step order, for final
    /// assembly and export.
    pub fn completed_payloads(&self) -> Vec<(StepKind, &StepPayload)> {
        (1..=STEP_COUNT)
            .filter(|&i| self.is_step_completed(i))
            .filter_map(|i| {
                let kind = StepKind::from_index(i)?;
                self.step_payload(i).map(|p| (kind, p))
            })
            .collect()
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            project_name: self.project_name.clone(),
            current_step: self.current_step,
            steps_completed: self.steps.iter().filter(|r| r.completed).count(),
            progress_percentage: self.progress_percentage(),
            selected_model: self.selected_model.clone(),
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }

    pub fn reset(&mut self) {
        *self = WorkflowState::new();
    }

    /// Serialize the whole state plus an `exported_at` timestamp.
    pub fn export(&self) -> String {
        let mut value = match serde_json::to_value(self) {
            Ok(value) => value,
            Err(_) => return "{}".to_string(),
        };
        value["exported_at"] = Value::String(Utc::now().to_rfc3339());
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Merge a previously exported document into this state.
    ///
    /// The document must carry at least `project_name` and
    /// `current_step`; anything else is rejected wholesale and the
    /// existing state is left untouched. Accepted imports merge
    /// shallowly: top-level fields present in the document overwrite,
    /// absent fields keep their prior values.
    pub fn import(&mut self, json: &str) -> bool {
        let Ok(incoming) = serde_json::from_str::<Value>(json) else {
            return false;
        };
        let Some(incoming) = incoming.as_object() else {
            return false;
        };
        for required in ["project_name", "current_step"] {
            if !incoming.contains_key(required) {
                return false;
            }
        }

        let Ok(Value::Object(mut merged)) = serde_json::to_value(&*self) else {
            return false;
        };
        for (key, value) in incoming {
            merged.insert(key.clone(), value.clone());
        }

        match serde_json::from_value::<WorkflowState>(Value::Object(merged)) {
            Ok(state) => {
                *self = state;
                self.last_updated = Utc::now();
                true
            }
            Err(_) => false,
        }
    }
}
