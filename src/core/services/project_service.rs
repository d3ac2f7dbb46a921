use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::budget::{self, BudgetCalculator, DraftPreview, ProfitAllocator};
use crate::config::Config;
use crate::core::retry::RetryPolicy;
use crate::domain::{Displayable, Project, ProjectDraft, ProjectStep};
use crate::errors::{LedgerError, Result};
use crate::ledger::validator::validate_budget_inputs;
use crate::storage::Repository;

/// Runs the budget engine over drafts and persists created projects.
pub struct ProjectService {
    projects: Arc<dyn Repository<Project>>,
    calculator: BudgetCalculator,
    allocator: ProfitAllocator,
    retry: RetryPolicy,
}

impl ProjectService {
    pub fn new(projects: Arc<dyn Repository<Project>>) -> Self {
        Self {
            projects,
            calculator: BudgetCalculator::default(),
            allocator: ProfitAllocator::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.calculator = config.calculator();
        self.allocator = config.allocator();
        self.retry = config.retry;
        self
    }

    pub fn calculator(&self) -> &BudgetCalculator {
        &self.calculator
    }

    /// Recomputed from scratch on every call; safe to run on each keystroke.
    /// Fails only when the figures overflow.
    pub fn preview(&self, draft: &ProjectDraft) -> Result<DraftPreview> {
        budget::preview(draft, &self.calculator, &self.allocator)
    }

    /// Freezes the draft into a project: budget snapshot, PM allocation and
    /// one immutable step per work title.
    pub fn create(&self, draft: ProjectDraft, created_by: Uuid) -> Result<Project> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("project name is required"));
        }
        validate_budget_inputs(&draft.inputs)?;
        if draft.client_budget.is_some_and(|budget| budget.is_negative()) {
            return Err(LedgerError::validation("client budget cannot be negative"));
        }

        let preview = self.preview(&draft)?;
        let mut assigned_pms: Vec<Uuid> = Vec::with_capacity(draft.assigned_pms.len());
        for pm in &draft.assigned_pms {
            if !assigned_pms.contains(pm) {
                assigned_pms.push(*pm);
            }
        }

        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            steps: draft.inputs.work_titles.iter().map(ProjectStep::from).collect(),
            general_conditions_percentage: preview.breakdown.general_conditions_percentage,
            supervision_type: draft.inputs.supervision_type,
            supervision_weeks: draft.inputs.supervision_weeks,
            discount: draft.inputs.discount,
            total_budget: preview.breakdown.total_budget,
            client_budget: preview.client_budget,
            gross_profit_rate: preview.allocation.gross_profit_rate,
            assigned_pms,
            pm_budgets: preview.allocation.pm_budgets,
            work_titles: draft.inputs.work_titles,
            created_by,
            created_at: Utc::now(),
        };
        self.retry.run("save project", || self.projects.save(&project))?;
        info!(
            project = %project.display_label(),
            steps = project.steps.len(),
            "project created"
        );
        Ok(project)
    }

    pub fn get(&self, id: Uuid) -> Result<Project> {
        self.retry.run("load project", || self.projects.require(id))
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        let mut projects = self.retry.run("list projects", || self.projects.list())?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }
}
