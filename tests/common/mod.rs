#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use expense_ledger::{
    config::Config,
    core::services::{ExpenseService, ProjectService, SummaryService},
    currency::Money,
    domain::{Expense, ExpenseType, NewExpense, Project, ProjectDraft, WorkTitle},
    storage::{JsonRepository, LocalDocumentStore, MemoryRepository, Repository},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub struct TestEnv {
    pub base: PathBuf,
    pub expenses: Arc<dyn Repository<Expense>>,
    pub projects: Arc<dyn Repository<Project>>,
    pub expense_service: ExpenseService,
    pub project_service: ProjectService,
    pub summary_service: SummaryService,
}

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// In-memory repositories with a local document store in a temp dir.
pub fn setup_memory_env() -> TestEnv {
    build_env(
        temp_base(),
        Arc::new(MemoryRepository::<Expense>::new()),
        Arc::new(MemoryRepository::<Project>::new()),
        &Config::default(),
    )
}

/// JSON file repositories rooted in a fresh temp dir.
pub fn setup_json_env() -> TestEnv {
    let base = temp_base();
    setup_json_env_at(base, &Config::default())
}

pub fn setup_json_env_at(base: PathBuf, config: &Config) -> TestEnv {
    let expenses = JsonRepository::<Expense>::new(&base).expect("expense repository");
    let projects = JsonRepository::<Project>::new(&base).expect("project repository");
    build_env(base, Arc::new(expenses), Arc::new(projects), config)
}

pub fn build_env(
    base: PathBuf,
    expenses: Arc<dyn Repository<Expense>>,
    projects: Arc<dyn Repository<Project>>,
    config: &Config,
) -> TestEnv {
    let documents = LocalDocumentStore::new(&base).expect("document store");
    TestEnv {
        expense_service: ExpenseService::new(expenses.clone(), projects.clone())
            .with_config(config)
            .with_documents(Arc::new(documents)),
        project_service: ProjectService::new(projects.clone()).with_config(config),
        summary_service: SummaryService::new(expenses.clone(), projects.clone())
            .with_config(config),
        base,
        expenses,
        projects,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn office_expense(amount: Money) -> NewExpense {
    NewExpense::office(ExpenseType::Office, amount, "Office supplies", Uuid::new_v4())
}

/// A project with one work title: 2 x 500.00, default rates, total 1185.00.
pub fn sample_project(env: &TestEnv) -> Project {
    let mut draft = ProjectDraft::new("Kitchen remodel");
    draft.add_work_title(WorkTitle::new("Cabinets", 2.0, Money::from_units(500)));
    env.project_service
        .create(draft, Uuid::new_v4())
        .expect("create sample project")
}

/// Creates and approves an office expense.
pub fn approved_expense(env: &TestEnv, amount: Money) -> Expense {
    let expense = env
        .expense_service
        .create(office_expense(amount))
        .expect("create expense");
    env.expense_service
        .approve(expense.id, Uuid::new_v4())
        .expect("approve expense")
}
