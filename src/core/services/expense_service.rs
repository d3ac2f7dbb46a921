//! Read-modify-write orchestration for expenses.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::core::locks::KeyedLocks;
use crate::core::retry::RetryPolicy;
use crate::domain::{
    Assignment, Displayable, Document, DocumentUpload, Expense, NewExpense, NewPayment, Payment, Project,
};
use crate::errors::{LedgerError, Result};
use crate::ledger::{lifecycle, payments, validator};
use crate::storage::{DocumentStore, Repository};

/// An upload that failed after its expense had already been saved.
#[derive(Debug)]
pub struct DocumentFailure {
    pub name: String,
    pub error: LedgerError,
}

/// Result of [`ExpenseService::create_with_documents`]. The expense is saved
/// even when some uploads fail; nothing is rolled back.
#[derive(Debug)]
pub struct CreatedExpense {
    pub expense: Expense,
    pub failures: Vec<DocumentFailure>,
}

impl CreatedExpense {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies lifecycle and ledger operations to persisted expenses.
///
/// Every mutation holds the per-expense lock across load, change and save,
/// so concurrent payments on one expense cannot overwrite each other.
pub struct ExpenseService {
    expenses: Arc<dyn Repository<Expense>>,
    projects: Arc<dyn Repository<Project>>,
    documents: Option<Arc<dyn DocumentStore>>,
    locks: KeyedLocks,
    retry: RetryPolicy,
    allow_delete_with_payments: bool,
}

impl ExpenseService {
    pub fn new(
        expenses: Arc<dyn Repository<Expense>>,
        projects: Arc<dyn Repository<Project>>,
    ) -> Self {
        Self {
            expenses,
            projects,
            documents: None,
            locks: KeyedLocks::new(),
            retry: RetryPolicy::default(),
            allow_delete_with_payments: false,
        }
    }

    pub fn with_documents(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.retry = config.retry;
        self.allow_delete_with_payments = config.allow_delete_with_payments;
        self
    }

    pub fn create(&self, input: NewExpense) -> Result<Expense> {
        let expense = lifecycle::create(input, Utc::now())?;
        if let Assignment::Project {
            project_id,
            step_id,
        } = expense.assignment
        {
            let project = self.retry.run("load project", || self.projects.require(project_id))?;
            if let Some(step_id) = step_id {
                if project.step(step_id).is_none() {
                    return Err(LedgerError::validation(format!(
                        "step {} does not belong to project `{}`",
                        step_id, project.name
                    )));
                }
            }
        }
        self.locks.with_lock(expense.id, || self.store(&expense))?;
        info!(expense = %expense.id, amount = %expense.amount, kind = %expense.expense_type, "expense created");
        Ok(expense)
    }

    /// Creates the expense, then uploads each document. Upload failures are
    /// reported back; the saved expense stays as it is.
    pub fn create_with_documents(
        &self,
        input: NewExpense,
        uploads: Vec<DocumentUpload>,
    ) -> Result<CreatedExpense> {
        let created = self.create(input)?;
        let mut failures = Vec::new();
        for upload in uploads {
            if let Err(error) = self.attach_expense_document(created.id, &upload) {
                warn!(expense = %created.id, name = %upload.name, %error, "document upload failed after create");
                failures.push(DocumentFailure {
                    name: upload.name,
                    error,
                });
            }
        }
        let expense = self.get(created.id)?;
        Ok(CreatedExpense { expense, failures })
    }

    pub fn get(&self, id: Uuid) -> Result<Expense> {
        self.load(id)
    }

    pub fn approve(&self, id: Uuid, approver: Uuid) -> Result<Expense> {
        self.mutate(id, |expense| lifecycle::approve(expense, approver, Utc::now()))
            .map(|(expense, ())| expense)
    }

    pub fn reject(&self, id: Uuid, approver: Uuid, reason: &str) -> Result<Expense> {
        self.mutate(id, |expense| {
            lifecycle::reject(expense, approver, reason, Utc::now())
        })
        .map(|(expense, ())| expense)
    }

    pub fn add_payment(&self, id: Uuid, payment: NewPayment) -> Result<Payment> {
        self.mutate(id, |expense| {
            payments::add_payment(expense, payment, Utc::now())
        })
        .map(|(_, payment)| payment)
    }

    /// Newest payment date first; same-date payments in the order they were recorded.
    pub fn list_payments(&self, id: Uuid) -> Result<Vec<Payment>> {
        let expense = self.load(id)?;
        Ok(payments::list_payments(&expense)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn attach_expense_document(&self, id: Uuid, upload: &DocumentUpload) -> Result<Document> {
        let store = self.document_store()?;
        // Fail fast before writing a file for an unknown expense.
        self.load(id)?;
        let document = store.store(upload)?;
        let attached = document.clone();
        let outcome = self.mutate(id, move |expense| {
            expense.documents.push(attached);
            expense.touch(Utc::now());
            Ok(())
        });
        self.discard_on_error(store, &document, outcome)?;
        Ok(document)
    }

    pub fn remove_expense_document(&self, id: Uuid, document_id: Uuid) -> Result<Document> {
        let store = self.document_store()?;
        let (_, removed) = self.mutate(id, |expense| {
            let position = expense
                .documents
                .iter()
                .position(|doc| doc.id == document_id)
                .ok_or(LedgerError::NotFound {
                    kind: "Document",
                    id: document_id,
                })?;
            expense.touch(Utc::now());
            Ok(expense.documents.remove(position))
        })?;
        self.delete_file(store, &removed);
        Ok(removed)
    }

    pub fn attach_payment_document(
        &self,
        id: Uuid,
        payment_id: Uuid,
        upload: &DocumentUpload,
    ) -> Result<Document> {
        let store = self.document_store()?;
        let expense = self.load(id)?;
        if expense.payment(payment_id).is_none() {
            return Err(LedgerError::NotFound {
                kind: "Payment",
                id: payment_id,
            });
        }
        let document = store.store(upload)?;
        let attached = document.clone();
        let outcome = self.mutate(id, move |expense| {
            payments::attach_payment_document(expense, payment_id, attached, Utc::now())
        });
        self.discard_on_error(store, &document, outcome)?;
        Ok(document)
    }

    pub fn remove_payment_document(
        &self,
        id: Uuid,
        payment_id: Uuid,
        document_id: Uuid,
    ) -> Result<Document> {
        let store = self.document_store()?;
        let (_, removed) = self.mutate(id, |expense| {
            payments::remove_payment_document(expense, payment_id, document_id, Utc::now())
        })?;
        self.delete_file(store, &removed);
        Ok(removed)
    }

    /// Refuses to delete an expense with recorded payments unless the
    /// configuration allows it.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.locks.with_lock(id, || {
            let expense = self.load(id)?;
            lifecycle::ensure_deletable(&expense, self.allow_delete_with_payments)?;
            self.retry.run("delete expense", || self.expenses.delete(id))?;
            info!(expense = %expense.display_label(), payments = expense.payments.len(), "expense deleted");
            Ok(())
        })
    }

    pub fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Expense>> {
        self.list_where(|expense| expense.project_id() == Some(project_id))
    }

    pub fn list_office(&self) -> Result<Vec<Expense>> {
        self.list_where(Expense::is_office)
    }

    fn list_where(&self, keep: impl Fn(&Expense) -> bool) -> Result<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .retry
            .run("list expenses", || self.expenses.list())?
            .into_iter()
            .filter(|expense| keep(expense))
            .collect();
        for expense in &expenses {
            validator::verify_loaded(expense)?;
        }
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(expenses)
    }

    fn mutate<R>(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut Expense) -> Result<R>,
    ) -> Result<(Expense, R)> {
        self.locks.with_lock(id, || {
            let mut expense = self.load(id)?;
            let output = change(&mut expense)?;
            self.store(&expense)?;
            Ok((expense, output))
        })
    }

    fn load(&self, id: Uuid) -> Result<Expense> {
        let expense = self.retry.run("load expense", || self.expenses.require(id))?;
        validator::verify_loaded(&expense)?;
        Ok(expense)
    }

    fn store(&self, expense: &Expense) -> Result<()> {
        validator::check_invariants(expense)?;
        self.retry.run("save expense", || self.expenses.save(expense))
    }

    fn document_store(&self) -> Result<&Arc<dyn DocumentStore>> {
        self.documents
            .as_ref()
            .ok_or_else(|| LedgerError::Config("no document store configured".into()))
    }

    fn discard_on_error<R>(
        &self,
        store: &Arc<dyn DocumentStore>,
        document: &Document,
        outcome: Result<R>,
    ) -> Result<R> {
        if outcome.is_err() {
            self.delete_file(store, document);
        }
        outcome
    }

    fn delete_file(&self, store: &Arc<dyn DocumentStore>, document: &Document) {
        if let Err(error) = store.remove(document) {
            warn!(document = %document.id, %error, "stored file could not be removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Money;
    use crate::domain::{ExpenseStatus, ExpenseType, PaymentMethod};
    use crate::storage::MemoryRepository;
    use chrono::NaiveDate;

    fn service() -> ExpenseService {
        ExpenseService::new(
            Arc::new(MemoryRepository::<Expense>::new()),
            Arc::new(MemoryRepository::<Project>::new()),
        )
    }

    fn office(amount: Money) -> NewExpense {
        NewExpense::office(ExpenseType::Office, amount, "Copier lease", Uuid::new_v4())
    }

    #[test]
    fn unknown_project_is_not_found() {
        let svc = service();
        let form = NewExpense::for_project(
            Uuid::new_v4(),
            ExpenseType::Project,
            Money::from_units(10),
            "Permit",
            Uuid::new_v4(),
        );
        assert!(matches!(
            svc.create(form),
            Err(LedgerError::NotFound { kind: "Project", .. })
        ));
    }

    #[test]
    fn failed_payment_is_not_persisted() {
        let svc = service();
        let expense = svc.create(office(Money::from_units(50))).unwrap();
        svc.approve(expense.id, Uuid::new_v4()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let too_much = NewPayment::new(Money::from_units(51), date, PaymentMethod::Cash, Uuid::new_v4());
        assert!(svc.add_payment(expense.id, too_much).is_err());

        let stored = svc.get(expense.id).unwrap();
        assert_eq!(stored.status, ExpenseStatus::Approved);
        assert!(stored.payments.is_empty());
    }

    #[test]
    fn documents_require_a_store() {
        let svc = service();
        let expense = svc.create(office(Money::from_units(5))).unwrap();
        let upload = DocumentUpload::new("r.pdf", "application/pdf", vec![1], Uuid::new_v4());
        assert!(matches!(
            svc.attach_expense_document(expense.id, &upload),
            Err(LedgerError::Config(_))
        ));
    }
}
