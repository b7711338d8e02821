//! Loan application records
//!
//! Simple CRUD collaborator outside the dialogue core: the advisor only
//! hands users off here after an eligible assessment. Submission, listing,
//! and status updates; no decision logic.

use crate::error::AdvisorError;
use crate::models::LoanType;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

/// A submitted loan application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_type: LoanType,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub employment_type: String,
    pub monthly_income: f64,
    pub loan_amount: f64,
    pub purpose: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission payload; id, status and timestamps are assigned on submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoanApplication {
    pub user_id: Uuid,
    pub loan_type: LoanType,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub employment_type: String,
    pub monthly_income: f64,
    pub loan_amount: f64,
    pub purpose: String,
}

/// Trait for application record persistence
#[async_trait::async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn submit(&self, application: NewLoanApplication) -> Result<LoanApplication>;
    async fn list(&self, user_id: Uuid) -> Result<Vec<LoanApplication>>;
    async fn get(&self, id: Uuid) -> Result<Option<LoanApplication>>;
    async fn update_status(&self, id: Uuid, status: ApplicationStatus) -> Result<LoanApplication>;
}

/// In-memory application store
pub struct InMemoryApplicationStore {
    applications: Arc<RwLock<HashMap<Uuid, LoanApplication>>>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self {
            applications: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryApplicationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn submit(&self, application: NewLoanApplication) -> Result<LoanApplication> {
        let now = Utc::now();
        let record = LoanApplication {
            id: Uuid::new_v4(),
            user_id: application.user_id,
            loan_type: application.loan_type,
            full_name: application.full_name,
            email: application.email,
            phone: application.phone,
            employment_type: application.employment_type,
            monthly_income: application.monthly_income,
            loan_amount: application.loan_amount,
            purpose: application.purpose,
            status: ApplicationStatus::Pending,
            submitted_at: now,
            updated_at: now,
        };

        let mut applications = self.applications.write().await;
        applications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<LoanApplication>> {
        let applications = self.applications.read().await;
        let mut owned: Vec<LoanApplication> = applications
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(owned)
    }

    async fn get(&self, id: Uuid) -> Result<Option<LoanApplication>> {
        let applications = self.applications.read().await;
        Ok(applications.get(&id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: ApplicationStatus) -> Result<LoanApplication> {
        let mut applications = self.applications.write().await;
        let record = applications
            .get_mut(&id)
            .ok_or_else(|| AdvisorError::ApplicationError("Application not found".to_string()))?;

        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
