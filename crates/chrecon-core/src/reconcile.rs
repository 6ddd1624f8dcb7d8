//! Reconciliation facade.
//!
//! Ties the pipeline together: normalize the raw record, read actual state,
//! diff, render, execute. `plan_*` stops before execution and returns the
//! operation sequence, which is how dry runs are done. Batch entry points
//! isolate failures per principal so one bad record cannot block the rest.

use tracing::{debug, info, warn};

use chrecon_client::SqlClient;

use crate::diff::{diff_grants, diff_user};
use crate::error::{Error, ObjectKind};
use crate::executor::{Execution, Executor, ExecutorConfig};
use crate::op::Operation;
use crate::reader::StateReader;
use crate::spec::{GranteeSpec, Normalizer, PasswordHasher, UserSpec};
use crate::sql::SqlRenderer;

/// Outcome of reconciling one user record.
#[derive(Debug)]
pub struct UserReport {
    /// User the record targeted.
    pub user: String,
    /// Whether the user existed before reconciliation.
    pub existed_before: bool,
    /// Number of operations the diff produced.
    pub planned: usize,
    /// Whether any statement was applied.
    pub changed: bool,
    /// What was actually applied.
    pub execution: Execution,
    /// User state re-read after execution.
    pub state: crate::state::UserState,
}

/// Outcome of reconciling one grant record.
#[derive(Debug)]
pub struct GrantReport {
    /// Grantee the record targeted.
    pub grantee: String,
    /// Whether the grantee existed before reconciliation.
    pub existed_before: bool,
    /// Number of operations the diff produced.
    pub planned: usize,
    /// Whether any statement was applied.
    pub changed: bool,
    /// What was actually applied.
    pub execution: Execution,
    /// Grant state re-read after execution.
    pub state: crate::state::GrantState,
}

/// Outcome of reconciling a batch of records. Each principal carries its own
/// result; an error for one never aborts the others.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-user outcomes, in input order.
    pub users: Vec<(String, Result<UserReport, Error>)>,
    /// Per-grantee outcomes, in input order.
    pub grantees: Vec<(String, Result<GrantReport, Error>)>,
}

impl BatchReport {
    /// Whether every record was reconciled without errors or rejected
    /// statements.
    pub fn is_clean(&self) -> bool {
        self.users
            .iter()
            .all(|(_, r)| matches!(r, Ok(report) if report.execution.is_clean()))
            && self
                .grantees
                .iter()
                .all(|(_, r)| matches!(r, Ok(report) if report.execution.is_clean()))
    }
}

/// Drives reconciliation of user and grant records against one server.
pub struct Reconciler<C: SqlClient> {
    client: C,
    normalizer: Normalizer,
    config: ExecutorConfig,
}

impl<C: SqlClient> Reconciler<C> {
    /// Create a reconciler over a client with default configuration.
    pub fn new(client: C) -> Self {
        Self {
            client,
            normalizer: Normalizer::new(),
            config: ExecutorConfig::default(),
        }
    }

    /// Inject the hashing collaborator used for plaintext passwords.
    pub fn with_hasher(mut self, hasher: Box<PasswordHasher>) -> Self {
        self.normalizer = Normalizer::new().with_hasher(hasher);
        self
    }

    /// Override the executor configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Compute the operations a user record requires, without executing.
    pub async fn plan_user(&self, spec: &UserSpec) -> Result<Vec<Operation>, Error> {
        let target = self.normalizer.user(spec)?;
        let actual = StateReader::new(&self.client).read_user(&target).await?;
        let operations = diff_user(&target, &actual)?;
        debug!(
            user = %target.name,
            operations = operations.len(),
            "planned user reconciliation"
        );
        Ok(operations)
    }

    /// Reconcile one user record. The returned report includes the user
    /// state re-read after execution.
    pub async fn apply_user(&self, spec: &UserSpec) -> Result<UserReport, Error> {
        let target = self.normalizer.user(spec)?;
        let reader = StateReader::new(&self.client);
        let before = reader.read_user(&target).await?;
        let operations = diff_user(&target, &before)?;
        if operations.is_empty() {
            info!(user = %target.name, "user already converged");
        }
        let execution = Executor::new(&self.client, SqlRenderer::new(), self.config.clone())
            .run(&operations)
            .await?;
        let state = reader.read_user(&target).await?;
        Ok(UserReport {
            user: target.name,
            existed_before: before.exists,
            planned: operations.len(),
            changed: !execution.applied.is_empty(),
            execution,
            state,
        })
    }

    /// Compute the operations a grant record requires, without executing.
    pub async fn plan_grants(&self, spec: &GranteeSpec) -> Result<Vec<Operation>, Error> {
        let target = self.normalizer.grants(spec)?;
        let actual = StateReader::new(&self.client).read_grants(&target).await?;
        if !actual.grantee_exists {
            return Err(Error::NotFound {
                kind: ObjectKind::User,
                name: target.grantee,
            });
        }
        let operations = diff_grants(&target, &actual)?;
        debug!(
            grantee = %target.grantee,
            operations = operations.len(),
            "planned grant reconciliation"
        );
        Ok(operations)
    }

    /// Reconcile one grant record. The returned report includes the grant
    /// state re-read after execution.
    pub async fn apply_grants(&self, spec: &GranteeSpec) -> Result<GrantReport, Error> {
        let target = self.normalizer.grants(spec)?;
        let reader = StateReader::new(&self.client);
        let before = reader.read_grants(&target).await?;
        if !before.grantee_exists {
            return Err(Error::NotFound {
                kind: ObjectKind::User,
                name: target.grantee,
            });
        }
        let operations = diff_grants(&target, &before)?;
        if operations.is_empty() {
            info!(grantee = %target.grantee, "grants already converged");
        }
        let renderer = SqlRenderer::new().with_cluster(target.cluster.clone());
        let execution = Executor::new(&self.client, renderer, self.config.clone())
            .run(&operations)
            .await?;
        let state = reader.read_grants(&target).await?;
        Ok(GrantReport {
            grantee: target.grantee,
            existed_before: before.grantee_exists,
            planned: operations.len(),
            changed: !execution.applied.is_empty(),
            execution,
            state,
        })
    }

    /// Reconcile a batch of records. Users are processed before grants so a
    /// grant record can target a user created in the same batch.
    pub async fn apply_batch(
        &self,
        users: &[UserSpec],
        grantees: &[GranteeSpec],
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for spec in users {
            let result = self.apply_user(spec).await;
            if let Err(err) = &result {
                warn!(user = %spec.user_name, error = %err, "user reconciliation failed");
            }
            report.users.push((spec.user_name.clone(), result));
        }
        for spec in grantees {
            let result = self.apply_grants(spec).await;
            if let Err(err) = &result {
                warn!(grantee = %spec.grantee_name, error = %err, "grant reconciliation failed");
            }
            report.grantees.push((spec.grantee_name.clone(), result));
        }

        report
    }
}
