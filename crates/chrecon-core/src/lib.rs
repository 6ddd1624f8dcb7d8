//! chrecon core - declarative reconciliation of ClickHouse principals.
//!
//! Given desired-state records for users and grants, this crate reads the
//! server's actual state from the `system.*` tables, computes the minimal
//! ordered statement sequence that converges the server to the desired
//! state, and executes it. Running the same records twice produces no
//! statements the second time.

pub mod diff;
pub mod error;
pub mod executor;
pub mod op;
pub mod privilege;
pub mod reader;
pub mod reconcile;
pub mod spec;
pub mod sql;
pub mod state;

pub use diff::{diff_grants, diff_user};
pub use error::{Error, ObjectKind};
pub use executor::{Execution, Executor, ExecutorConfig, FailedStatement};
pub use op::Operation;
pub use privilege::{Privilege, PrivilegeLevel};
pub use reader::StateReader;
pub use reconcile::{BatchReport, GrantReport, Reconciler, UserReport};
pub use spec::{
    GrantMode, GrantTarget, GranteeSpec, Normalizer, PasswordHasher, Presence, UserSpec,
    UserTarget,
};
pub use sql::SqlRenderer;
pub use state::{GrantState, Scope, UserState};

/// Re-export client types used at the API boundary.
pub use chrecon_client as client;
