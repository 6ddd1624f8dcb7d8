//! End-to-end reconciliation tests against a scripted client.
//!
//! The scripted client answers introspection SELECTs from a canned response
//! map and records every DDL/DCL statement it receives, so the tests can
//! assert on the exact statement sequence the engine sends to the server.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use chrecon_client::{Error as ClientError, Row, SqlClient, Value};
use chrecon_core::{Error, GranteeSpec, ObjectKind, Presence, Reconciler, UserSpec};

#[derive(Default)]
struct ScriptedClient {
    responses: HashMap<String, Vec<Row>>,
    reject: Vec<String>,
    statements: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self::default()
    }

    fn respond(mut self, query: &str, rows: Vec<Row>) -> Self {
        self.responses.insert(query.to_string(), rows);
        self
    }

    fn reject_containing(mut self, fragment: &str) -> Self {
        self.reject.push(fragment.to_string());
        self
    }

    fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

impl SqlClient for ScriptedClient {
    fn execute(&self, sql: &str) -> impl Future<Output = Result<Vec<Row>, ClientError>> + Send {
        let result = if sql.starts_with("SELECT") {
            // Unscripted introspection queries read as "nothing there".
            Ok(self.responses.get(sql).cloned().unwrap_or_default())
        } else if self.reject.iter().any(|fragment| sql.contains(fragment)) {
            Err(ClientError::Server {
                code: 497,
                message: "not enough privileges".to_string(),
            })
        } else {
            self.statements.lock().unwrap().push(sql.to_string());
            Ok(Vec::new())
        };
        async move { result }
    }
}

fn count_row(n: u64) -> Vec<Row> {
    vec![vec![Value::UInt(n)]]
}

fn text_rows(values: &[&str]) -> Vec<Row> {
    values
        .iter()
        .map(|v| vec![Value::Text(v.to_string())])
        .collect()
}

fn full_user_spec() -> UserSpec {
    UserSpec {
        user_name: "app_user".to_string(),
        password: Some("s3cret".to_string()),
        user_roles: Some(vec!["reader_role".to_string()]),
        user_profile: Some("readonly".to_string()),
        user_quota: Some("default_quota".to_string()),
        ..UserSpec::default()
    }
}

fn test_hasher() -> Box<chrecon_core::PasswordHasher> {
    Box::new(|plain: &str| format!("{}-hashed", plain))
}

#[tokio::test]
async fn test_create_user_end_to_end() {
    let client = ScriptedClient::new()
        .respond(
            "SELECT count() FROM system.users WHERE name = 'app_user'",
            count_row(0),
        )
        .respond(
            "SELECT count() FROM system.roles WHERE name = 'reader_role'",
            count_row(1),
        )
        .respond(
            "SELECT count() FROM system.settings_profiles WHERE name = 'readonly'",
            count_row(1),
        )
        .respond(
            "SELECT apply_to_list FROM system.quotas WHERE name = 'default_quota'",
            vec![vec![Value::TextArray(vec!["alice".to_string()])]],
        );

    let reconciler = Reconciler::new(client).with_hasher(test_hasher());
    let report = reconciler.apply_user(&full_user_spec()).await.unwrap();

    assert_eq!(report.planned, 4);
    assert!(!report.existed_before);
    assert!(report.changed);
    assert!(report.execution.is_clean());
    // The report lists the executed statements, password literal masked.
    assert_eq!(
        report.execution.applied,
        vec![
            "CREATE USER `app_user` IDENTIFIED WITH sha256_hash BY '********'".to_string(),
            "ALTER USER `app_user` SETTINGS PROFILE 'readonly'".to_string(),
            "ALTER QUOTA `default_quota` TO `alice`, `app_user`".to_string(),
            "GRANT `reader_role` TO `app_user`".to_string(),
        ]
    );
    assert_eq!(
        reconciler.client().executed(),
        vec![
            "CREATE USER `app_user` IDENTIFIED WITH sha256_hash BY 's3cret-hashed'".to_string(),
            "ALTER USER `app_user` SETTINGS PROFILE 'readonly'".to_string(),
            "ALTER QUOTA `default_quota` TO `alice`, `app_user`".to_string(),
            "GRANT `reader_role` TO `app_user`".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_converged_user_second_run_is_noop() {
    let client = ScriptedClient::new()
        .respond(
            "SELECT count() FROM system.users WHERE name = 'app_user'",
            count_row(1),
        )
        .respond(
            "SELECT auth_params FROM system.users WHERE name = 'app_user'",
            text_rows(&["s3cret-hashed"]),
        )
        .respond(
            "SELECT granted_role_name FROM system.role_grants WHERE user_name = 'app_user'",
            text_rows(&["reader_role"]),
        )
        .respond(
            "SELECT inherit_profile FROM system.settings_profile_elements WHERE user_name = 'app_user'",
            text_rows(&["readonly"]),
        )
        .respond(
            "SELECT name FROM system.quotas WHERE has(apply_to_list, 'app_user')",
            text_rows(&["default_quota"]),
        )
        .respond(
            "SELECT count() FROM system.roles WHERE name = 'reader_role'",
            count_row(1),
        )
        .respond(
            "SELECT count() FROM system.settings_profiles WHERE name = 'readonly'",
            count_row(1),
        )
        .respond(
            "SELECT apply_to_list FROM system.quotas WHERE name = 'default_quota'",
            vec![vec![Value::TextArray(vec!["app_user".to_string()])]],
        );

    let reconciler = Reconciler::new(client).with_hasher(test_hasher());
    let report = reconciler.apply_user(&full_user_spec()).await.unwrap();

    assert_eq!(report.planned, 0);
    assert!(reconciler.client().executed().is_empty());
}

#[tokio::test]
async fn test_drop_user() {
    let client = ScriptedClient::new().respond(
        "SELECT count() FROM system.users WHERE name = 'app_user'",
        count_row(1),
    );

    let spec = UserSpec {
        user_name: "app_user".to_string(),
        user_state: Presence::Absent,
        ..UserSpec::default()
    };
    let reconciler = Reconciler::new(client);
    let report = reconciler.apply_user(&spec).await.unwrap();

    assert!(report.execution.is_clean());
    assert_eq!(
        reconciler.client().executed(),
        vec!["DROP USER `app_user`".to_string()]
    );
}

#[tokio::test]
async fn test_replace_grants_end_to_end() {
    let client = ScriptedClient::new()
        .respond(
            "SELECT count() FROM system.users WHERE name = 'reader_role'",
            count_row(0),
        )
        .respond(
            "SELECT count() FROM system.roles WHERE name = 'reader_role'",
            count_row(1),
        )
        .respond(
            "SELECT access_type, database, table FROM system.grants \
             WHERE user_name = 'reader_role' OR role_name = 'reader_role'",
            vec![
                vec![
                    Value::Text("SELECT".to_string()),
                    Value::Text("main".to_string()),
                    Value::Null,
                ],
                vec![
                    Value::Text("INSERT".to_string()),
                    Value::Text("main".to_string()),
                    Value::Null,
                ],
            ],
        );

    let spec = GranteeSpec {
        grantee_name: "reader_role".to_string(),
        grants: vec!["SELECT".to_string(), "SHOW".to_string()],
        databases: vec!["main".to_string()],
        replace_grants: true,
        ..GranteeSpec::default()
    };
    let reconciler = Reconciler::new(client);
    let report = reconciler.apply_grants(&spec).await.unwrap();

    assert!(report.existed_before);
    assert!(report.execution.is_clean());
    assert_eq!(
        reconciler.client().executed(),
        vec![
            "REVOKE INSERT ON `main`.* FROM `reader_role`".to_string(),
            "GRANT SHOW ON `main`.* TO `reader_role`".to_string(),
        ]
    );
    assert_eq!(report.execution.applied, reconciler.client().executed());
}

#[tokio::test]
async fn test_missing_grantee_is_not_found() {
    let client = ScriptedClient::new();
    let spec = GranteeSpec {
        grantee_name: "ghost".to_string(),
        grants: vec!["SELECT".to_string()],
        ..GranteeSpec::default()
    };

    let err = Reconciler::new(client).apply_grants(&spec).await.unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: ObjectKind::User,
            ref name,
        } if name == "ghost"
    ));
}

#[tokio::test]
async fn test_fail_fast_skips_dependent_statements() {
    let client = ScriptedClient::new()
        .respond(
            "SELECT count() FROM system.users WHERE name = 'app_user'",
            count_row(0),
        )
        .reject_containing("CREATE USER");

    let spec = UserSpec {
        user_name: "app_user".to_string(),
        user_roles: Some(vec!["new_role".to_string()]),
        ..UserSpec::default()
    };
    let reconciler = Reconciler::new(client);
    let report = reconciler.apply_user(&spec).await.unwrap();

    assert_eq!(report.planned, 3);
    assert_eq!(report.execution.applied.len(), 0);
    assert_eq!(report.execution.failures.len(), 1);
    // Nothing after the rejected CREATE USER was attempted.
    assert!(reconciler.client().executed().is_empty());
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let client = ScriptedClient::new().respond(
        "SELECT count() FROM system.users WHERE name = 'app_user'",
        count_row(0),
    );

    let bad = UserSpec::default(); // missing user_name
    let good = UserSpec {
        user_name: "app_user".to_string(),
        ..UserSpec::default()
    };

    let reconciler = Reconciler::new(client);
    let report = reconciler.apply_batch(&[bad, good], &[]).await;

    assert!(!report.is_clean());
    assert!(matches!(report.users[0].1, Err(Error::Validation(_))));
    let ok = report.users[1].1.as_ref().unwrap();
    assert!(ok.execution.is_clean());
    assert_eq!(
        reconciler.client().executed(),
        vec!["CREATE USER `app_user`".to_string()]
    );
}

#[tokio::test]
async fn test_no_statement_ever_logs_plaintext() {
    // Reported statements never include password material, plaintext or hash.
    let client = ScriptedClient::new().respond(
        "SELECT count() FROM system.users WHERE name = 'app_user'",
        count_row(0),
    );

    let spec = UserSpec {
        user_name: "app_user".to_string(),
        password: Some("s3cret".to_string()),
        ..UserSpec::default()
    };
    let reconciler = Reconciler::new(client).with_hasher(test_hasher());
    let report = reconciler.apply_user(&spec).await.unwrap();

    for statement in &report.execution.applied {
        assert!(!statement.contains("s3cret"));
    }
}
