//! Statement executor.
//!
//! Takes an ordered operation sequence, renders each operation to SQL, and
//! runs the statements against the server in order. Server-side rejections
//! are recorded per statement; transport failures abort the run and surface
//! as errors. Reports and errors carry the redacted rendering (password
//! literals masked); tracing uses operation descriptions only.

use tracing::{info, warn};

use chrecon_client::SqlClient;

use crate::error::Error;
use crate::op::Operation;
use crate::sql::SqlRenderer;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Stop at the first statement the server rejects.
    pub fail_fast: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

/// One statement the server rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStatement {
    /// Rejected statement text, with password literals redacted.
    pub statement: String,
    /// The server's error message.
    pub message: String,
}

/// Result of running an operation sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// SQL statements that were applied, in order, with password literals
    /// redacted.
    pub applied: Vec<String>,
    /// Statements the server rejected.
    pub failures: Vec<FailedStatement>,
}

impl Execution {
    /// Whether every statement was applied.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn the first recorded failure into an error, keeping the applied
    /// list otherwise.
    pub fn into_result(self) -> Result<Vec<String>, Error> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(Error::Execution {
                statement: failure.statement,
                message: failure.message,
            }),
            None => Ok(self.applied),
        }
    }
}

/// Runs rendered statements against the server, one at a time, in order.
pub struct Executor<'a, C: SqlClient> {
    client: &'a C,
    renderer: SqlRenderer,
    config: ExecutorConfig,
}

impl<'a, C: SqlClient> Executor<'a, C> {
    /// Create an executor with a renderer and configuration.
    pub fn new(client: &'a C, renderer: SqlRenderer, config: ExecutorConfig) -> Self {
        Self {
            client,
            renderer,
            config,
        }
    }

    /// Execute the operations in order. No retries: a rejected statement is
    /// recorded (and ends the run under `fail_fast`), while transport
    /// failures abort immediately since later statements may depend on
    /// earlier ones having been applied.
    pub async fn run(&self, operations: &[Operation]) -> Result<Execution, Error> {
        let mut execution = Execution::default();

        for op in operations {
            let description = op.describe();
            let sql = self.renderer.render(op);
            let redacted = self.renderer.render_redacted(op);

            match self.client.execute(&sql).await {
                Ok(_) => {
                    info!(operation = %description, "applied");
                    execution.applied.push(redacted);
                }
                Err(chrecon_client::Error::Server { code, message }) => {
                    warn!(operation = %description, code, %message, "server rejected statement");
                    execution.failures.push(FailedStatement {
                        statement: redacted,
                        message,
                    });
                    if self.config.fail_fast {
                        break;
                    }
                }
                Err(transport) => return Err(transport.into()),
            }
        }

        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrecon_client::{Error as ClientError, Row};
    use std::future::Future;
    use std::sync::Mutex;

    // Test double: records statements and fails the ones in `reject`.
    struct RecordingClient {
        statements: Mutex<Vec<String>>,
        reject: Vec<&'static str>,
        transport_failure: bool,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                statements: Mutex::new(Vec::new()),
                reject: Vec::new(),
                transport_failure: false,
            }
        }

        fn statements(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    impl SqlClient for RecordingClient {
        fn execute(
            &self,
            sql: &str,
        ) -> impl Future<Output = Result<Vec<Row>, ClientError>> + Send {
            let result = if self.transport_failure {
                Err(ClientError::Timeout)
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

    fn ops() -> Vec<Operation> {
        vec![
            Operation::CreateRole {
                role: "reader_role".to_string(),
            },
            Operation::GrantRole {
                user: "app_user".to_string(),
                role: "reader_role".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_run_applies_in_order() {
        let client = RecordingClient::new();
        let executor = Executor::new(&client, SqlRenderer::new(), ExecutorConfig::default());

        let execution = executor.run(&ops()).await.unwrap();
        assert!(execution.is_clean());
        // The report lists the executed statements themselves, in order.
        assert_eq!(
            execution.applied,
            vec![
                "CREATE ROLE IF NOT EXISTS `reader_role`".to_string(),
                "GRANT `reader_role` TO `app_user`".to_string(),
            ]
        );
        assert_eq!(client.statements(), execution.applied);
    }

    #[tokio::test]
    async fn test_report_redacts_password_statements() {
        let client = RecordingClient::new();
        let executor = Executor::new(&client, SqlRenderer::new(), ExecutorConfig::default());

        let op = Operation::CreateUser {
            name: "app_user".to_string(),
            password_hash: Some("deadbeef".to_string()),
        };
        let execution = executor.run(std::slice::from_ref(&op)).await.unwrap();

        // The server sees the real hash; the report never does.
        assert_eq!(
            client.statements(),
            vec!["CREATE USER `app_user` IDENTIFIED WITH sha256_hash BY 'deadbeef'".to_string()]
        );
        assert_eq!(
            execution.applied,
            vec!["CREATE USER `app_user` IDENTIFIED WITH sha256_hash BY '********'".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_stops_after_rejection() {
        let mut client = RecordingClient::new();
        client.reject = vec!["CREATE ROLE"];
        let executor = Executor::new(&client, SqlRenderer::new(), ExecutorConfig::default());

        let execution = executor.run(&ops()).await.unwrap();
        assert_eq!(execution.applied.len(), 0);
        assert_eq!(execution.failures.len(), 1);
        // The dependent GRANT was never attempted.
        assert!(client.statements().is_empty());
    }

    #[tokio::test]
    async fn test_without_fail_fast_continues() {
        let mut client = RecordingClient::new();
        client.reject = vec!["CREATE ROLE"];
        let executor = Executor::new(
            &client,
            SqlRenderer::new(),
            ExecutorConfig { fail_fast: false },
        );

        let execution = executor.run(&ops()).await.unwrap();
        assert_eq!(execution.applied.len(), 1);
        assert_eq!(execution.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let mut client = RecordingClient::new();
        client.transport_failure = true;
        let executor = Executor::new(&client, SqlRenderer::new(), ExecutorConfig::default());

        let err = executor.run(&ops()).await.unwrap_err();
        assert!(matches!(err, Error::Connection(ClientError::Timeout)));
    }

    #[tokio::test]
    async fn test_failure_statement_never_contains_hash() {
        let mut client = RecordingClient::new();
        client.reject = vec!["CREATE USER"];
        let executor = Executor::new(&client, SqlRenderer::new(), ExecutorConfig::default());

        let op = Operation::CreateUser {
            name: "app_user".to_string(),
            password_hash: Some("deadbeef".to_string()),
        };
        let execution = executor.run(std::slice::from_ref(&op)).await.unwrap();
        assert!(execution.failures[0].statement.contains("CREATE USER"));
        assert!(!execution.failures[0].statement.contains("deadbeef"));

        let err = execution.into_result().unwrap_err();
        assert!(err.to_string().contains("CREATE USER"));
        assert!(!err.to_string().contains("deadbeef"));
    }
}
