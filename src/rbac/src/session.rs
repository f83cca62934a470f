//! Statement-handling boundary
//!
//! A session belongs to one authenticated role. Every statement is checked
//! against the role's *current* definition in the cache, so flag changes
//! such as a revoked superuser status apply to open sessions after the next
//! refresh.

use std::sync::Arc;
use tracing::debug;

use crate::engine::AuthorizationEngine;
use crate::error::Result;
use crate::statement::Statement;
use crate::store::Mutation;
use crate::types::{Role, RoleName};

/// Result of a statement that passed authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The statement may proceed to execution
    Authorized,

    /// The statement was a GRANT/REVOKE and the store accepted its mutation
    Applied(Mutation),
}

/// A prepared statement; authorized again on every execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    statement: Statement,
}

impl Prepared {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

/// Authenticated client session
pub struct Session {
    engine: Arc<AuthorizationEngine>,
    role: RoleName,
}

impl Session {
    pub fn new(engine: Arc<AuthorizationEngine>, role: impl Into<RoleName>) -> Self {
        Self {
            engine,
            role: role.into(),
        }
    }

    /// Name of the session's role
    pub fn role_name(&self) -> &str {
        &self.role
    }

    /// Current definition of the session's role
    ///
    /// A role missing from the installed snapshot is treated as a plain,
    /// non-superuser role with no grants of its own.
    pub fn current_role(&self) -> Role {
        self.engine
            .principal(&self.role)
            .unwrap_or_else(|| Role::new(self.role.clone()))
    }

    /// Authorize `statement` without executing it
    pub fn check(&self, statement: &Statement) -> Result<()> {
        let role = self.current_role();
        debug!(role = %role.name, statement = %statement, "Checking statement");
        self.engine.authorize_statement(&role, statement)
    }

    /// Authorize `statement`, applying it when it is a GRANT/REVOKE
    pub async fn execute(&self, statement: &Statement) -> Result<Outcome> {
        self.check(statement)?;

        match statement.mutation() {
            Some(op) => {
                let role = self.current_role();
                self.engine.apply_mutation(&role, op.clone()).await?;
                Ok(Outcome::Applied(op))
            }
            None => Ok(Outcome::Authorized),
        }
    }

    /// Prepare `statement` for repeated execution
    ///
    /// Preparation itself performs no permission check.
    pub fn prepare(&self, statement: Statement) -> Prepared {
        Prepared { statement }
    }

    /// Execute a prepared statement, re-checking permissions
    pub async fn execute_prepared(&self, prepared: &Prepared) -> Result<Outcome> {
        self.execute(&prepared.statement).await
    }
}
