//! Connection adapter for the query execution layer.
//!
//! Every call runs the matching [`FailoverController`] hook before it
//! touches the active connection. The adapter also tracks transaction depth:
//! a transaction whose connection was swapped by a read-path failover is
//! abandoned rather than silently continued on the new host.

use std::sync::Arc;

use tracing::warn;

use flexroute_core::{HostSpec, RoleMode, RouterConfig, RouterError, RouterResult, SharedActiveRoute};

use crate::driver::Connector;
use crate::failover::controller::FailoverController;
use crate::failover::invalidator::MetadataInvalidator;

#[derive(Debug)]
struct OpenTransaction {
    depth: u32,
    generation: u64,
    host: HostSpec,
}

/// One logical client connection routed through a failover controller.
#[derive(Debug)]
pub struct ConnectionAdapter {
    controller: FailoverController,
    transaction: Option<OpenTransaction>,
}

impl ConnectionAdapter {
    /// Select the initial host and connect.
    pub async fn connect(
        config: &RouterConfig,
        connector: Arc<dyn Connector>,
        invalidator: Arc<dyn MetadataInvalidator>,
    ) -> RouterResult<Self> {
        let controller = FailoverController::connect(config, connector, invalidator).await?;
        Ok(Self::from_controller(controller))
    }

    /// Wrap an already connected controller.
    pub fn from_controller(controller: FailoverController) -> Self {
        Self {
            controller,
            transaction: None,
        }
    }

    /// The underlying controller.
    pub fn controller(&self) -> &FailoverController {
        &self.controller
    }

    /// The role this adapter routes to.
    pub fn mode(&self) -> RoleMode {
        self.controller.mode()
    }

    /// Host behind the active connection.
    pub fn active_host(&self) -> &HostSpec {
        self.controller.active_host()
    }

    /// Shared view of the active route.
    pub fn route(&self) -> SharedActiveRoute {
        self.controller.route()
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Nesting depth of the open transaction, 0 when none.
    pub fn transaction_depth(&self) -> u32 {
        self.transaction.as_ref().map_or(0, |tx| tx.depth)
    }

    /// Verify the active host's role outside of any transaction.
    pub async fn ensure_role(&mut self) -> RouterResult<()> {
        self.controller.before_transaction_begin(self.in_transaction()).await
    }

    /// Start a transaction, or nest one level deeper in the open one.
    ///
    /// Only the outermost call issues `BEGIN`.
    pub async fn begin_transaction(&mut self) -> RouterResult<()> {
        self.controller
            .before_transaction_begin(self.in_transaction())
            .await?;
        self.check_transaction()?;

        if let Some(tx) = self.transaction.as_mut() {
            tx.depth += 1;
            return Ok(());
        }

        self.controller.connection_mut().execute("BEGIN").await?;
        self.transaction = Some(OpenTransaction {
            depth: 1,
            generation: self.controller.generation(),
            host: self.controller.active_host().clone(),
        });
        Ok(())
    }

    /// Execute a statement on the active connection.
    pub async fn execute(&mut self, statement: &str) -> RouterResult<u64> {
        self.controller
            .before_execute(statement, self.in_transaction())
            .await?;
        self.check_transaction()?;
        Ok(self.controller.connection_mut().execute(statement).await?)
    }

    /// Leave one nesting level; the outermost commit issues `COMMIT`.
    pub async fn commit(&mut self) -> RouterResult<()> {
        self.check_transaction()?;
        let tx = self
            .transaction
            .as_mut()
            .ok_or(RouterError::NoOpenTransaction)?;

        tx.depth -= 1;
        if tx.depth == 0 {
            self.transaction = None;
            self.controller.connection_mut().execute("COMMIT").await?;
        }
        Ok(())
    }

    /// Roll back the whole transaction regardless of nesting.
    pub async fn rollback(&mut self) -> RouterResult<()> {
        self.transaction
            .take()
            .ok_or(RouterError::NoOpenTransaction)?;
        self.controller.connection_mut().execute("ROLLBACK").await?;
        Ok(())
    }

    /// Roll back any open transaction and close the active connection.
    pub async fn close(mut self) -> RouterResult<()> {
        if self.in_transaction() {
            if let Err(err) = self.rollback().await {
                warn!(error = %err, "rollback on close failed");
            }
        }
        Ok(self.controller.shutdown().await?)
    }

    fn check_transaction(&mut self) -> RouterResult<()> {
        let abandoned = self
            .transaction
            .as_ref()
            .is_some_and(|tx| tx.generation != self.controller.generation());

        if abandoned {
            if let Some(tx) = self.transaction.take() {
                warn!(
                    from = %tx.host,
                    to = %self.controller.active_host(),
                    "transaction abandoned after failover"
                );
                return Err(RouterError::TransactionAbandoned { host: tx.host });
            }
        }
        Ok(())
    }
}
