use std::fmt::Display;

use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::store::{DocumentStore, SessionHandle, StoreOrigin};

/// Lifecycle of a [TransactionScope].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Session open, no transaction started.
    Created,
    Active,
    Committed,
    Aborted,
    Disposed,
}

impl ScopeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScopeState::Committed | ScopeState::Aborted | ScopeState::Disposed
        )
    }
}

impl Display for ScopeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScopeState::Created => "created",
            ScopeState::Active => "active",
            ScopeState::Committed => "committed",
            ScopeState::Aborted => "aborted",
            ScopeState::Disposed => "disposed",
        };
        write!(f, "{}", name)
    }
}

/// Owns one store session and the transaction running on it.
///
/// A scope is created by
/// [DatabaseConnection::begin_transaction_scope](crate::connection::DatabaseConnection::begin_transaction_scope)
/// in the `Created` state. Pass it to repository mutations to make them part of the
/// transaction once [begin_transaction](TransactionScope::begin_transaction) has run.
///
/// Dropping a scope disposes it: an open transaction is aborted and the session is
/// released. Call [dispose](TransactionScope::dispose) explicitly from async code to
/// avoid blocking in `Drop`.
///
/// # Examples
///
/// ```rust,ignore
/// let mut scope = connection.begin_transaction_scope()?;
/// scope.begin_transaction()?;
/// posts.add_one_blocking(&mut post, Some(&scope))?;
/// scope.commit_transaction_blocking()?;
/// ```
pub struct TransactionScope {
    store: DocumentStore,
    session: SessionHandle,
    state: ScopeState,
}

impl TransactionScope {
    pub(crate) fn new(store: DocumentStore, session: SessionHandle) -> Self {
        TransactionScope {
            store,
            session,
            state: ScopeState::Created,
        }
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn origin(&self) -> &StoreOrigin {
        self.session.origin()
    }

    pub fn is_in_transaction(&self) -> bool {
        self.state == ScopeState::Active && self.store.is_in_transaction(&self.session)
    }

    pub fn begin_transaction(&mut self) -> DocRepoResult<()> {
        match self.state {
            ScopeState::Created => {
                self.store.start_transaction(&self.session)?;
                self.state = ScopeState::Active;
                log::debug!("Began transaction on {}", self.session);
                Ok(())
            }
            state => Err(self.invalid_state("begin a transaction", state)),
        }
    }

    /// Commits the active transaction. A failed commit leaves the scope aborted.
    pub async fn commit_transaction(&mut self) -> DocRepoResult<()> {
        if self.state != ScopeState::Active {
            return Err(self.invalid_state("commit", self.state));
        }

        match self.store.commit_transaction(&self.session).await {
            Ok(()) => {
                self.state = ScopeState::Committed;
                log::debug!("Committed transaction on {}", self.session);
                Ok(())
            }
            Err(err) => {
                self.state = ScopeState::Aborted;
                log::error!("Commit on {} failed: {}", self.session, err);
                Err(err)
            }
        }
    }

    pub fn commit_transaction_blocking(&mut self) -> DocRepoResult<()> {
        futures::executor::block_on(self.commit_transaction())
    }

    pub async fn abort_transaction(&mut self) -> DocRepoResult<()> {
        if self.state != ScopeState::Active {
            return Err(self.invalid_state("abort", self.state));
        }
        self.state = ScopeState::Aborted;
        self.store.abort_transaction(&self.session).await?;
        log::debug!("Aborted transaction on {}", self.session);
        Ok(())
    }

    pub fn abort_transaction_blocking(&mut self) -> DocRepoResult<()> {
        futures::executor::block_on(self.abort_transaction())
    }

    /// Aborts an uncommitted transaction, then releases the session. Later calls do nothing.
    pub async fn dispose(&mut self) -> DocRepoResult<()> {
        if self.state == ScopeState::Disposed {
            return Ok(());
        }

        let mut result = Ok(());
        if self.store.is_in_transaction(&self.session) {
            log::warn!(
                "Disposing {} with an uncommitted transaction, aborting it",
                self.session
            );
            result = self.store.abort_transaction(&self.session).await;
        }

        self.store.end_session(&self.session);
        self.state = ScopeState::Disposed;
        log::debug!("Disposed scope for {}", self.session);
        result
    }

    pub fn dispose_blocking(&mut self) -> DocRepoResult<()> {
        futures::executor::block_on(self.dispose())
    }

    /// Session mutations should run under. `None` until a transaction is begun.
    pub(crate) fn write_session(&self) -> DocRepoResult<Option<&SessionHandle>> {
        match self.state {
            ScopeState::Created => Ok(None),
            ScopeState::Active => Ok(Some(&self.session)),
            state => Err(self.invalid_state("run an operation in", state)),
        }
    }

    fn invalid_state(&self, action: &str, state: ScopeState) -> DocRepoError {
        log::error!("Cannot {} a {} transaction scope", action, state);
        DocRepoError::new(
            &format!("Cannot {} a {} transaction scope", action, state),
            ErrorKind::InvalidOperation,
        )
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.state != ScopeState::Disposed {
            if let Err(err) = self.dispose_blocking() {
                log::error!("Failed to dispose transaction scope: {}", err);
            }
        }
    }
}
