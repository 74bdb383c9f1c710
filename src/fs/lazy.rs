use std::fmt::{self, Debug, Formatter};
use std::sync::OnceLock;

use derive_more::IsVariant;

use crate::error::Error;

/// Where a [`Lazy`] field is in its one-way lifecycle.
///
/// ```text
/// Unresolved --access--> Resolving --ok---> Resolved
///                                   \-err--> ResolvedWithError
/// ```
///
/// `Resolving` is only observable from inside the resolver, so it isn't represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub(crate) enum LazyState {
    Unresolved,
    Resolved,
    ResolvedWithError,
}

/// A field that is computed at most once, on first access, and then cached together with any error
/// the computation produced.
///
/// Concurrent first accesses block on each other; exactly one runs the resolver.
#[derive(Clone)]
pub(crate) struct Lazy<T> {
    cell: OnceLock<Result<T, Error>>,
}

impl<T> Lazy<T> {
    pub(crate) const fn unresolved() -> Lazy<T> {
        Lazy {
            cell: OnceLock::new(),
        }
    }

    pub(crate) fn resolved(value: T) -> Lazy<T> {
        Lazy {
            cell: OnceLock::from(Ok(value)),
        }
    }

    /// Returns the cached value, running `resolve` if this is the first access. `None` means the
    /// resolver failed; the failure is available from [`Lazy::error`].
    pub(crate) fn get_or_resolve<F: FnOnce() -> Result<T, Error>>(&self, resolve: F) -> Option<&T> {
        self.cell.get_or_init(|| {
            let result = resolve();
            if let Err(err) = &result {
                tracing::debug!(error = %err, "lazy field resolution failed");
            }
            result
        }).as_ref().ok()
    }

    pub(crate) fn error(&self) -> Option<&Error> {
        self.cell.get().and_then(|result| result.as_ref().err())
    }

    pub(crate) fn state(&self) -> LazyState {
        match self.cell.get() {
            None => LazyState::Unresolved,
            Some(Ok(_)) => LazyState::Resolved,
            Some(Err(_)) => LazyState::ResolvedWithError,
        }
    }
}

impl<T: Debug> Debug for Lazy<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            None => write!(f, "<{:?}>", self.state()),
            Some(Ok(value)) => value.fmt(f),
            Some(Err(err)) => write!(f, "<error: {err}>"),
        }
    }
}
