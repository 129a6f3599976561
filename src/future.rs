//! Write-once completion cells shared between the store, loader tasks and callers.
//!
//! An [`AssetFuture`] moves from pending to completed exactly once. Completion
//! attempts after the first are no-ops and report that they lost. Callers can
//! block on it, register continuations, or `.await` the typed [`AssetHandle`].

use crate::error::{AssetError, Result};
use crate::identifier::{Asset, AssetType, Identifier};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// Type-erased asset value
pub type AssetValue = Arc<dyn Any + Send + Sync>;

/// Outcome stored in a completed future
pub type LoadResult = std::result::Result<AssetValue, AssetError>;

type Continuation = Box<dyn FnOnce(&LoadResult) + Send>;

struct FutureState {
    result: Option<LoadResult>,
    continuations: Vec<Continuation>,
    wakers: Vec<Waker>,
}

struct FutureInner {
    state: Mutex<FutureState>,
    ready: Condvar,
}

/// Untyped write-once future of an asset record.
#[derive(Clone)]
pub struct AssetFuture {
    inner: Arc<FutureInner>,
}

impl AssetFuture {
    pub(crate) fn pending() -> Self {
        Self {
            inner: Arc::new(FutureInner {
                state: Mutex::new(FutureState {
                    result: None,
                    continuations: Vec::new(),
                    wakers: Vec::new(),
                }),
                ready: Condvar::new(),
            }),
        }
    }

    pub(crate) fn completed(result: LoadResult) -> Self {
        let future = Self::pending();
        future.inner.state.lock().result = Some(result);
        future
    }

    /// Completes the future. Returns `false` if it was already completed.
    ///
    /// Continuations run on the calling thread after the state lock is released.
    pub fn complete(&self, result: LoadResult) -> bool {
        let (result, continuations, wakers) = {
            let mut state = self.inner.state.lock();
            if state.result.is_some() {
                return false;
            }
            state.result = Some(result.clone());
            (
                result,
                std::mem::take(&mut state.continuations),
                std::mem::take(&mut state.wakers),
            )
        };
        self.inner.ready.notify_all();

        for continuation in continuations {
            continuation(&result);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().result.is_some()
    }

    /// Stored outcome, or `None` while pending.
    pub fn result(&self) -> Option<LoadResult> {
        self.inner.state.lock().result.clone()
    }

    /// Blocks the current thread until completion.
    pub fn wait(&self) -> LoadResult {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(result) = &state.result {
                return result.clone();
            }
            self.inner.ready.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout`. Returns `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<LoadResult> {
        let mut state = self.inner.state.lock();
        if state.result.is_none() {
            self.inner.ready.wait_for(&mut state, timeout);
        }
        state.result.clone()
    }

    /// Chains `continuation` onto completion.
    ///
    /// Runs immediately on the calling thread if already completed.
    pub fn on_complete<F>(&self, continuation: F)
    where
        F: FnOnce(&LoadResult) + Send + 'static,
    {
        let result = {
            let mut state = self.inner.state.lock();
            match &state.result {
                Some(result) => result.clone(),
                None => {
                    state.continuations.push(Box::new(continuation));
                    return;
                }
            }
        };
        continuation(&result);
    }

    /// Whether both handles point at the same completion cell
    pub fn ptr_eq(&self, other: &AssetFuture) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn poll_result(&self, cx: &mut Context<'_>) -> Poll<LoadResult> {
        let mut state = self.inner.state.lock();
        if let Some(result) = &state.result {
            return Poll::Ready(result.clone());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl fmt::Debug for AssetFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.result() {
            None => "pending",
            Some(Ok(_)) => "loaded",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("AssetFuture").field("state", &state).finish()
    }
}

pub(crate) fn downcast_value<T: Asset>(identifier: &Identifier, value: AssetValue) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| AssetError::TypeMismatch {
        identifier: identifier.clone(),
        requested: AssetType::of::<T>(),
    })
}

/// Typed view of an asset's future, returned by `load_async` and `get_async`.
pub struct AssetHandle<T: Asset> {
    identifier: Identifier,
    future: AssetFuture,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Asset> AssetHandle<T> {
    pub(crate) fn new(identifier: Identifier, future: AssetFuture) -> Self {
        Self {
            identifier,
            future,
            _phantom: PhantomData,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn future(&self) -> &AssetFuture {
        &self.future
    }

    pub fn is_completed(&self) -> bool {
        self.future.is_completed()
    }

    /// Blocks until the asset is ready.
    ///
    /// Must not be used on the owning thread while the asset still needs it to
    /// run loader work; use `AssetStore::wait` there.
    pub fn wait(&self) -> Result<Arc<T>> {
        self.resolve(self.future.wait())
    }

    /// Value or failure if completed, `None` while pending
    pub fn try_get(&self) -> Option<Result<Arc<T>>> {
        self.future.result().map(|result| self.resolve(result))
    }

    /// Whether both handles share the same underlying future
    pub fn same_future(&self, other: &AssetHandle<T>) -> bool {
        self.future.ptr_eq(&other.future)
    }

    fn resolve(&self, result: LoadResult) -> Result<Arc<T>> {
        downcast_value(&self.identifier, result?)
    }
}

impl<T: Asset> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self::new(self.identifier.clone(), self.future.clone())
    }
}

impl<T: Asset> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("identifier", &self.identifier)
            .field("future", &self.future)
            .finish()
    }
}

impl<T: Asset> Future for AssetHandle<T> {
    type Output = Result<Arc<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.future.poll_result(cx) {
            Poll::Ready(result) => Poll::Ready(self.resolve(result)),
            Poll::Pending => Poll::Pending,
        }
    }
}
