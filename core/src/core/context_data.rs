// core/src/core/context_data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable state for one run of a flow.
///
/// Guards are blocking and MUST NOT be held across `.await` points.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Clones a projection of the state out under a short read lock.
  ///
  /// Handlers use this to pull the inputs they need before awaiting I/O:
  /// `let (order_id, email) = ctx.snapshot(|c| (c.order_id, c.email.clone()));`
  pub fn snapshot<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }

  /// Applies a mutation under a short write lock.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    f(&mut self.0.write())
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
