//! Teardown of evicted values.
//!
//! The store never assumes a value can be disposed. Types opt in through
//! [`Disposable`] or a custom function registered on the store builder, and
//! the store looks the capability up by type tag when a record is evicted.

use crate::error::{AssetError, BoxError};
use crate::future::AssetValue;
use crate::identifier::{Asset, AssetType, Identifier};
use rustc_hash::FxHashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Values that hold resources needing explicit release
pub trait Disposable: Asset {
    fn dispose(&self) -> std::result::Result<(), BoxError>;
}

type DisposeFn = Arc<dyn Fn(&AssetValue) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Callback receiving disposal failures
pub type DisposeErrorHandler = Arc<dyn Fn(&Identifier, &AssetError) + Send + Sync>;

/// Default handler: log and continue
pub fn log_dispose_error(identifier: &Identifier, error: &AssetError) {
    tracing::error!(asset = %identifier, "{error}");
}

/// Disposal capabilities keyed by type tag
#[derive(Clone, Default)]
pub(crate) struct Disposers {
    by_type: FxHashMap<AssetType, DisposeFn>,
}

impl Disposers {
    pub(crate) fn register<T: Disposable>(&mut self) {
        self.register_with::<T, _>(|value: &T| value.dispose());
    }

    pub(crate) fn register_with<T, F>(&mut self, dispose: F)
    where
        T: Asset,
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let erased: DisposeFn = Arc::new(move |value: &AssetValue| match value.downcast_ref::<T>() {
            Some(value) => dispose(value),
            None => Ok(()),
        });
        self.by_type.insert(AssetType::of::<T>(), erased);
    }

    pub(crate) fn supports(&self, asset_type: AssetType) -> bool {
        self.by_type.contains_key(&asset_type)
    }

    /// Disposes `value` if its type supports it. Failures and panics go to `on_error`.
    ///
    /// Returns whether a disposer ran successfully.
    pub(crate) fn dispose(
        &self,
        identifier: &Identifier,
        value: &AssetValue,
        on_error: &DisposeErrorHandler,
    ) -> bool {
        let Some(dispose) = self.by_type.get(&identifier.asset_type()) else {
            return false;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispose(value)));
        let cause: BoxError = match outcome {
            Ok(Ok(())) => {
                tracing::trace!(asset = %identifier, "disposed");
                return true;
            }
            Ok(Err(cause)) => cause,
            Err(panic) => format!("disposer panicked: {}", panic_message(panic.as_ref())).into(),
        };
        on_error(
            identifier,
            &AssetError::Disposal {
                identifier: identifier.clone(),
                cause: Arc::from(cause),
            },
        );
        false
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Texture {
        released: AtomicUsize,
    }

    impl Disposable for Texture {
        fn dispose(&self) -> std::result::Result<(), BoxError> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Shader;

    struct Plain;

    fn collecting_handler() -> (DisposeErrorHandler, Arc<Mutex<Vec<String>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let handler: DisposeErrorHandler =
            Arc::new(move |_: &Identifier, error: &AssetError| {
                sink.lock().push(error.to_string())
            });
        (handler, errors)
    }

    #[test]
    fn test_disposable_values_are_released() {
        let mut disposers = Disposers::default();
        disposers.register::<Texture>();
        assert!(disposers.supports(AssetType::of::<Texture>()));

        let texture = Arc::new(Texture {
            released: AtomicUsize::new(0),
        });
        let value: AssetValue = texture.clone();
        let (handler, errors) = collecting_handler();

        let id = Identifier::new::<Texture>("texture.png");
        assert!(disposers.dispose(&id, &value, &handler));
        assert_eq!(texture.released.load(Ordering::SeqCst), 1);
        assert!(errors.lock().is_empty());
    }

    #[test]
    fn test_values_without_capability_are_skipped() {
        let disposers = Disposers::default();
        let value: AssetValue = Arc::new(Plain);
        let (handler, errors) = collecting_handler();

        assert!(!disposers.dispose(&Identifier::new::<Plain>("plain"), &value, &handler));
        assert!(errors.lock().is_empty());
    }

    #[test]
    fn test_failures_and_panics_are_reported() {
        let mut disposers = Disposers::default();
        disposers.register_with::<Shader, _>(|_| Err("device lost".into()));
        disposers.register_with::<Plain, _>(|_| panic!("double free"));
        let (handler, errors) = collecting_handler();

        let shader: AssetValue = Arc::new(Shader);
        let plain: AssetValue = Arc::new(Plain);
        assert!(!disposers.dispose(&Identifier::new::<Shader>("a.glsl"), &shader, &handler));
        assert!(!disposers.dispose(&Identifier::new::<Plain>("b"), &plain, &handler));

        let errors = errors.lock();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("device lost"));
        assert!(errors[1].contains("double free"));
    }
}
