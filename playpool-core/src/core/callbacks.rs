use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use fx_handle::Handle;
use log::{debug, trace, warn};

/// The unique identifier of a registered callback.
pub type CallbackHandle = Handle;

/// The callback function which is invoked for each published value.
pub type CoreCallback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Allows adding callbacks to the struct.
/// The struct will invoke the registered callbacks when a certain event occurs.
pub trait Callbacks<T> {
    /// Register a new callback.
    ///
    /// It returns the handle of the registered callback, which can be used to remove it again.
    fn add_callback(&self, callback: CoreCallback<T>) -> CallbackHandle;

    /// Remove the callback registered under the given handle.
    ///
    /// It returns `false` when the handle is unknown.
    fn remove_callback(&self, handle: CallbackHandle) -> bool;
}

/// A synchronous callback registry.
///
/// Callbacks are invoked on the thread which calls [CoreCallbacks::invoke].
/// The registered callbacks are snapshot before the invocation, which allows a callback
/// to add or remove callbacks, including itself, while it's being invoked.
pub struct CoreCallbacks<T> {
    callbacks: Mutex<Vec<(CallbackHandle, Arc<dyn Fn(T) + Send + Sync>)>>,
}

impl<T> CoreCallbacks<T>
where
    T: Debug + Clone,
{
    /// Register a new callback, see [Callbacks::add_callback].
    pub fn add(&self, callback: CoreCallback<T>) -> CallbackHandle {
        let handle = CallbackHandle::new();
        let mut mutex = self.callbacks.lock().expect("failed to acquire lock");
        mutex.push((handle.clone(), Arc::from(callback)));
        trace!("Added callback {}, total callbacks {}", handle, mutex.len());
        handle
    }

    /// Remove the callback with the given handle.
    ///
    /// It returns `true` when the callback was registered, else `false`.
    pub fn remove(&self, handle: &CallbackHandle) -> bool {
        let mut mutex = self.callbacks.lock().expect("failed to acquire lock");
        match mutex.iter().position(|(e, _)| e == handle) {
            Some(index) => {
                mutex.remove(index);
                trace!("Removed callback {}", handle);
                true
            }
            None => {
                trace!("Callback {} is not registered", handle);
                false
            }
        }
    }

    /// Invoke all registered callbacks with the given value.
    pub fn invoke(&self, value: T) {
        let snapshot: Vec<(CallbackHandle, Arc<dyn Fn(T) + Send + Sync>)> = self
            .callbacks
            .lock()
            .expect("failed to acquire lock")
            .iter()
            .map(|(handle, callback)| (handle.clone(), callback.clone()))
            .collect();

        trace!(
            "Invoking a total of {} callbacks for {:?}",
            snapshot.len(),
            value
        );
        for (handle, callback) in snapshot {
            let start_time = Instant::now();
            callback(value.clone());
            let elapsed = start_time.elapsed();
            if elapsed.as_millis() >= 1000 {
                warn!(
                    "Callback {} took {}ms to process the invocation",
                    handle,
                    elapsed.as_millis()
                );
            }
        }
    }

    /// Remove all registered callbacks.
    pub fn clear(&self) {
        let mut mutex = self.callbacks.lock().expect("failed to acquire lock");
        let total = mutex.len();
        mutex.clear();
        if total > 0 {
            debug!("Removed a total of {} callbacks", total);
        }
    }

    /// Get the total number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.lock().expect("failed to acquire lock").len()
    }

    /// Verify if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Callbacks<T> for CoreCallbacks<T>
where
    T: Debug + Clone,
{
    fn add_callback(&self, callback: CoreCallback<T>) -> CallbackHandle {
        self.add(callback)
    }

    fn remove_callback(&self, handle: CallbackHandle) -> bool {
        self.remove(&handle)
    }
}

impl<T> Default for CoreCallbacks<T> {
    fn default() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Debug for CoreCallbacks<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreCallbacks")
            .field(
                "callbacks",
                &self.callbacks.lock().map(|e| e.len()).unwrap_or_default(),
            )
            .finish()
    }
}
