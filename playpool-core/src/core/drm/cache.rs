use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, trace, warn};

use crate::core::drm::{
    DrmBuildError, DrmError, DrmSessionBuilder, DrmSessionManager, DrmSessionRequest, Result,
};
use crate::core::media::DrmDescriptor;
use crate::core::platform::Capabilities;

/// The diagnostics callback which is invoked once for every recorded lookup failure.
pub type DrmDiagnostics = Box<dyn Fn(&DrmDescriptor, &DrmError) + Send + Sync>;

type Outcome = Result<Arc<dyn DrmSessionManager>>;

/// The process lifetime cache of DRM session managers.
///
/// Every distinct [DrmDescriptor] is resolved at most once, regardless of the outcome.
/// A failed lookup is memoized as well and is never retried.
/// Entries are never evicted.
pub struct DrmSessionCache {
    capabilities: Capabilities,
    session_builder: Arc<dyn DrmSessionBuilder>,
    diagnostics: DrmDiagnostics,
    entries: Mutex<BTreeMap<DrmDescriptor, Arc<OnceLock<Outcome>>>>,
}

impl DrmSessionCache {
    pub fn builder() -> DrmSessionCacheBuilder {
        DrmSessionCacheBuilder::default()
    }

    /// Get the session manager for the given descriptor.
    ///
    /// The session manager is only constructed on the first lookup of the descriptor,
    /// concurrent lookups of the same descriptor wait for that construction to complete.
    ///
    /// # Returns
    ///
    /// It returns the shared session manager, or the memoized [DrmError] of the descriptor.
    pub fn get(&self, descriptor: &DrmDescriptor) -> Outcome {
        let entry = {
            let mut entries = self.entries.lock().expect("failed to acquire lock");
            entries
                .entry(descriptor.clone())
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };

        let mut resolved = false;
        let outcome = entry.get_or_init(|| {
            resolved = true;
            self.resolve(descriptor)
        });
        if !resolved {
            trace!("Using memoized session manager outcome of {}", descriptor);
        }

        outcome.clone()
    }

    /// Get the session manager for the optional descriptor.
    ///
    /// This is the degraded view of [DrmSessionCache::get] in which a failure is handled as if
    /// the content is unprotected.
    pub fn session_manager(
        &self,
        descriptor: Option<&DrmDescriptor>,
    ) -> Option<Arc<dyn DrmSessionManager>> {
        descriptor.and_then(|e| self.get(e).ok())
    }

    /// Get the number of descriptors known to the cache.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("failed to acquire lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, descriptor: &DrmDescriptor) -> Outcome {
        match self.try_create(descriptor) {
            Ok(manager) => {
                debug!("Created session manager for {}", descriptor);
                Ok(manager)
            }
            Err(e) => {
                warn!("Protection of {} is unavailable, {}", descriptor, e);
                (self.diagnostics)(descriptor, &e);
                Err(e)
            }
        }
    }

    fn try_create(&self, descriptor: &DrmDescriptor) -> Outcome {
        if !self.capabilities.drm_supported {
            return Err(DrmError::NotSupported);
        }

        let scheme = descriptor
            .scheme_uuid()
            .ok_or_else(|| DrmError::UnsupportedScheme(descriptor.scheme_type.clone()))?;
        let request = DrmSessionRequest {
            scheme,
            license_url: descriptor.license_url.clone(),
            key_request_headers: descriptor.key_request_headers(),
            multi_session: descriptor.multi_session,
        };

        trace!("Building session manager for {}", request);
        self.session_builder.build(request).map_err(|e| match e {
            DrmBuildError::UnsupportedScheme => {
                DrmError::UnsupportedScheme(descriptor.scheme_type.clone())
            }
            DrmBuildError::Other(cause) => DrmError::Unknown(cause),
        })
    }
}

impl Debug for DrmSessionCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrmSessionCache")
            .field("capabilities", &self.capabilities)
            .field("session_builder", &self.session_builder)
            .field("entries", &self.len())
            .finish()
    }
}

/// Builder for the [DrmSessionCache].
#[derive(Default)]
pub struct DrmSessionCacheBuilder {
    capabilities: Option<Capabilities>,
    session_builder: Option<Arc<dyn DrmSessionBuilder>>,
    diagnostics: Option<DrmDiagnostics>,
}

impl DrmSessionCacheBuilder {
    /// Set the platform capabilities which gate the session construction.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Set the engine primitive which constructs the session managers.
    pub fn session_builder(mut self, session_builder: Arc<dyn DrmSessionBuilder>) -> Self {
        self.session_builder = Some(session_builder);
        self
    }

    /// Set the user visible diagnostics callback for lookup failures.
    pub fn diagnostics(mut self, diagnostics: DrmDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Build the session cache.
    ///
    /// # Panics
    ///
    /// It panics when the session builder has not been set.
    pub fn build(self) -> DrmSessionCache {
        DrmSessionCache {
            capabilities: self.capabilities.unwrap_or_else(Capabilities::detect),
            session_builder: self
                .session_builder
                .expect("expected the session builder to have been set"),
            diagnostics: self.diagnostics.unwrap_or_else(|| {
                Box::new(|descriptor, e| debug!("Protection diagnostic for {}: {}", descriptor, e))
            }),
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::drm::{MockDrmSessionBuilder, MockDrmSessionManager};
    use crate::core::media::WIDEVINE_UUID;
    use crate::init_logger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::Duration;

    fn new_manager() -> Arc<dyn DrmSessionManager> {
        let mut manager = MockDrmSessionManager::new();
        manager.expect_scheme().return_const(WIDEVINE_UUID);
        manager.expect_is_multi_session().return_const(false);
        Arc::new(manager)
    }

    fn supported() -> Capabilities {
        Capabilities {
            drm_supported: true,
            ..Capabilities::default()
        }
    }

    mod get {
        use super::*;

        #[test]
        fn test_memoize_success() {
            init_logger!();
            let descriptor = DrmDescriptor::new("widevine")
                .with_license_url("https://license.local/widevine")
                .with_key_request_properties(vec![
                    "X-Token".to_string(),
                    "abc".to_string(),
                    "X-Dangling".to_string(),
                ]);
            let mut builder = MockDrmSessionBuilder::new();
            builder
                .expect_build()
                .withf(|request| {
                    request.scheme == WIDEVINE_UUID
                        && request.license_url.as_deref() == Some("https://license.local/widevine")
                        && request.key_request_headers
                            == vec![("X-Token".to_string(), "abc".to_string())]
                })
                .times(1)
                .returning(|_| Ok(new_manager()));
            let cache = DrmSessionCache::builder()
                .capabilities(supported())
                .session_builder(Arc::new(builder))
                .build();

            let first = cache.get(&descriptor).unwrap();
            let second = cache.get(&descriptor.clone()).unwrap();

            assert!(
                Arc::ptr_eq(&first, &second),
                "expected the same session manager instance"
            );
            assert_eq!(1, cache.len());
        }

        #[test]
        fn test_memoize_unresolvable_scheme() {
            init_logger!();
            let descriptor = DrmDescriptor::new("xyz");
            let diagnostics = Arc::new(AtomicUsize::new(0));
            let mut builder = MockDrmSessionBuilder::new();
            builder.expect_build().times(0);
            let cache = DrmSessionCache::builder()
                .capabilities(supported())
                .session_builder(Arc::new(builder))
                .diagnostics({
                    let diagnostics = diagnostics.clone();
                    Box::new(move |_, _| {
                        diagnostics.fetch_add(1, Ordering::Relaxed);
                    })
                })
                .build();

            let first = cache.get(&descriptor);
            let second = cache.get(&descriptor);

            assert_eq!(
                Some(DrmError::UnsupportedScheme("xyz".to_string())),
                first.err()
            );
            assert_eq!(
                Some(DrmError::UnsupportedScheme("xyz".to_string())),
                second.err()
            );
            assert_eq!(1, diagnostics.load(Ordering::Relaxed));
        }

        #[test]
        fn test_platform_not_supported() {
            init_logger!();
            let mut builder = MockDrmSessionBuilder::new();
            builder.expect_build().times(0);
            let cache = DrmSessionCache::builder()
                .capabilities(Capabilities {
                    drm_supported: false,
                    ..Capabilities::default()
                })
                .session_builder(Arc::new(builder))
                .build();

            let result = cache.get(&DrmDescriptor::new("widevine"));

            assert_eq!(Some(DrmError::NotSupported), result.err());
        }

        #[test]
        fn test_construction_failure() {
            init_logger!();
            let (tx, rx) = channel();
            let mut builder = MockDrmSessionBuilder::new();
            builder
                .expect_build()
                .times(1)
                .returning(|_| Err(DrmBuildError::Other("provisioning failed".to_string())));
            let cache = DrmSessionCache::builder()
                .capabilities(supported())
                .session_builder(Arc::new(builder))
                .diagnostics(Box::new(move |_, e| tx.send(e.to_string()).unwrap()))
                .build();
            let descriptor = DrmDescriptor::new("playready");

            let result = cache.get(&descriptor);
            let _ = cache.get(&descriptor);

            assert_eq!(
                Some(DrmError::Unknown("provisioning failed".to_string())),
                result.err()
            );
            let message = rx.recv_timeout(Duration::from_millis(50)).unwrap();
            assert!(
                !message.contains("playready"),
                "expected the diagnostic to omit the scheme, got \"{}\"",
                message
            );
            assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        }

        #[test]
        fn test_builder_unsupported_scheme() {
            init_logger!();
            let (tx, rx) = channel();
            let mut builder = MockDrmSessionBuilder::new();
            builder
                .expect_build()
                .times(1)
                .returning(|_| Err(DrmBuildError::UnsupportedScheme));
            let cache = DrmSessionCache::builder()
                .capabilities(supported())
                .session_builder(Arc::new(builder))
                .diagnostics(Box::new(move |_, e| tx.send(e.to_string()).unwrap()))
                .build();

            let result = cache.get(&DrmDescriptor::new("clearkey"));

            assert_eq!(
                Some(DrmError::UnsupportedScheme("clearkey".to_string())),
                result.err()
            );
            let message = rx.recv_timeout(Duration::from_millis(50)).unwrap();
            assert!(
                message.contains("clearkey"),
                "expected the diagnostic to contain the scheme, got \"{}\"",
                message
            );
        }

        #[test]
        fn test_concurrent_lookups() {
            init_logger!();
            let constructions = Arc::new(AtomicUsize::new(0));
            let mut builder = MockDrmSessionBuilder::new();
            builder.expect_build().returning({
                let constructions = constructions.clone();
                move |_| {
                    constructions.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(new_manager())
                }
            });
            let cache = Arc::new(
                DrmSessionCache::builder()
                    .capabilities(supported())
                    .session_builder(Arc::new(builder))
                    .build(),
            );
            let descriptor = DrmDescriptor::new("widevine");

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = cache.clone();
                    let descriptor = descriptor.clone();
                    thread::spawn(move || cache.get(&descriptor).unwrap())
                })
                .collect();
            let managers: Vec<_> = handles.into_iter().map(|e| e.join().unwrap()).collect();

            assert_eq!(1, constructions.load(Ordering::SeqCst));
            assert!(managers.iter().all(|e| Arc::ptr_eq(e, &managers[0])));
        }
    }

    mod session_manager {
        use super::*;

        #[test]
        fn test_absent_descriptor() {
            init_logger!();
            let mut builder = MockDrmSessionBuilder::new();
            builder.expect_build().times(0);
            let cache = DrmSessionCache::builder()
                .capabilities(supported())
                .session_builder(Arc::new(builder))
                .build();

            let result = cache.session_manager(None);

            assert!(result.is_none(), "expected no session manager");
            assert_eq!(true, cache.is_empty());
        }

        #[test]
        fn test_failure_degrades_to_none() {
            init_logger!();
            let mut builder = MockDrmSessionBuilder::new();
            builder.expect_build().times(0);
            let cache = DrmSessionCache::builder()
                .capabilities(supported())
                .session_builder(Arc::new(builder))
                .build();

            let result = cache.session_manager(Some(&DrmDescriptor::new("xyz")));

            assert!(result.is_none(), "expected no session manager");
            assert_eq!(1, cache.len());
        }
    }
}
