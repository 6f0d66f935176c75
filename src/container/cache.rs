use crate::{
    services::dispose_all, Activation, Dispose, DynSvc, InjectError,
    InjectResult, RegistrationId, ServiceDescriptor, ServiceInfo, Svc,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

#[derive(Default)]
struct Disposables {
    closed: bool,
    instances: Vec<(ServiceInfo, Svc<dyn Dispose>)>,
}

/// Caches instances per registration. Used for a container's singletons and
/// for each scope's scoped instances.
///
/// The map lock is only held long enough to fetch the cell of a registration,
/// so constructing one service never blocks resolution of another. The cell
/// guarantees the instance is constructed at most once.
#[derive(Default)]
pub(crate) struct InstanceCache {
    cells: Mutex<HashMap<RegistrationId, Arc<OnceCell<DynSvc>>>>,
    disposables: Mutex<Disposables>,
}

impl InstanceCache {
    /// Gets the cached instance of a registration, creating it if needed.
    /// Once the cache is closed, instances that finish construction are
    /// released immediately and [`InjectError::ScopeDisposed`] is returned.
    pub fn get_or_create<F>(
        &self,
        descriptor: &ServiceDescriptor,
        create: F,
    ) -> InjectResult<DynSvc>
    where
        F: FnOnce() -> InjectResult<Activation>,
    {
        let service_info = descriptor.service_info();
        let cell =
            self.cells.lock().entry(descriptor.id()).or_default().clone();
        let instance = cell.get_or_try_init(|| {
            let activation = create()?;
            let mut disposables = self.disposables.lock();
            if disposables.closed {
                drop(disposables);
                if let Some(disposer) = activation.disposer {
                    dispose_all("closed cache", vec![(service_info, disposer)]);
                }

                return Err(InjectError::ScopeDisposed { service_info });
            }

            if let Some(disposer) = activation.disposer {
                disposables.instances.push((service_info, disposer));
            }

            Ok(activation.instance)
        })?;

        if self.disposables.lock().closed {
            return Err(InjectError::ScopeDisposed { service_info });
        }

        Ok(instance.clone())
    }

    /// The number of cached instances.
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    /// Releases every resource-holding instance, newest first, then clears
    /// the cache. Returns how many releases failed.
    pub fn dispose_all(&self, owner: &str) -> usize {
        self.drain(owner, false)
    }

    /// Releases every instance like [`InstanceCache::dispose_all`] and stops
    /// caching new ones.
    pub fn close(&self, owner: &str) -> usize {
        self.drain(owner, true)
    }

    fn drain(&self, owner: &str, close: bool) -> usize {
        let instances = {
            let mut disposables = self.disposables.lock();
            disposables.closed |= close;
            std::mem::take(&mut disposables.instances)
        };
        self.cells.lock().clear();
        dispose_all(owner, instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DisposeError, InjectError, Lifetime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked(Svc<AtomicUsize>);

    impl Dispose for Tracked {
        fn dispose(&self) -> Result<(), DisposeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::factory(|_| Ok(Svc::new(0_u8)), Lifetime::Singleton)
    }

    #[test]
    fn instance_is_created_once() {
        let cache = InstanceCache::default();
        let descriptor = descriptor();
        let created = AtomicUsize::new(0);
        let create = || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Activation::new(Svc::new(1_u8)))
        };

        let first = cache.get_or_create(&descriptor, create).unwrap();
        let second = cache.get_or_create(&descriptor, create).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, created.load(Ordering::SeqCst));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn failed_creation_is_not_cached() {
        let cache = InstanceCache::default();
        let descriptor = descriptor();

        let result = cache.get_or_create(&descriptor, || {
            Err(InjectError::ServiceNotRegistered {
                service_info: ServiceInfo::of::<u8>(),
            })
        });
        assert!(result.is_err());
        assert_eq!(0, cache.len());

        cache
            .get_or_create(&descriptor, || Ok(Activation::new(Svc::new(1_u8))))
            .unwrap();
        assert_eq!(1, cache.len());
    }

    #[test]
    fn dispose_releases_and_clears() {
        let cache = InstanceCache::default();
        let released = Svc::new(AtomicUsize::new(0));
        let descriptor = descriptor();

        cache
            .get_or_create(&descriptor, || {
                Ok(Activation::disposable(Svc::new(Tracked(released.clone()))))
            })
            .unwrap();

        assert_eq!(0, cache.dispose_all("test"));
        assert_eq!(1, released.load(Ordering::SeqCst));
        assert_eq!(0, cache.len());

        assert_eq!(0, cache.dispose_all("test"));
        assert_eq!(1, released.load(Ordering::SeqCst));
    }

    #[test]
    fn closed_cache_releases_late_instances() {
        let cache = InstanceCache::default();
        let released = Svc::new(AtomicUsize::new(0));
        let descriptor = descriptor();

        let result = cache.get_or_create(&descriptor, || {
            cache.close("test");
            Ok(Activation::disposable(Svc::new(Tracked(released.clone()))))
        });
        match result {
            Err(InjectError::ScopeDisposed { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("a closed cache returned a new instance"),
        }

        assert_eq!(1, released.load(Ordering::SeqCst));
        assert_eq!(0, cache.len());
    }
}
