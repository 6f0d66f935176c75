use crate::{
    container::{cache::InstanceCache, engine::Engine},
    DynSvc, InjectError, InjectResult, RequestInfo, Resolver, ServiceInfo,
};
use std::{
    fmt::{Debug, Formatter},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};
use tracing::debug;

/// A bounded resolution context. Scoped services are created once per scope
/// and released when the scope is disposed, while registrations, singletons
/// and transients come from the container the scope was created from.
///
/// Scopes are disposed when dropped. Resolving from a scope after it has been
/// disposed fails with [`InjectError::ScopeDisposed`].
///
/// ```
/// use service_locator::{
///     BasicContainer, Constructors, Injectable, InjectError, Resolver,
///     ResolverExt, ServiceRegistry, Svc,
/// };
///
/// #[derive(Default)]
/// struct UnitOfWork;
///
/// impl Injectable for UnitOfWork {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(UnitOfWork::default);
///     }
/// }
///
/// let container = BasicContainer::new();
/// container.register_scoped::<UnitOfWork, UnitOfWork>().unwrap();
///
/// let scope = container.create_scope();
/// let first = scope.get_required::<UnitOfWork>().unwrap();
/// let second = scope.get_required::<UnitOfWork>().unwrap();
/// assert!(Svc::ptr_eq(&first, &second));
///
/// let sibling = container.create_scope();
/// let other = sibling.get_required::<UnitOfWork>().unwrap();
/// assert!(!Svc::ptr_eq(&first, &other));
///
/// scope.dispose();
/// assert!(matches!(
///     scope.get_required::<UnitOfWork>(),
///     Err(InjectError::ScopeDisposed { .. })
/// ));
/// ```
pub struct Scope {
    id: u64,
    depth: usize,
    engine: Engine,
    instances: InstanceCache,
    disposed: AtomicBool,
}

impl Scope {
    pub(crate) fn new(engine: Engine, depth: usize) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(scope = id, depth, backend = engine.backend(), "created scope");

        Scope {
            id,
            depth,
            engine,
            instances: InstanceCache::default(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Process-unique id of this scope.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// How many scopes this scope is nested in. Scopes created from a
    /// container have a depth of 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The number of scoped instances cached by this scope.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.instances.len()
    }

    /// Whether this scope has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Releases every resource-holding instance created by this scope, newest
    /// first, and closes the scope. Release failures are logged and don't
    /// stop the remaining instances from being released. Disposing a scope
    /// more than once has no effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let owner = format!("scope {}", self.id);
        let failures = self.instances.close(&owner);
        debug!(scope = self.id, failures, "disposed scope");
    }

    pub(crate) fn instances(&self) -> &InstanceCache {
        &self.instances
    }

    fn ensure_open(&self, service_info: ServiceInfo) -> InjectResult<()> {
        if self.is_disposed() {
            Err(InjectError::ScopeDisposed { service_info })
        } else {
            Ok(())
        }
    }
}

impl Resolver for Scope {
    fn resolve(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        self.ensure_open(service_info)?;
        self.engine.resolve_in(service_info, request_info, Some(self))
    }

    fn resolve_all(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<Vec<DynSvc>> {
        self.ensure_open(service_info)?;
        self.engine
            .resolve_all_in(service_info, request_info, Some(self))
    }

    fn contains(&self, service_info: ServiceInfo) -> bool {
        self.engine.contains(service_info)
    }

    fn create_scope(&self) -> Scope {
        self.engine.create_scope(self.depth + 1)
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("backend", &self.engine.backend())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        BasicContainer, Dispose, DisposeError, InjectError, Lifetime, Resolver,
        ResolverExt, ServiceRegistry, Svc,
    };
    use parking_lot::Mutex;
    use std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            mpsc,
        },
        thread,
    };

    fn counting_container() -> BasicContainer {
        let container = BasicContainer::new();
        let counter = Svc::new(AtomicUsize::new(0));
        container
            .register_factory(
                move |_| Ok(Svc::new(counter.fetch_add(1, Ordering::SeqCst))),
                Lifetime::Scoped,
            )
            .unwrap();
        container
    }

    #[test]
    fn child_scopes_have_their_own_instances() {
        let container = counting_container();
        let parent = container.create_scope();
        let child = parent.create_scope();

        assert_eq!(0, parent.depth());
        assert_eq!(1, child.depth());
        assert_ne!(parent.id(), child.id());

        let from_parent = parent.get_required::<usize>().unwrap();
        let from_child = child.get_required::<usize>().unwrap();
        assert!(!Svc::ptr_eq(&from_parent, &from_child));
        assert_eq!(1, parent.cached_count());
        assert_eq!(1, child.cached_count());
    }

    #[test]
    fn disposing_a_child_leaves_the_parent_open() {
        let container = counting_container();
        let parent = container.create_scope();
        let first = parent.get_required::<usize>().unwrap();

        let child = parent.create_scope();
        child.get_required::<usize>().unwrap();
        child.dispose();
        assert!(child.is_disposed());

        assert!(!parent.is_disposed());
        let second = parent.get_required::<usize>().unwrap();
        assert!(Svc::ptr_eq(&first, &second));
    }

    #[test]
    fn root_resolution_of_scoped_service_is_transient() {
        let container = counting_container();
        let scope = container.create_scope();
        let scoped = scope.get_required::<usize>().unwrap();

        let first = container.get_required::<usize>().unwrap();
        let second = container.get_required::<usize>().unwrap();
        assert!(!Svc::ptr_eq(&first, &second));
        assert!(!Svc::ptr_eq(&scoped, &first));
    }

    #[test]
    fn disposed_scope_returns_nothing_from_get() {
        let container = counting_container();
        let scope = container.create_scope();
        scope.dispose();
        scope.dispose();

        assert!(scope.get::<usize>().is_none());
        assert!(scope.get_all::<usize>().is_empty());
    }

    struct Connection(Svc<AtomicBool>);

    impl Dispose for Connection {
        fn dispose(&self) -> Result<(), DisposeError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn instance_finished_after_dispose_is_released() {
        let (started_tx, started_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let resume_rx = Mutex::new(resume_rx);
        let released = Svc::new(AtomicBool::new(false));

        let container = BasicContainer::new();
        let flag = released.clone();
        container
            .register_disposable_factory::<Connection, Connection, _>(
                move |_| {
                    started_tx.lock().send(()).unwrap();
                    resume_rx.lock().recv().unwrap();
                    Ok(Svc::new(Connection(flag.clone())))
                },
                Lifetime::Scoped,
            )
            .unwrap();

        let scope = container.create_scope();
        let result = thread::scope(|threads| {
            let pending =
                threads.spawn(|| scope.get_required::<Connection>());
            started_rx.recv().unwrap();
            scope.dispose();
            resume_tx.send(()).unwrap();
            pending.join().unwrap()
        });

        match result {
            Err(InjectError::ScopeDisposed { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("a disposed scope returned a new instance"),
        }
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(0, scope.cached_count());
    }
}
