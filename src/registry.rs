use crate::{
    services::erase, Activation, ConstructorSet, Container, Dispose,
    InjectResult, Injectable, InterfaceFor, Lifetime, Module, ModuleEntry,
    Resolver, Service, ServiceDescriptor, Svc,
};
use std::sync::Arc;
use tracing::debug;

/// Typed registration methods, available on every [`Container`].
///
/// Each registration of a service replaces the one used to resolve it. Every
/// method returns an error if the container no longer accepts registrations.
///
/// ## Example
///
/// ```
/// use service_locator::{
///     interface, BasicContainer, Constructors, Injectable, Lifetime,
///     ResolverExt, ServiceRegistry, Svc,
/// };
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock(u64);
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         self.0
///     }
/// }
///
/// interface!(Clock = [FixedClock]);
///
/// struct Scheduler {
///     clock: Svc<dyn Clock>,
/// }
///
/// impl Injectable for Scheduler {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(|clock: Svc<dyn Clock>| Scheduler { clock });
///     }
/// }
///
/// let container = BasicContainer::new();
/// container
///     .register_factory::<dyn Clock, _>(
///         |_| Ok(Svc::new(FixedClock(42))),
///         Lifetime::Singleton,
///     )
///     .unwrap();
/// container.register_transient::<Scheduler, Scheduler>().unwrap();
///
/// let scheduler = container.get_required::<Scheduler>().unwrap();
/// assert_eq!(42, scheduler.clock.now());
/// ```
pub trait ServiceRegistry: Container {
    /// Registers `I` as the implementation of `C`, constructing a new instance
    /// for every resolution.
    fn register_transient<C, I>(&self) -> InjectResult<()>
    where
        C: ?Sized + InterfaceFor<I>,
        I: Injectable,
    {
        self.register_implementation::<C, I>(Lifetime::Transient)
    }

    /// Registers `I` as the implementation of `C`, constructing a single
    /// instance for the container.
    fn register_singleton<C, I>(&self) -> InjectResult<()>
    where
        C: ?Sized + InterfaceFor<I>,
        I: Injectable,
    {
        self.register_implementation::<C, I>(Lifetime::Singleton)
    }

    /// Registers `I` as the implementation of `C`, constructing one instance
    /// per scope.
    fn register_scoped<C, I>(&self) -> InjectResult<()>
    where
        C: ?Sized + InterfaceFor<I>,
        I: Injectable,
    {
        self.register_implementation::<C, I>(Lifetime::Scoped)
    }

    /// Registers `I` as the implementation of `C` with the given lifetime.
    /// The constructors of `I` also become known to the container, so `I` can
    /// be auto-wired on its own.
    fn register_implementation<C, I>(
        &self,
        lifetime: Lifetime,
    ) -> InjectResult<()>
    where
        C: ?Sized + InterfaceFor<I>,
        I: Injectable,
    {
        let constructors = Arc::new(ConstructorSet::of::<I>());
        self.add_constructors(constructors.clone())?;
        self.register(ServiceDescriptor::from_constructors::<C, I>(
            constructors,
            lifetime,
        ))
    }

    /// Registers a pre-built instance of `C`. The instance is owned by the
    /// caller and is never disposed by the container.
    fn register_instance<C>(&self, instance: Svc<C>) -> InjectResult<()>
    where
        C: ?Sized + Service,
    {
        self.register(ServiceDescriptor::instance(instance))
    }

    /// Registers a factory for `C`. The factory receives the resolver the
    /// service is being resolved from.
    fn register_factory<C, F>(
        &self,
        factory: F,
        lifetime: Lifetime,
    ) -> InjectResult<()>
    where
        C: ?Sized + Service,
        F: Fn(&dyn Resolver) -> InjectResult<Svc<C>> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::factory(factory, lifetime))
    }

    /// Registers a factory for `C` that creates resource-holding instances of
    /// `D`. Singleton and scoped instances are released when their owning
    /// container or scope is disposed.
    fn register_disposable_factory<C, D, F>(
        &self,
        factory: F,
        lifetime: Lifetime,
    ) -> InjectResult<()>
    where
        C: ?Sized + InterfaceFor<D>,
        D: Dispose,
        F: Fn(&dyn Resolver) -> InjectResult<Svc<D>> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::activation_factory::<C, _>(
            move |resolver| {
                let instance = factory(resolver)?;
                Ok(Activation {
                    disposer: Some(instance.clone() as Svc<dyn Dispose>),
                    instance: erase(C::from_svc(instance)),
                })
            },
            lifetime,
        ))
    }

    /// Registers `I` as the implementation of `C` only if `predicate` accepts
    /// the container as it is now. Returns whether the registration was made.
    ///
    /// ```
    /// use service_locator::{
    ///     BasicContainer, Constructors, Injectable, Lifetime, ResolverExt,
    ///     ServiceRegistry, Svc,
    /// };
    ///
    /// #[derive(Default)]
    /// struct Cache;
    ///
    /// impl Injectable for Cache {
    ///     fn constructors(constructors: &mut Constructors<Self>) {
    ///         constructors.add(Cache::default);
    ///     }
    /// }
    ///
    /// let container = BasicContainer::new();
    /// container.register_instance(Svc::new(Cache)).unwrap();
    ///
    /// let registered = container
    ///     .register_if::<Cache, Cache, _>(
    ///         |container| !container.is_registered::<Cache>(),
    ///         Lifetime::Singleton,
    ///     )
    ///     .unwrap();
    /// assert!(!registered);
    /// ```
    fn register_if<C, I, P>(
        &self,
        predicate: P,
        lifetime: Lifetime,
    ) -> InjectResult<bool>
    where
        C: ?Sized + InterfaceFor<I>,
        I: Injectable,
        P: FnOnce(&Self) -> bool,
    {
        if !predicate(self) {
            debug!(
                service = std::any::type_name::<C>(),
                "skipped conditional registration"
            );
            return Ok(false);
        }

        self.register_implementation::<C, I>(lifetime)?;
        Ok(true)
    }

    /// Makes the constructors of `T` known to the container without
    /// registering it. Resolving `T` then auto-wires it as a transient.
    fn register_constructors<T: Injectable>(&self) -> InjectResult<()> {
        self.add_constructors(Arc::new(ConstructorSet::of::<T>()))
    }

    /// Imports every entry of a module accepted by `predicate`. Each accepted
    /// type is registered under each of its interfaces, or under itself if it
    /// declares none. Returns the number of registrations made.
    fn register_module<P>(
        &self,
        module: &Module,
        mut predicate: P,
        lifetime: Lifetime,
    ) -> InjectResult<usize>
    where
        P: FnMut(&ModuleEntry) -> bool,
    {
        let mut registered = 0;
        for entry in module.entries() {
            if !predicate(entry) {
                continue;
            }

            self.add_constructors(entry.constructors().clone())?;
            for descriptor in entry.descriptors(lifetime) {
                self.register(descriptor)?;
                registered += 1;
            }
        }

        debug!(
            backend = self.backend(),
            entries = module.len(),
            registered,
            "imported module"
        );
        Ok(registered)
    }
}

impl<T: ?Sized + Container> ServiceRegistry for T {}
