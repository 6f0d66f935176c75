use crate::{
    services::service::{erase, unerase},
    ConstructorSet, Dispose, DynSvc, InjectResult, Injectable, InterfaceFor,
    Resolver, Service, ServiceInfo, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Controls how long a resolved instance is reused.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Lifetime {
    /// A new instance is created for every resolution.
    Transient,
    /// One instance is created per container and shared by all of its scopes.
    Singleton,
    /// One instance is created per scope. Resolving directly from a container
    /// (outside any scope) behaves like [`Lifetime::Transient`].
    Scoped,
}

/// Process-unique identifier of a single registration. Caches are keyed by
/// this rather than by service so that replacing a registration never serves
/// an instance built from the replaced one.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegistrationId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A freshly activated service instance, along with its release handle if the
/// instance holds resources.
#[derive(Clone)]
pub struct Activation {
    pub(crate) instance: DynSvc,
    pub(crate) disposer: Option<Svc<dyn Dispose>>,
}

impl Activation {
    /// Wraps an instance that holds no resources.
    #[must_use]
    pub fn new<S: ?Sized + Service>(instance: Svc<S>) -> Self {
        Activation {
            instance: erase(instance),
            disposer: None,
        }
    }

    /// Wraps an instance that must be released when its owning cache is
    /// disposed.
    #[must_use]
    pub fn disposable<S: Dispose>(instance: Svc<S>) -> Self {
        Activation {
            disposer: Some(instance.clone() as Svc<dyn Dispose>),
            instance: erase(instance),
        }
    }
}

pub(crate) type FactoryFn =
    dyn Fn(&dyn Resolver) -> InjectResult<Activation> + Send + Sync;

pub(crate) type Upcast = fn(DynSvc) -> InjectResult<DynSvc>;

/// The strategy a descriptor uses to produce its service.
#[derive(Clone)]
pub(crate) enum Provision {
    Instance(DynSvc),
    Factory(Arc<FactoryFn>),
    Implementation {
        constructors: Arc<ConstructorSet>,
        upcast: Upcast,
    },
}

/// Which kind of provision strategy a descriptor uses.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ProvisionKind {
    /// A pre-built instance.
    Instance,
    /// A factory function invoked with the current resolver.
    Factory,
    /// A concrete type constructed through its declared constructors.
    Implementation,
}

/// The recipe for producing a service: what to build it from and how long to
/// keep it.
#[derive(Clone)]
pub struct ServiceDescriptor {
    id: RegistrationId,
    service_info: ServiceInfo,
    lifetime: Lifetime,
    pub(crate) provision: Provision,
}

impl ServiceDescriptor {
    /// Describes a pre-built instance. Instances are always singletons.
    #[must_use]
    pub fn instance<C: ?Sized + Service>(instance: Svc<C>) -> Self {
        ServiceDescriptor {
            id: RegistrationId::next(),
            service_info: ServiceInfo::of::<C>(),
            lifetime: Lifetime::Singleton,
            provision: Provision::Instance(erase(instance)),
        }
    }

    /// Describes a service created by a factory. The factory receives the
    /// resolver the service is being resolved from, so it can resolve its own
    /// dependencies.
    #[must_use]
    pub fn factory<C, F>(factory: F, lifetime: Lifetime) -> Self
    where
        C: ?Sized + Service,
        F: Fn(&dyn Resolver) -> InjectResult<Svc<C>> + Send + Sync + 'static,
    {
        Self::activation_factory::<C, _>(
            move |resolver| factory(resolver).map(Activation::new),
            lifetime,
        )
    }

    /// Describes a service created by a factory that reports whether the
    /// created instance holds resources.
    #[must_use]
    pub fn activation_factory<C, F>(factory: F, lifetime: Lifetime) -> Self
    where
        C: ?Sized + Service,
        F: Fn(&dyn Resolver) -> InjectResult<Activation>
            + Send
            + Sync
            + 'static,
    {
        ServiceDescriptor {
            id: RegistrationId::next(),
            service_info: ServiceInfo::of::<C>(),
            lifetime,
            provision: Provision::Factory(Arc::new(factory)),
        }
    }

    /// Describes a service implemented by the concrete type `I`, which is
    /// constructed through its declared constructors.
    #[must_use]
    pub fn implementation<C, I>(lifetime: Lifetime) -> Self
    where
        C: ?Sized + InterfaceFor<I>,
        I: Injectable,
    {
        Self::from_constructors::<C, I>(
            Arc::new(ConstructorSet::of::<I>()),
            lifetime,
        )
    }

    pub(crate) fn from_constructors<C, I>(
        constructors: Arc<ConstructorSet>,
        lifetime: Lifetime,
    ) -> Self
    where
        C: ?Sized + InterfaceFor<I>,
        I: Service,
    {
        ServiceDescriptor {
            id: RegistrationId::next(),
            service_info: ServiceInfo::of::<C>(),
            lifetime,
            provision: Provision::Implementation {
                constructors,
                upcast: upcast::<C, I>,
            },
        }
    }

    /// Creates a copy of this descriptor with the same recipe registered
    /// under a different lifetime. The copy is a new registration.
    #[must_use]
    pub fn with_lifetime(&self, lifetime: Lifetime) -> Self {
        let lifetime = match self.provision {
            Provision::Instance(_) => Lifetime::Singleton,
            _ => lifetime,
        };

        ServiceDescriptor {
            id: RegistrationId::next(),
            service_info: self.service_info,
            lifetime,
            provision: self.provision.clone(),
        }
    }

    /// The unique id of this registration.
    #[must_use]
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// The service this descriptor is registered for.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// The lifetime of instances produced by this descriptor.
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The provision strategy of this descriptor.
    #[must_use]
    pub fn kind(&self) -> ProvisionKind {
        match self.provision {
            Provision::Instance(_) => ProvisionKind::Instance,
            Provision::Factory(_) => ProvisionKind::Factory,
            Provision::Implementation { .. } => ProvisionKind::Implementation,
        }
    }

    /// The concrete implementation type, for implementation-type descriptors.
    #[must_use]
    pub fn implementation_info(&self) -> Option<ServiceInfo> {
        match &self.provision {
            Provision::Implementation { constructors, .. } => {
                Some(constructors.service_info())
            }
            _ => None,
        }
    }
}

impl Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("id", &self.id)
            .field("service", &self.service_info.name())
            .field("lifetime", &self.lifetime)
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

fn upcast<C, I>(service: DynSvc) -> InjectResult<DynSvc>
where
    C: ?Sized + InterfaceFor<I>,
    I: Service,
{
    let service: Svc<I> = unerase(&service)?;
    Ok(erase(C::from_svc(service)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_are_always_singletons() {
        let descriptor = ServiceDescriptor::instance(Svc::new(5_u8));
        assert_eq!(Lifetime::Singleton, descriptor.lifetime());
        assert_eq!(ProvisionKind::Instance, descriptor.kind());

        let copy = descriptor.with_lifetime(Lifetime::Transient);
        assert_eq!(Lifetime::Singleton, copy.lifetime());
        assert_ne!(descriptor.id(), copy.id());
    }

    #[test]
    fn registration_ids_are_unique() {
        let make = || {
            ServiceDescriptor::factory(
                |_| Ok(Svc::new(1_u8)),
                Lifetime::Transient,
            )
        };
        let first = make();
        let second = make();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.service_info(), second.service_info());
    }
}
