use derive_more::Display;
use std::{
    any::{Any, TypeId},
    error::Error,
    sync::Arc,
};

/// A reference-counted pointer holding a service.
pub type Svc<T> = Arc<T>;

/// A type-erased service pointer. The value inside is always a [`Svc<T>`] for
/// the service type `T` it was resolved as, which allows unsized interface
/// types (`dyn Trait`) to be stored behind the same pointer type.
pub type DynSvc = Arc<dyn Any + Send + Sync>;

/// A result from attempting to inject dependencies into a service and
/// construct an instance of it.
pub type InjectResult<T> = Result<T, InjectError>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: Any + Send + Sync {}
impl<T: ?Sized + Any + Send + Sync> Service for T {}

/// Type information about a service. This is the identity used as the key
/// for registrations and cached instances.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Erases a service pointer.
pub(crate) fn erase<S: ?Sized + Service>(service: Svc<S>) -> DynSvc {
    Arc::new(service)
}

/// Recovers a typed service pointer from an erased one.
pub(crate) fn unerase<S: ?Sized + Service>(
    service: &DynSvc,
) -> InjectResult<Svc<S>> {
    service.downcast_ref::<Svc<S>>().cloned().ok_or_else(|| {
        InjectError::InvalidProvider {
            service_info: ServiceInfo::of::<S>(),
        }
    })
}

/// An error that has occurred during registration or creation of a service.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InjectError {
    /// No registration exists for the requested service, and it can't be
    /// constructed automatically.
    #[display(fmt = "{} is not registered", "service_info.name()")]
    ServiceNotRegistered {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// A constructor parameter of the service could not be resolved and has
    /// no default value.
    #[display(
        fmt = "parameter #{} of {} requires {}, which could not be resolved",
        parameter,
        "service_info.name()",
        "dependency_info.name()"
    )]
    UnresolvedDependency {
        /// The service being constructed.
        service_info: ServiceInfo,

        /// Position of the parameter in the constructor.
        parameter: usize,

        /// The dependency that could not be resolved.
        dependency_info: ServiceInfo,
    },

    /// The service is a concrete type with no declared constructors.
    #[display(fmt = "{} has no constructors", "service_info.name()")]
    NoPublicConstructor {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// A constructor of the service returned an error.
    #[display(
        fmt = "an error occurred during construction of {}",
        "service_info.name()"
    )]
    ConstructionFailed {
        /// The service that was being constructed.
        service_info: ServiceInfo,

        /// The error returned by the constructor.
        source: Box<dyn Error + Send + Sync + 'static>,
    },

    /// The scope the service was requested from has already been disposed.
    #[display(
        fmt = "{} was requested from a disposed scope",
        "service_info.name()"
    )]
    ScopeDisposed {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// A container back-end could not be constructed.
    #[display(fmt = "the {} back-end is unavailable: {}", backend, reason)]
    BackendUnavailable {
        /// Name of the back-end.
        backend: &'static str,

        /// Why the back-end could not be constructed.
        reason: String,
    },

    /// A cycle was detected during activation of a service.
    #[display(
        fmt = "a cycle was detected during activation of {} [{}]",
        "service_info.name()",
        "fmt_cycle(cycle)"
    )]
    CircularDependency {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The chain of services that were requested during resolution of
        /// this service, ending with the repeated service.
        cycle: Vec<ServiceInfo>,
    },

    /// The container has been sealed and no longer accepts registrations.
    #[display(
        fmt = "cannot register {}: the container is sealed",
        "service_info.name()"
    )]
    ContainerSealed {
        /// The service that was being registered.
        service_info: ServiceInfo,
    },

    /// A registration produced a value of the wrong type.
    #[display(
        fmt = "the registration for {} returned the wrong type",
        "service_info.name()"
    )]
    InvalidProvider {
        /// The service that was requested.
        service_info: ServiceInfo,
    },
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ConstructionFailed { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

fn fmt_cycle(cycle: &[ServiceInfo]) -> String {
    let mut joined = String::new();
    for item in cycle {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(item.name());
    }
    joined
}
