mod basic;
mod cache;
#[cfg(feature = "concurrent")]
mod concurrent;
mod engine;
mod scope;

pub use basic::*;
#[cfg(feature = "concurrent")]
pub use concurrent::*;
pub use scope::*;

use crate::{
    ConstructorSet, InjectResult, Resolver, ServiceDescriptor, ServiceInfo,
};
use std::sync::Arc;

/// A service container. Containers own the registrations and the singleton
/// instances of an application, and every container back-end implements this
/// trait so the host can switch between them.
///
/// Registration is usually done through the typed methods of
/// [`ServiceRegistry`](crate::ServiceRegistry), and resolution through
/// [`ResolverExt`](crate::ResolverExt).
pub trait Container: Resolver {
    /// Name of the back-end implementing this container.
    fn backend(&self) -> &'static str;

    /// Adds a registration. Re-registering a service replaces the
    /// registration used to resolve it.
    fn register(&self, descriptor: ServiceDescriptor) -> InjectResult<()>;

    /// Gets the registration used to resolve a service.
    fn try_get(&self, service_info: ServiceInfo) -> Option<ServiceDescriptor>;

    /// Makes the constructors of a concrete type known to this container.
    /// Unregistered types with known constructors are auto-wired as
    /// transients. Fails once the container is sealed.
    fn add_constructors(
        &self,
        constructors: Arc<ConstructorSet>,
    ) -> InjectResult<()>;

    /// The number of registrations held by this container.
    fn registration_count(&self) -> usize;

    /// Stops accepting registrations. Back-ends that don't compile a
    /// resolution plan ignore this.
    fn seal(&self);

    /// Whether this container rejects new registrations.
    fn is_sealed(&self) -> bool;

    /// Releases every resource-holding singleton this container created.
    /// Failures are logged, not returned.
    fn dispose(&self);
}

/// Implements [`Resolver`] and [`Container`] for a back-end by delegating to
/// its engine.
macro_rules! impl_container {
    ($container:ty) => {
        impl $crate::Resolver for $container {
            fn resolve(
                &self,
                service_info: $crate::ServiceInfo,
                request_info: &$crate::RequestInfo,
            ) -> $crate::InjectResult<$crate::DynSvc> {
                self.engine.resolve_in(service_info, request_info, None)
            }

            fn resolve_all(
                &self,
                service_info: $crate::ServiceInfo,
                request_info: &$crate::RequestInfo,
            ) -> $crate::InjectResult<Vec<$crate::DynSvc>> {
                self.engine.resolve_all_in(service_info, request_info, None)
            }

            fn contains(&self, service_info: $crate::ServiceInfo) -> bool {
                self.engine.contains(service_info)
            }

            fn create_scope(&self) -> $crate::Scope {
                self.engine.create_scope(0)
            }
        }

        impl $crate::Container for $container {
            fn backend(&self) -> &'static str {
                self.engine.backend()
            }

            fn register(
                &self,
                descriptor: $crate::ServiceDescriptor,
            ) -> $crate::InjectResult<()> {
                self.engine.register(descriptor)
            }

            fn try_get(
                &self,
                service_info: $crate::ServiceInfo,
            ) -> Option<$crate::ServiceDescriptor> {
                self.engine.try_get(service_info)
            }

            fn add_constructors(
                &self,
                constructors: std::sync::Arc<$crate::ConstructorSet>,
            ) -> $crate::InjectResult<()> {
                self.engine.add_constructors(constructors)
            }

            fn registration_count(&self) -> usize {
                self.engine.registration_count()
            }

            fn seal(&self) {
                self.engine.seal();
            }

            fn is_sealed(&self) -> bool {
                self.engine.is_sealed()
            }

            fn dispose(&self) {
                self.engine.dispose();
            }
        }
    };
}

pub(crate) use impl_container;
