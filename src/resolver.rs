use crate::{
    services::unerase, DynSvc, InjectResult, Request, RequestInfo, Scope,
    Service, ServiceInfo, Svc,
};
use tracing::warn;

/// Resolves services. Containers and scopes are both resolvers, and factories
/// receive the resolver their service is being resolved from.
///
/// This trait is object safe. Most code should use the typed methods from
/// [`ResolverExt`] instead of calling these directly.
pub trait Resolver: Send + Sync {
    /// Resolves a single instance of a service. The returned pointer holds a
    /// [`Svc<T>`] of the requested service type.
    fn resolve(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc>;

    /// Resolves an instance for every registration of a service. Returns an
    /// empty list if the service isn't registered.
    fn resolve_all(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<Vec<DynSvc>>;

    /// Whether a registration exists for the service.
    fn contains(&self, service_info: ServiceInfo) -> bool;

    /// Creates a child scope. Scoped services resolved from the scope are
    /// cached in it and released when it is disposed.
    fn create_scope(&self) -> Scope;
}

/// Typed resolution methods, available on every [`Resolver`].
pub trait ResolverExt: Resolver {
    /// Resolves a service, returning `None` if it can't be resolved. Failures
    /// are logged rather than returned.
    fn get<T: ?Sized + Service>(&self) -> Option<Svc<T>> {
        match self.get_required() {
            Ok(service) => Some(service),
            Err(error) => {
                warn!(
                    service = ServiceInfo::of::<T>().name(),
                    %error,
                    "failed to resolve service"
                );
                None
            }
        }
    }

    /// Resolves a service, failing if it can't be resolved.
    fn get_required<T: ?Sized + Service>(&self) -> InjectResult<Svc<T>> {
        let service =
            self.resolve(ServiceInfo::of::<T>(), &RequestInfo::new())?;
        unerase(&service)
    }

    /// Resolves every registration of a service. Failures are logged and an
    /// empty list is returned.
    fn get_all<T: ?Sized + Service>(&self) -> Vec<Svc<T>> {
        match self.try_get_all() {
            Ok(services) => services,
            Err(error) => {
                warn!(
                    service = ServiceInfo::of::<T>().name(),
                    %error,
                    "failed to resolve services"
                );
                Vec::new()
            }
        }
    }

    /// Resolves every registration of a service, failing if any of them can't
    /// be resolved.
    fn try_get_all<T: ?Sized + Service>(&self) -> InjectResult<Vec<Svc<T>>> {
        self.request()
    }

    /// Whether a registration exists for the service.
    fn is_registered<T: ?Sized + Service>(&self) -> bool {
        self.contains(ServiceInfo::of::<T>())
    }

    /// Performs a request, such as a tuple of services.
    fn request<R: Request>(&self) -> InjectResult<R> {
        R::request(self, &RequestInfo::new())
    }
}

impl<R: ?Sized + Resolver> ResolverExt for R {}

/// Hands a factory the resolver its service is being resolved from, while
/// keeping track of the request path so cycles through factories are still
/// detected.
pub(crate) struct PathResolver<'a> {
    inner: &'a dyn Resolver,
    request_info: &'a RequestInfo,
}

impl<'a> PathResolver<'a> {
    pub(crate) fn new(
        inner: &'a dyn Resolver,
        request_info: &'a RequestInfo,
    ) -> Self {
        PathResolver {
            inner,
            request_info,
        }
    }

    fn request_info<'b>(
        &'b self,
        request_info: &'b RequestInfo,
    ) -> &'b RequestInfo {
        if request_info.service_path().is_empty() {
            self.request_info
        } else {
            request_info
        }
    }
}

impl Resolver for PathResolver<'_> {
    fn resolve(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        self.inner
            .resolve(service_info, self.request_info(request_info))
    }

    fn resolve_all(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<Vec<DynSvc>> {
        self.inner
            .resolve_all(service_info, self.request_info(request_info))
    }

    fn contains(&self, service_info: ServiceInfo) -> bool {
        self.inner.contains(service_info)
    }

    fn create_scope(&self) -> Scope {
        self.inner.create_scope()
    }
}
