use crate::{
    services::unerase, InjectError, InjectResult, RequestInfo, Resolver,
    Service, ServiceInfo, Svc,
};

/// A request to a resolver. Every parameter of a constructor is a request.
///
/// # Grouping requests
///
/// Requests can be grouped together by using tuples to make multiple requests
/// at once. Since there is a limit of 12 supported parameters/dependencies for
/// constructors, tuples can also be used to get around that limitation.
///
/// ```
/// use service_locator::{
///     BasicContainer, Constructors, Injectable, ResolverExt,
///     ServiceRegistry, Svc,
/// };
///
/// struct Bar;
/// struct Baz;
/// struct Foo(Svc<Bar>, Svc<Baz>);
///
/// impl Foo {
///     pub fn new((bar, baz): (Svc<Bar>, Svc<Baz>)) -> Self {
///         Foo(bar, baz)
///     }
/// }
///
/// impl Injectable for Foo {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(Foo::new);
///     }
/// }
///
/// let container = BasicContainer::new();
/// container.register_instance(Svc::new(Bar)).unwrap();
/// container.register_instance(Svc::new(Baz)).unwrap();
/// container.register_singleton::<Foo, Foo>().unwrap();
///
/// let _foo = container.get_required::<Foo>().unwrap();
/// ```
pub trait Request: Sized + 'static {
    /// Whether this request has a default value when the service it asks for
    /// isn't registered.
    const OPTIONAL: bool = false;

    /// Performs the request to the resolver.
    fn request<R: ?Sized + Resolver>(
        resolver: &R,
        info: &RequestInfo,
    ) -> InjectResult<Self>;

    /// Whether this request itself fails when `service_info` isn't
    /// registered, as opposed to one of that service's dependencies.
    fn is_request_for(_service_info: ServiceInfo) -> bool {
        false
    }
}

/// Requests the information about the current request.
impl Request for RequestInfo {
    const OPTIONAL: bool = true;

    fn request<R: ?Sized + Resolver>(
        _resolver: &R,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        Ok(info.clone())
    }
}

/// Requests a service pointer to a service or interface. This request fails if
/// the service is not registered and can't be constructed automatically.
impl<S: ?Sized + Service> Request for Svc<S> {
    fn request<R: ?Sized + Resolver>(
        resolver: &R,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        let service = resolver.resolve(ServiceInfo::of::<S>(), info)?;
        unerase(&service)
    }

    fn is_request_for(service_info: ServiceInfo) -> bool {
        service_info == ServiceInfo::of::<S>()
    }
}

/// Requests all the registrations of a service or interface. A back-end that
/// keeps a single registration per service returns at most one instance. If
/// nothing is registered for the service, then this returns an empty
/// [`Vec<T>`].
impl<S: ?Sized + Service> Request for Vec<Svc<S>> {
    const OPTIONAL: bool = true;

    fn request<R: ?Sized + Resolver>(
        resolver: &R,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        resolver
            .resolve_all(ServiceInfo::of::<S>(), info)?
            .iter()
            .map(unerase)
            .collect()
    }
}

/// Tries to request a service pointer for a service or interface. If the
/// service isn't registered, then returns `None`. Any other failure, such as
/// a registered service failing to construct, is still an error.
impl<S: ?Sized + Service> Request for Option<Svc<S>> {
    const OPTIONAL: bool = true;

    fn request<R: ?Sized + Resolver>(
        resolver: &R,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        match Svc::<S>::request(resolver, info) {
            Ok(service) => Ok(Some(service)),
            Err(InjectError::ServiceNotRegistered { service_info })
                if service_info == ServiceInfo::of::<S>() =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

macro_rules! impl_tuple_request {
    () => {
        impl_tuple_request!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_tuple_request!(@impl ($first $(, $rest)*));
        impl_tuple_request!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        /// Performs multiple requests at once. This is useful for grouping
        /// together related requests.
        impl <$($type_name),*> Request for ($($type_name,)*)
        where
            $($type_name: Request,)*
        {
            #[allow(unused_variables)]
            fn request<R: ?Sized + Resolver>(
                resolver: &R,
                info: &RequestInfo,
            ) -> InjectResult<Self> {
                let result = ($($type_name::request(resolver, info)?,)*);
                Ok(result)
            }

            #[allow(unused_variables)]
            fn is_request_for(service_info: ServiceInfo) -> bool {
                false $(|| $type_name::is_request_for(service_info))*
            }
        }
    };
}

impl_tuple_request!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
