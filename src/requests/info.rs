use crate::ServiceInfo;

/// Information about an active request.
#[derive(Clone, Debug, Default)]
pub struct RequestInfo {
    service_path: Vec<ServiceInfo>,
}

impl RequestInfo {
    /// Creates a new, empty instance of [`RequestInfo`].
    #[must_use]
    pub fn new() -> Self {
        RequestInfo {
            service_path: Vec::new(),
        }
    }

    /// Creates a new child instance of [`RequestInfo`] with the given service
    /// appended to the end of the request path.
    #[must_use]
    pub fn with_request(&self, service: ServiceInfo) -> Self {
        let mut child = self.clone();
        child.service_path.push(service);
        child
    }

    /// Gets the current request path, from the service that was originally
    /// requested to the one currently being activated. This can be used to
    /// configure a service based on what it's being injected into.
    ///
    /// ## Example
    ///
    /// ```
    /// use service_locator::{
    ///     BasicContainer, Constructors, Injectable, RequestInfo, ResolverExt,
    ///     ServiceInfo, ServiceRegistry, Svc,
    /// };
    ///
    /// struct Foo(pub Svc<Baz>);
    /// struct Baz(pub i32);
    ///
    /// impl Baz {
    ///     pub fn new(request_info: RequestInfo) -> Self {
    ///         let service_path = request_info.service_path();
    ///         let value = match service_path.first() {
    ///             Some(root) if root == &ServiceInfo::of::<Foo>() => 1,
    ///             _ => 0,
    ///         };
    ///
    ///         Baz(value)
    ///     }
    /// }
    ///
    /// impl Injectable for Foo {
    ///     fn constructors(constructors: &mut Constructors<Self>) {
    ///         constructors.add(Foo);
    ///     }
    /// }
    ///
    /// impl Injectable for Baz {
    ///     fn constructors(constructors: &mut Constructors<Self>) {
    ///         constructors.add(Baz::new);
    ///     }
    /// }
    ///
    /// let container = BasicContainer::new();
    /// container.register_transient::<Foo, Foo>().unwrap();
    /// container.register_transient::<Baz, Baz>().unwrap();
    ///
    /// let foo = container.get_required::<Foo>().unwrap();
    /// let baz = container.get_required::<Baz>().unwrap();
    #[rustfmt::skip]
    /// assert_eq!(1, foo.0.0);
    /// assert_eq!(0, baz.0);
    /// ```
    #[must_use]
    pub fn service_path(&self) -> &[ServiceInfo] {
        &self.service_path
    }

    /// Whether the given service is already being activated by this request.
    #[must_use]
    pub fn contains(&self, service: ServiceInfo) -> bool {
        self.service_path.contains(&service)
    }

    /// The cycle that requesting `service` from this request would create,
    /// starting from the first activation of `service`.
    pub(crate) fn cycle_to(
        &self,
        service: ServiceInfo,
    ) -> Option<Vec<ServiceInfo>> {
        let start = self.service_path.iter().position(|s| *s == service)?;
        let mut cycle = self.service_path[start..].to_vec();
        cycle.push(service);
        Some(cycle)
    }
}
