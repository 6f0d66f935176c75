use crate::{
    InjectError, InjectResult, Request, RequestInfo, Resolver, Service,
    ServiceInfo,
};

/// Describes one parameter of a constructor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Parameter {
    position: usize,
    request: ServiceInfo,
    optional: bool,
}

impl Parameter {
    /// Describes the parameter at `position` that performs the request `R`.
    #[must_use]
    pub fn of<R: Request>(position: usize) -> Self {
        Parameter {
            position,
            request: ServiceInfo::of::<R>(),
            optional: R::OPTIONAL,
        }
    }

    /// The position of this parameter in the constructor's parameter list.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The type requested by this parameter.
    #[must_use]
    pub fn request(&self) -> ServiceInfo {
        self.request
    }

    /// Whether this parameter has a default value when its service can't be
    /// resolved.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A factory for creating instances of a service. All functions of arity 12 or
/// less are automatically service factories if the arguments to that function
/// are valid service requests and the return value is a valid service type.
///
/// ```
/// use service_locator::{BasicContainer, RequestInfo, ServiceFactory, Svc};
///
/// struct Foo;
/// struct Bar(Svc<Foo>);
///
/// fn factory(foo: Svc<Foo>) -> Bar {
///     Bar(foo)
/// }
///
/// let container = BasicContainer::new();
/// let result = factory.invoke(&container, &RequestInfo::new());
/// assert!(result.is_err()); // Foo is not registered
///
/// type MakeBar = fn(Svc<Foo>) -> Bar;
/// assert_eq!(1, <MakeBar as ServiceFactory<(Svc<Foo>,)>>::parameters().len());
/// ```
///
/// ## Type parameters
/// * `D` - Dependencies of this service as a tuple.
pub trait ServiceFactory<D>: Service {
    /// The resulting service from invoking this service factory.
    type Result: Service;

    /// Invokes this service factory, creating an instance of the service.
    fn invoke(
        &self,
        resolver: &dyn Resolver,
        request_info: &RequestInfo,
    ) -> InjectResult<Self::Result>;

    /// Describes the parameters this factory requests.
    fn parameters() -> Vec<Parameter>;
}

macro_rules! impl_provider_function {
    () => {
        impl_provider_function!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_provider_function!(@impl ($first $(, $rest)*));
        impl_provider_function!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl <F, R $(, $type_name)*> ServiceFactory<($($type_name,)*)> for F
        where
            F: Service + Fn($($type_name),*) -> R,
            R: Service,
            $($type_name: Request,)*
        {
            type Result = R;

            #[allow(
                unused_variables,
                unused_mut,
                unused_assignments,
                non_snake_case
            )]
            fn invoke(
                &self,
                resolver: &dyn Resolver,
                request_info: &RequestInfo,
            ) -> InjectResult<Self::Result> {
                let mut position = 0_usize;
                let result = self($({
                    let request = $type_name::request(resolver, request_info);
                    let dependency = match request {
                        Ok(dependency) => dependency,
                        Err(InjectError::ServiceNotRegistered {
                            service_info,
                        }) if $type_name::is_request_for(service_info) => {
                            return Err(InjectError::UnresolvedDependency {
                                service_info: ServiceInfo::of::<R>(),
                                parameter: position,
                                dependency_info: service_info,
                            });
                        }
                        Err(error) => return Err(error),
                    };
                    position += 1;
                    dependency
                }),*);
                Ok(result)
            }

            #[allow(unused_mut, unused_assignments)]
            fn parameters() -> Vec<Parameter> {
                let mut position = 0_usize;
                let mut parameters = Vec::new();
                $(
                    parameters.push(Parameter::of::<$type_name>(position));
                    position += 1;
                )*
                parameters
            }
        }
    };
}

impl_provider_function!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicContainer, Lifetime, ResolverExt, ServiceRegistry, Svc};

    struct Foo;
    struct Bar(Svc<Foo>, Option<Svc<u32>>);
    struct Baz(Svc<Bar>);

    fn make_bar(foo: Svc<Foo>, count: Option<Svc<u32>>) -> Bar {
        Bar(foo, count)
    }

    #[test]
    fn parameters_are_described_in_order() {
        type MakeBar = fn(Svc<Foo>, Option<Svc<u32>>) -> Bar;
        type Requests = (Svc<Foo>, Option<Svc<u32>>);
        let parameters = <MakeBar as ServiceFactory<Requests>>::parameters();
        assert_eq!(2, parameters.len());
        assert_eq!(0, parameters[0].position());
        assert!(!parameters[0].is_optional());
        assert_eq!(ServiceInfo::of::<Svc<Foo>>(), parameters[0].request());
        assert_eq!(1, parameters[1].position());
        assert!(parameters[1].is_optional());
    }

    #[test]
    fn missing_dependency_reports_parameter() {
        let container = BasicContainer::new();
        match make_bar.invoke(&container, &RequestInfo::new()) {
            Err(InjectError::UnresolvedDependency {
                service_info,
                parameter,
                dependency_info,
            }) => {
                assert_eq!(ServiceInfo::of::<Bar>(), service_info);
                assert_eq!(0, parameter);
                assert_eq!(ServiceInfo::of::<Foo>(), dependency_info);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("Bar was created without a Foo"),
        }
    }

    #[test]
    fn optional_parameters_default_to_none() {
        let container = BasicContainer::new();
        container.register_instance(Svc::new(Foo)).unwrap();

        let bar = make_bar.invoke(&container, &RequestInfo::new()).unwrap();
        assert!(bar.1.is_none());
    }

    #[test]
    fn missing_transitive_dependency_is_not_blamed_on_parameter() {
        let container = BasicContainer::new();
        container
            .register_factory(
                |resolver| {
                    let foo = resolver.get_required::<Foo>()?;
                    Ok(Svc::new(Bar(foo, None)))
                },
                Lifetime::Transient,
            )
            .unwrap();

        let make_baz = |bar: Svc<Bar>| Baz(bar);
        match make_baz.invoke(&container, &RequestInfo::new()) {
            Err(InjectError::ServiceNotRegistered { service_info }) => {
                assert_eq!(ServiceInfo::of::<Foo>(), service_info);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("Baz was created without a Foo"),
        }
    }
}
