use crate::{
    services::service::{erase, unerase},
    Activation, ConstructorSelection, Dispose, DynSvc, InjectError,
    InjectResult, Parameter, RequestInfo, Resolver, Service, ServiceFactory,
    ServiceInfo, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    marker::PhantomData,
};
use tracing::error;

/// A concrete type that can be constructed by a container. Implementing this
/// trait declares every constructor of the type, which lets a container
/// auto-wire it by resolving the constructor's parameters.
///
/// ## Example
///
/// ```
/// use service_locator::{
///     BasicContainer, Constructors, Injectable, ResolverExt,
///     ServiceRegistry, Svc,
/// };
///
/// #[derive(Default)]
/// struct Settings;
///
/// struct Editor {
///     settings: Option<Svc<Settings>>,
/// }
///
/// impl Editor {
///     fn new(settings: Svc<Settings>) -> Self {
///         Editor {
///             settings: Some(settings),
///         }
///     }
///
///     fn standalone() -> Self {
///         Editor { settings: None }
///     }
/// }
///
/// impl Injectable for Editor {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(Editor::new).add(Editor::standalone);
///     }
/// }
///
/// let container = BasicContainer::new();
/// container.register_constructors::<Editor>().unwrap();
///
/// // Settings isn't registered, so the narrower constructor is used
/// let editor = container.get_required::<Editor>().unwrap();
/// assert!(editor.settings.is_none());
/// ```
pub trait Injectable: Service + Sized {
    /// Adds each constructor of this type.
    fn constructors(constructors: &mut Constructors<Self>);
}

type ConstructFn =
    dyn Fn(&dyn Resolver, &RequestInfo) -> InjectResult<DynSvc> + Send + Sync;

type DisposerFn = fn(&DynSvc) -> Option<Svc<dyn Dispose>>;

/// A single constructor of a concrete type.
struct Constructor {
    parameters: Vec<Parameter>,
    invoke: Box<ConstructFn>,
}

/// Collects the constructors of the type `T`.
pub struct Constructors<T: Service> {
    constructors: Vec<Constructor>,
    disposer: Option<DisposerFn>,
    marker: PhantomData<fn() -> T>,
}

impl<T: Service> Constructors<T> {
    fn new() -> Self {
        Constructors {
            constructors: Vec::new(),
            disposer: None,
            marker: PhantomData,
        }
    }

    /// Adds a constructor. Any function of up to 12 requests returning `T`
    /// is a constructor, and constructors that may fail can be added through
    /// [`IntoFallible::fallible()`](crate::IntoFallible::fallible).
    pub fn add<D, F>(&mut self, constructor: F) -> &mut Self
    where
        F: ServiceFactory<D, Result = T>,
    {
        self.constructors.push(Constructor {
            parameters: F::parameters(),
            invoke: Box::new(move |resolver, request_info| {
                let service = constructor.invoke(resolver, request_info)?;
                Ok(erase(Svc::new(service)))
            }),
        });
        self
    }
}

impl<T: Dispose> Constructors<T> {
    /// Marks instances of `T` as holding resources. Cached instances are
    /// released when their owning container or scope is disposed.
    pub fn disposable(&mut self) -> &mut Self {
        self.disposer = Some(dispose_handle::<T>);
        self
    }
}

fn dispose_handle<T: Dispose>(service: &DynSvc) -> Option<Svc<dyn Dispose>> {
    let service: Svc<T> = unerase(service).ok()?;
    Some(service as Svc<dyn Dispose>)
}

/// Every constructor of a concrete type, ordered from the most parameters to
/// the fewest. Constructors with the same number of parameters keep the order
/// they were added in.
pub struct ConstructorSet {
    service_info: ServiceInfo,
    constructors: Vec<Constructor>,
    disposer: Option<DisposerFn>,
}

impl ConstructorSet {
    /// Collects the constructors of `T`.
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        let mut constructors = Constructors::<T>::new();
        T::constructors(&mut constructors);

        let Constructors {
            mut constructors,
            disposer,
            ..
        } = constructors;
        constructors
            .sort_by(|a, b| b.parameters.len().cmp(&a.parameters.len()));

        ConstructorSet {
            service_info: ServiceInfo::of::<T>(),
            constructors,
            disposer,
        }
    }

    /// The type these constructors create.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// The number of constructors in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether the type has no constructors at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// The parameters of each constructor, in selection order.
    pub fn signatures(&self) -> impl Iterator<Item = &[Parameter]> {
        self.constructors.iter().map(|c| c.parameters.as_slice())
    }

    /// Whether instances created by these constructors hold resources.
    #[must_use]
    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    /// Constructs an instance using the widest constructor. With
    /// [`ConstructorSelection::WidestResolvable`], narrower constructors are
    /// tried in turn while the previous one had an unresolved dependency. If
    /// none succeeds, the widest constructor's error is returned.
    pub(crate) fn construct(
        &self,
        resolver: &dyn Resolver,
        request_info: &RequestInfo,
        selection: ConstructorSelection,
    ) -> InjectResult<Activation> {
        let mut constructors = self.constructors.iter();
        let widest =
            constructors
                .next()
                .ok_or(InjectError::NoPublicConstructor {
                    service_info: self.service_info,
                })?;

        let result = match (widest.invoke)(resolver, request_info) {
            Err(error @ InjectError::UnresolvedDependency { .. })
                if selection == ConstructorSelection::WidestResolvable =>
            {
                constructors
                    .find_map(|constructor| {
                        match (constructor.invoke)(resolver, request_info) {
                            Err(InjectError::UnresolvedDependency { .. }) => {
                                None
                            }
                            result => Some(result),
                        }
                    })
                    .unwrap_or(Err(error))
            }
            result => result,
        };

        match result {
            Ok(instance) => Ok(Activation {
                disposer: self
                    .disposer
                    .and_then(|disposer| disposer(&instance)),
                instance,
            }),
            Err(
                error @ InjectError::ConstructionFailed {
                    service_info, ..
                },
            ) if service_info == self.service_info => {
                error!(
                    service = self.service_info.name(),
                    %error,
                    source = %error_source(&error),
                    "constructor failed"
                );
                Err(error)
            }
            Err(error) => Err(error),
        }
    }
}

fn error_source(error: &InjectError) -> String {
    std::error::Error::source(error)
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl Debug for ConstructorSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorSet")
            .field("service", &self.service_info.name())
            .field("constructors", &self.constructors.len())
            .field("disposable", &self.disposer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicContainer, IntoFallible, ServiceRegistry};
    use std::fmt::{Display, Formatter};

    struct Engine;
    struct Wheels;

    struct Car {
        engine: Option<Svc<Engine>>,
        wheels: Option<Svc<Wheels>>,
    }

    impl Car {
        fn full(engine: Svc<Engine>, wheels: Svc<Wheels>) -> Self {
            Car {
                engine: Some(engine),
                wheels: Some(wheels),
            }
        }

        fn engine_only(engine: Svc<Engine>) -> Self {
            Car {
                engine: Some(engine),
                wheels: None,
            }
        }

        fn bare() -> Self {
            Car {
                engine: None,
                wheels: None,
            }
        }
    }

    impl Injectable for Car {
        fn constructors(constructors: &mut Constructors<Self>) {
            constructors
                .add(Car::bare)
                .add(Car::full)
                .add(Car::engine_only);
        }
    }

    fn construct(
        container: &BasicContainer,
        selection: ConstructorSelection,
    ) -> InjectResult<Svc<Car>> {
        let activation = ConstructorSet::of::<Car>().construct(
            container,
            &RequestInfo::new(),
            selection,
        )?;
        unerase(&activation.instance)
    }

    #[test]
    fn constructors_are_ordered_widest_first() {
        let constructors = ConstructorSet::of::<Car>();
        let arities: Vec<_> =
            constructors.signatures().map(<[Parameter]>::len).collect();
        assert_eq!(vec![2, 1, 0], arities);
        assert!(!constructors.is_disposable());
    }

    #[test]
    fn widest_constructor_is_preferred() {
        let container = BasicContainer::new();
        container.register_instance(Svc::new(Engine)).unwrap();
        container.register_instance(Svc::new(Wheels)).unwrap();

        let car =
            construct(&container, ConstructorSelection::WidestResolvable)
                .unwrap();
        assert!(car.engine.is_some());
        assert!(car.wheels.is_some());
    }

    #[test]
    fn falls_back_to_next_widest() {
        let container = BasicContainer::new();
        container.register_instance(Svc::new(Engine)).unwrap();

        let car =
            construct(&container, ConstructorSelection::WidestResolvable)
                .unwrap();
        assert!(car.engine.is_some());
        assert!(car.wheels.is_none());
    }

    #[test]
    fn greedy_selection_does_not_fall_back() {
        let container = BasicContainer::new();
        container.register_instance(Svc::new(Engine)).unwrap();

        match construct(&container, ConstructorSelection::Widest) {
            Err(InjectError::UnresolvedDependency {
                parameter,
                dependency_info,
                ..
            }) => {
                assert_eq!(1, parameter);
                assert_eq!(ServiceInfo::of::<Wheels>(), dependency_info);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("the widest constructor should have failed"),
        }
    }

    struct Empty;

    impl Injectable for Empty {
        fn constructors(_constructors: &mut Constructors<Self>) {}
    }

    #[test]
    fn no_constructors_is_an_error() {
        let container = BasicContainer::new();
        let result = ConstructorSet::of::<Empty>().construct(
            &container,
            &RequestInfo::new(),
            ConstructorSelection::default(),
        );
        match result {
            Err(InjectError::NoPublicConstructor { service_info }) => {
                assert_eq!(ServiceInfo::of::<Empty>(), service_info);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("a type without constructors was constructed"),
        }
    }

    #[derive(Debug)]
    struct Jammed;

    impl std::error::Error for Jammed {}
    impl Display for Jammed {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "the door is jammed")
        }
    }

    struct Door;

    impl Door {
        fn open() -> Result<Self, Jammed> {
            Err(Jammed)
        }
    }

    impl Injectable for Door {
        fn constructors(constructors: &mut Constructors<Self>) {
            constructors.add(Door::open.fallible());
        }
    }

    #[test]
    fn construction_failure_keeps_its_source() {
        let container = BasicContainer::new();
        let result = ConstructorSet::of::<Door>().construct(
            &container,
            &RequestInfo::new(),
            ConstructorSelection::default(),
        );
        match result {
            Err(error @ InjectError::ConstructionFailed { .. }) => {
                assert_eq!("the door is jammed", error_source(&error));
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("a jammed door was opened"),
        }
    }
}
