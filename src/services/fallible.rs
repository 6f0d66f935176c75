use crate::{
    InjectError, InjectResult, Parameter, RequestInfo, Resolver, Service,
    ServiceFactory, ServiceInfo,
};
use std::{error::Error, marker::PhantomData};

/// A service factory that may fail during service creation with a custom error
/// type. During activation failure, an instance of
/// [`InjectError::ConstructionFailed`] is returned as an error.
pub struct FallibleServiceFactory<D, R, E, F>
where
    D: Service,
    R: Service,
    E: Service + Error,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    inner: F,
    marker: PhantomData<fn(D) -> Result<R, E>>,
}

impl<D, R, E, F> ServiceFactory<D> for FallibleServiceFactory<D, R, E, F>
where
    D: Service,
    R: Service,
    E: Service + Error,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    type Result = R;

    fn invoke(
        &self,
        resolver: &dyn Resolver,
        request_info: &RequestInfo,
    ) -> InjectResult<Self::Result> {
        match self.inner.invoke(resolver, request_info)? {
            Ok(result) => Ok(result),
            Err(error) => Err(InjectError::ConstructionFailed {
                service_info: ServiceInfo::of::<R>(),
                source: Box::new(error),
            }),
        }
    }

    fn parameters() -> Vec<Parameter> {
        F::parameters()
    }
}

/// Defines a conversion into a fallible service factory. This trait is
/// automatically implemented for all service factories that return a
/// [`Result<T, E>`] with an error type that implements [`Error`] and
/// [`Service`].
pub trait IntoFallible<D, R, E, F>
where
    D: Service,
    R: Service,
    E: Service + Error,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    /// Marks a service factory as being able to fail. On success, the service
    /// is injected unwrapped from the result. On failure, resolution fails
    /// with [`InjectError::ConstructionFailed`] wrapping the error.
    ///
    /// ## Example
    ///
    /// ```
    /// use service_locator::{
    ///     BasicContainer, Constructors, InjectError, Injectable, IntoFallible,
    ///     ResolverExt, ServiceRegistry,
    /// };
    /// use std::fmt::{Display, Formatter};
    ///
    /// #[derive(Debug)]
    /// struct PlotterOffline;
    ///
    /// impl std::error::Error for PlotterOffline {}
    /// impl Display for PlotterOffline {
    ///     fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    ///         write!(f, "the plotter is offline")
    ///     }
    /// }
    ///
    /// struct Plotter;
    ///
    /// impl Plotter {
    ///     fn connect() -> Result<Self, PlotterOffline> {
    ///         Err(PlotterOffline)
    ///     }
    /// }
    ///
    /// impl Injectable for Plotter {
    ///     fn constructors(constructors: &mut Constructors<Self>) {
    ///         constructors.add(Plotter::connect.fallible());
    ///     }
    /// }
    ///
    /// let container = BasicContainer::new();
    /// container.register_transient::<Plotter, Plotter>().unwrap();
    ///
    /// match container.get_required::<Plotter>() {
    ///     Err(InjectError::ConstructionFailed { .. }) => {}
    ///     Err(error) => Err(error).unwrap(),
    ///     Ok(_) => unreachable!("construction should have failed"),
    /// }
    /// ```
    #[must_use]
    fn fallible(self) -> FallibleServiceFactory<D, R, E, F>;
}

impl<D, R, E, F> IntoFallible<D, R, E, F> for F
where
    D: Service,
    R: Service,
    E: Service + Error,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    fn fallible(self) -> FallibleServiceFactory<D, R, E, F> {
        FallibleServiceFactory {
            inner: self,
            marker: PhantomData,
        }
    }
}
