use crate::{Service, Svc};

/// Marker trait that indicates that a type is an interface for another type.
/// Each sized service type is an interface for itself, and each `dyn Trait`
/// is an interface for the types listed for it in an [`interface!`]
/// invocation. This is what allows an implementation type to be registered
/// under an abstract contract.
pub trait InterfaceFor<T: Service>: Service {
    #[doc(hidden)]
    fn from_svc(service: Svc<T>) -> Svc<Self>;
}

impl<T: Service> InterfaceFor<T> for T {
    fn from_svc(service: Svc<T>) -> Svc<Self> {
        service
    }
}

/// Marks a trait as being an interface for many other types. This means that
/// a registration for the given trait can be implemented by any of the types
/// indicated by this macro invocation.
///
/// The trait must be a subtrait of [`Send`] and [`Sync`] so that its service
/// pointers can be shared between threads.
///
/// ## Example
///
/// ```
/// use service_locator::interface;
///
/// struct Bar;
/// #[cfg(test)]
/// struct MockBar;
///
/// trait Foo: Send + Sync {}
/// impl Foo for Bar {}
/// #[cfg(test)]
/// impl Foo for MockBar {}
///
/// // Registrations for `dyn Foo` can be implemented by either `Bar` or, in a
/// // test run, `MockBar`. Note that attributes are allowed on each of the
/// // listed types.
/// interface!(
///     Foo = [
///         Bar,
///         #[cfg(test)]
///         MockBar,
///     ]
/// );
/// ```
#[macro_export]
macro_rules! interface {
    ($trait:tt = [$($(#[$attr:meta])* $impl:ty),* $(,)?]) => {
        $(
            $(#[$attr])*
            impl $crate::InterfaceFor<$impl> for dyn $trait {
                fn from_svc(service: $crate::Svc<$impl>) -> $crate::Svc<Self> {
                    service
                }
            }
        )*
    };
}
