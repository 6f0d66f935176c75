use crate::{
    container::{
        engine::{DescriptorTable, Engine},
        impl_container,
    },
    ContainerOptions, InjectResult, ServiceDescriptor, ServiceInfo,
};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct BasicTable {
    descriptors: RwLock<HashMap<ServiceInfo, ServiceDescriptor>>,
}

impl DescriptorTable for BasicTable {
    fn register(&self, descriptor: ServiceDescriptor) -> InjectResult<()> {
        self.descriptors
            .write()
            .insert(descriptor.service_info(), descriptor);
        Ok(())
    }

    fn try_get(&self, service_info: ServiceInfo) -> Option<ServiceDescriptor> {
        self.descriptors.read().get(&service_info).cloned()
    }

    fn get_all(&self, service_info: ServiceInfo) -> Vec<ServiceDescriptor> {
        self.try_get(service_info).into_iter().collect()
    }

    fn contains(&self, service_info: ServiceInfo) -> bool {
        self.descriptors.read().contains_key(&service_info)
    }

    fn len(&self) -> usize {
        self.descriptors.read().len()
    }
}

/// The minimal container back-end. It keeps a single registration per
/// service, never seals, and has no optional dependencies, so creating one
/// can't fail.
///
/// Clones of a container share its registrations and singletons. Singletons
/// are released when the last clone (and the last scope created from it) is
/// dropped, or earlier through [`Container::dispose`](crate::Container).
///
/// ## Example
///
/// ```
/// use service_locator::{
///     interface, BasicContainer, Constructors, Injectable, ResolverExt,
///     ServiceRegistry, Svc,
/// };
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// #[derive(Default)]
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) {
///         println!("{message}");
///     }
/// }
///
/// impl Injectable for ConsoleLogger {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(ConsoleLogger::default);
///     }
/// }
///
/// interface!(Logger = [ConsoleLogger]);
///
/// let container = BasicContainer::new();
/// container
///     .register_singleton::<dyn Logger, ConsoleLogger>()
///     .unwrap();
///
/// let first: Svc<dyn Logger> = container.get_required().unwrap();
/// let second: Svc<dyn Logger> = container.get_required().unwrap();
/// assert!(Svc::ptr_eq(&first, &second));
/// assert_eq!(1, container.get_all::<dyn Logger>().len());
/// ```
#[derive(Clone)]
pub struct BasicContainer {
    engine: Engine,
}

impl BasicContainer {
    /// Name of this back-end.
    pub const BACKEND: &'static str = "basic";

    /// Creates an empty container with the default options.
    #[must_use]
    pub fn new() -> Self {
        BasicContainer::with_options(&ContainerOptions::default())
    }

    /// Creates an empty container.
    #[must_use]
    pub fn with_options(options: &ContainerOptions) -> Self {
        BasicContainer {
            engine: Engine::new(
                Self::BACKEND,
                Box::new(BasicTable::default()),
                options,
            ),
        }
    }
}

impl Default for BasicContainer {
    fn default() -> Self {
        BasicContainer::new()
    }
}

impl_container!(BasicContainer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Container, InjectError, Lifetime, ResolverExt, ServiceRegistry, Svc,
    };

    #[test]
    fn replacing_a_registration_keeps_one() {
        let container = BasicContainer::new();
        container.register_instance(Svc::new(1_i32)).unwrap();
        container.register_instance(Svc::new(2_i32)).unwrap();

        let values: Vec<i32> = container
            .get_all::<i32>()
            .iter()
            .map(|value| **value)
            .collect();
        assert_eq!(1, container.registration_count());
        assert_eq!(vec![2], values);
    }

    #[test]
    fn never_seals() {
        let container = BasicContainer::new();
        container.register_instance(Svc::new(1_i32)).unwrap();
        container.get_required::<i32>().unwrap();
        container.seal();

        assert!(!container.is_sealed());
        container
            .register_factory(|_| Ok(Svc::new(2_u8)), Lifetime::Transient)
            .unwrap();
        assert_eq!(2, *container.get_required::<u8>().unwrap());
    }

    #[test]
    fn clones_share_registrations() {
        let container = BasicContainer::new();
        let clone = container.clone();
        container.register_instance(Svc::new(1_i32)).unwrap();

        assert!(clone.is_registered::<i32>());
        match clone.get_required::<u8>() {
            Err(InjectError::ServiceNotRegistered { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("an unregistered service was resolved"),
        }
    }
}
