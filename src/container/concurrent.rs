use crate::{
    container::{
        engine::{DescriptorTable, Engine},
        impl_container,
    },
    ContainerOptions, InjectError, InjectResult, ServiceDescriptor,
    ServiceInfo,
};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

type Plan = HashMap<ServiceInfo, Vec<ServiceDescriptor>>;

/// Registrations are appended to a concurrent map until the table is sealed.
/// Sealing freezes the map into an immutable plan, which is read without any
/// locking from then on.
#[derive(Default)]
struct ConcurrentTable {
    descriptors: DashMap<ServiceInfo, Vec<ServiceDescriptor>>,
    // Registrations hold the read side, sealing takes the write side
    sealing: RwLock<()>,
    plan: OnceCell<Plan>,
}

impl ConcurrentTable {
    fn with_plan<T>(
        &self,
        service_info: ServiceInfo,
        f: impl FnOnce(Option<&[ServiceDescriptor]>) -> T,
    ) -> T {
        match self.plan.get() {
            Some(plan) => f(plan.get(&service_info).map(Vec::as_slice)),
            None => {
                let descriptors = self.descriptors.get(&service_info);
                f(descriptors.as_deref().map(Vec::as_slice))
            }
        }
    }
}

impl DescriptorTable for ConcurrentTable {
    fn register(&self, descriptor: ServiceDescriptor) -> InjectResult<()> {
        let _registering = self.sealing.read();
        if self.plan.get().is_some() {
            return Err(InjectError::ContainerSealed {
                service_info: descriptor.service_info(),
            });
        }

        self.descriptors
            .entry(descriptor.service_info())
            .or_default()
            .push(descriptor);
        Ok(())
    }

    fn try_get(&self, service_info: ServiceInfo) -> Option<ServiceDescriptor> {
        self.with_plan(service_info, |descriptors| {
            descriptors.and_then(<[ServiceDescriptor]>::last).cloned()
        })
    }

    fn get_all(&self, service_info: ServiceInfo) -> Vec<ServiceDescriptor> {
        self.with_plan(service_info, |descriptors| {
            descriptors.map(<[ServiceDescriptor]>::to_vec).unwrap_or_default()
        })
    }

    fn contains(&self, service_info: ServiceInfo) -> bool {
        self.with_plan(service_info, |descriptors| descriptors.is_some())
    }

    fn len(&self) -> usize {
        match self.plan.get() {
            Some(plan) => plan.values().map(Vec::len).sum(),
            None => self.descriptors.iter().map(|entry| entry.len()).sum(),
        }
    }

    fn seal(&self) {
        if self.plan.get().is_some() {
            return;
        }

        let _sealing = self.sealing.write();
        self.plan.get_or_init(|| {
            let plan: Plan = self
                .descriptors
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect();
            debug!(services = plan.len(), "sealed container");
            plan
        });
    }

    fn is_sealed(&self) -> bool {
        self.plan.get().is_some()
    }
}

/// The rich container back-end, backed by [`dashmap`]. Every registration of
/// a service is kept, so [`ResolverExt::get_all`](crate::ResolverExt::get_all)
/// returns one instance per registration while single resolution uses the
/// newest one.
///
/// The first resolution seals the container: its registrations are compiled
/// into a resolution plan, and registering afterwards fails with
/// [`InjectError::ContainerSealed`]. The composition root can also seal the
/// container explicitly once it's done registering services.
///
/// ## Example
///
/// ```
/// use service_locator::{
///     ConcurrentContainer, Container, InjectError, ResolverExt,
///     ServiceRegistry, Svc,
/// };
///
/// let container = ConcurrentContainer::new();
/// container.register_instance(Svc::new(1_i32)).unwrap();
/// container.register_instance(Svc::new(2_i32)).unwrap();
///
/// assert_eq!(2, *container.get_required::<i32>().unwrap());
/// assert_eq!(2, container.get_all::<i32>().len());
///
/// assert!(container.is_sealed());
/// assert!(matches!(
///     container.register_instance(Svc::new(3_i32)),
///     Err(InjectError::ContainerSealed { .. })
/// ));
/// ```
#[derive(Clone)]
pub struct ConcurrentContainer {
    engine: Engine,
}

impl ConcurrentContainer {
    /// Name of this back-end.
    pub const BACKEND: &'static str = "concurrent";

    /// Creates an empty container with the default options.
    #[must_use]
    pub fn new() -> Self {
        ConcurrentContainer::with_options(&ContainerOptions::default())
    }

    /// Creates an empty container.
    #[must_use]
    pub fn with_options(options: &ContainerOptions) -> Self {
        ConcurrentContainer {
            engine: Engine::new(
                Self::BACKEND,
                Box::new(ConcurrentTable::default()),
                options,
            ),
        }
    }
}

impl Default for ConcurrentContainer {
    fn default() -> Self {
        ConcurrentContainer::new()
    }
}

impl_container!(ConcurrentContainer);
