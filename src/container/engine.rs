use crate::{
    container::{cache::InstanceCache, scope::Scope},
    resolver::PathResolver,
    services::Provision,
    Activation, ConstructorSelection, ConstructorSet, ContainerOptions,
    DynSvc, InjectError, InjectResult, Lifetime, RequestInfo, Resolver,
    ServiceDescriptor, ServiceInfo,
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// Storage for the registrations of a container. Each back-end provides its
/// own table.
pub(crate) trait DescriptorTable: Send + Sync {
    /// Adds a registration. The newest registration of a service is the one
    /// used for single resolution.
    fn register(&self, descriptor: ServiceDescriptor) -> InjectResult<()>;

    /// Gets the registration used to resolve a single instance of a service.
    fn try_get(&self, service_info: ServiceInfo) -> Option<ServiceDescriptor>;

    /// Gets every registration of a service, oldest first.
    fn get_all(&self, service_info: ServiceInfo) -> Vec<ServiceDescriptor>;

    fn contains(&self, service_info: ServiceInfo) -> bool;

    /// The number of registrations held by this table.
    fn len(&self) -> usize;

    /// Stops accepting registrations. Called before every resolution.
    fn seal(&self) {}

    fn is_sealed(&self) -> bool {
        false
    }
}

/// The resolution core shared by every back-end. Handles are cheap to clone,
/// and scopes keep the engine of their container alive.
#[derive(Clone)]
pub(crate) struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    backend: &'static str,
    table: Box<dyn DescriptorTable>,
    constructors: RwLock<HashMap<ServiceInfo, Arc<ConstructorSet>>>,
    singletons: InstanceCache,
    selection: ConstructorSelection,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        let failures = self.singletons.dispose_all(self.backend);
        debug!(backend = self.backend, failures, "container dropped");
    }
}

impl Engine {
    pub fn new(
        backend: &'static str,
        table: Box<dyn DescriptorTable>,
        options: &ContainerOptions,
    ) -> Self {
        debug!(
            backend,
            constructor_selection = ?options.constructor_selection,
            "created container"
        );

        Engine {
            inner: Arc::new(EngineInner {
                backend,
                table,
                constructors: RwLock::default(),
                singletons: InstanceCache::default(),
                selection: options.constructor_selection,
            }),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.inner.backend
    }

    pub fn register(&self, descriptor: ServiceDescriptor) -> InjectResult<()> {
        let service_info = descriptor.service_info();
        let lifetime = descriptor.lifetime();
        let kind = descriptor.kind();

        match self.inner.table.register(descriptor) {
            Ok(()) => {
                debug!(
                    backend = self.inner.backend,
                    service = service_info.name(),
                    ?lifetime,
                    ?kind,
                    "registered service"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    backend = self.inner.backend,
                    service = service_info.name(),
                    %error,
                    "rejected registration"
                );
                Err(error)
            }
        }
    }

    pub fn try_get(
        &self,
        service_info: ServiceInfo,
    ) -> Option<ServiceDescriptor> {
        self.inner.table.try_get(service_info)
    }

    pub fn add_constructors(
        &self,
        constructors: Arc<ConstructorSet>,
    ) -> InjectResult<()> {
        let service_info = constructors.service_info();
        if self.is_sealed() {
            warn!(
                backend = self.inner.backend,
                service = service_info.name(),
                "rejected constructors of sealed container"
            );
            return Err(InjectError::ContainerSealed { service_info });
        }

        debug!(
            backend = self.inner.backend,
            service = service_info.name(),
            constructors = constructors.len(),
            "added constructors"
        );
        self.inner.constructors.write().insert(service_info, constructors);
        Ok(())
    }

    pub fn registration_count(&self) -> usize {
        self.inner.table.len()
    }

    pub fn seal(&self) {
        self.inner.table.seal();
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.table.is_sealed()
    }

    /// Releases every cached singleton. Singletons resolved afterwards are
    /// constructed again.
    pub fn dispose(&self) {
        let failures = self.inner.singletons.dispose_all(self.inner.backend);
        debug!(backend = self.inner.backend, failures, "disposed container");
    }

    pub fn contains(&self, service_info: ServiceInfo) -> bool {
        self.inner.table.contains(service_info)
    }

    pub fn create_scope(&self, depth: usize) -> Scope {
        Scope::new(self.clone(), depth)
    }

    /// Resolves a service from the container, or from `scope` if the request
    /// is made within one.
    pub fn resolve_in(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
        scope: Option<&Scope>,
    ) -> InjectResult<DynSvc> {
        self.inner.table.seal();
        let request_info = enter(service_info, request_info)?;

        if let Some(descriptor) = self.inner.table.try_get(service_info) {
            return self.activate(&descriptor, &request_info, scope);
        }

        // Unregistered types are auto-wired as transients if their
        // constructors are known
        let constructors =
            self.inner.constructors.read().get(&service_info).cloned();
        match constructors {
            Some(constructors) => {
                debug!(
                    backend = self.inner.backend,
                    service = service_info.name(),
                    "auto-wiring unregistered service"
                );
                let activation = constructors.construct(
                    self.resolver(scope),
                    &request_info,
                    self.inner.selection,
                )?;
                Ok(activation.instance)
            }
            None => Err(InjectError::ServiceNotRegistered { service_info }),
        }
    }

    /// Resolves every registration of a service.
    pub fn resolve_all_in(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
        scope: Option<&Scope>,
    ) -> InjectResult<Vec<DynSvc>> {
        self.inner.table.seal();
        let request_info = enter(service_info, request_info)?;

        self.inner
            .table
            .get_all(service_info)
            .iter()
            .map(|descriptor| self.activate(descriptor, &request_info, scope))
            .collect()
    }

    fn resolver<'a>(&'a self, scope: Option<&'a Scope>) -> &'a dyn Resolver {
        match scope {
            Some(scope) => scope,
            None => self,
        }
    }

    fn activate(
        &self,
        descriptor: &ServiceDescriptor,
        request_info: &RequestInfo,
        scope: Option<&Scope>,
    ) -> InjectResult<DynSvc> {
        if let Provision::Instance(instance) = &descriptor.provision {
            return Ok(instance.clone());
        }

        match (descriptor.lifetime(), scope) {
            // Singletons never see the scope they were first requested from
            (Lifetime::Singleton, _) => {
                self.inner.singletons.get_or_create(descriptor, || {
                    self.provide(descriptor, request_info, self)
                })
            }
            (Lifetime::Scoped, Some(scope)) => {
                scope.instances().get_or_create(descriptor, || {
                    self.provide(descriptor, request_info, scope)
                })
            }
            (Lifetime::Transient | Lifetime::Scoped, scope) => {
                let resolver = self.resolver(scope);
                let activation =
                    self.provide(descriptor, request_info, resolver)?;
                Ok(activation.instance)
            }
        }
    }

    fn provide(
        &self,
        descriptor: &ServiceDescriptor,
        request_info: &RequestInfo,
        resolver: &dyn Resolver,
    ) -> InjectResult<Activation> {
        match &descriptor.provision {
            Provision::Instance(instance) => Ok(Activation {
                instance: instance.clone(),
                disposer: None,
            }),
            Provision::Factory(factory) => {
                factory(&PathResolver::new(resolver, request_info))
            }
            Provision::Implementation {
                constructors,
                upcast,
            } => {
                let activation = constructors.construct(
                    resolver,
                    request_info,
                    self.inner.selection,
                )?;
                Ok(Activation {
                    instance: upcast(activation.instance)?,
                    disposer: activation.disposer,
                })
            }
        }
    }
}

/// Adds a service to the request path, failing if it is already being
/// activated by the request.
fn enter(
    service_info: ServiceInfo,
    request_info: &RequestInfo,
) -> InjectResult<RequestInfo> {
    match request_info.cycle_to(service_info) {
        Some(cycle) => Err(InjectError::CircularDependency {
            service_info,
            cycle,
        }),
        None => Ok(request_info.with_request(service_info)),
    }
}

impl Resolver for Engine {
    fn resolve(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        self.resolve_in(service_info, request_info, None)
    }

    fn resolve_all(
        &self,
        service_info: ServiceInfo,
        request_info: &RequestInfo,
    ) -> InjectResult<Vec<DynSvc>> {
        self.resolve_all_in(service_info, request_info, None)
    }

    fn contains(&self, service_info: ServiceInfo) -> bool {
        Engine::contains(self, service_info)
    }

    fn create_scope(&self) -> Scope {
        Engine::create_scope(self, 0)
    }
}
