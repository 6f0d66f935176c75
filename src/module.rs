use crate::{
    ConstructorSet, Injectable, InterfaceFor, Lifetime, ServiceDescriptor,
    ServiceInfo,
};
use std::{marker::PhantomData, sync::Arc};

type DescribeFn = fn(Arc<ConstructorSet>, Lifetime) -> ServiceDescriptor;

#[derive(Clone)]
struct ModuleInterface {
    service_info: ServiceInfo,
    describe: DescribeFn,
}

/// A catalog of injectable types that can be imported into a container all at
/// once through
/// [`register_module`](crate::ServiceRegistry::register_module).
/// Each entry is a concrete type along with the interfaces it implements.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Clone, Default)]
pub struct Module {
    entries: Vec<ModuleEntry>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new() -> Self {
        Module::default()
    }

    /// Adds a concrete type to this module, or returns the entry for it if it
    /// was already added. The returned builder declares the interfaces the
    /// type implements.
    pub fn add<T: Injectable>(&mut self) -> ModuleEntryBuilder<'_, T> {
        let service_info = ServiceInfo::of::<T>();
        let index = match self
            .entries
            .iter()
            .position(|entry| entry.service_info() == service_info)
        {
            Some(index) => index,
            None => {
                self.entries.push(ModuleEntry {
                    constructors: Arc::new(ConstructorSet::of::<T>()),
                    implementation:
                        ServiceDescriptor::from_constructors::<T, T>,
                    interfaces: Vec::new(),
                });
                self.entries.len() - 1
            }
        };

        ModuleEntryBuilder {
            entry: &mut self.entries[index],
            marker: PhantomData,
        }
    }

    /// The entries of this module, in the order they were added.
    #[must_use]
    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    /// The number of types in this module.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this module has no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A concrete type in a [`Module`].
#[derive(Clone)]
pub struct ModuleEntry {
    constructors: Arc<ConstructorSet>,
    implementation: DescribeFn,
    interfaces: Vec<ModuleInterface>,
}

impl ModuleEntry {
    /// The concrete type of this entry.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.constructors.service_info()
    }

    /// The interfaces this type is registered under when imported.
    pub fn interfaces(&self) -> impl Iterator<Item = ServiceInfo> + '_ {
        self.interfaces.iter().map(|interface| interface.service_info)
    }

    /// The constructors of this type.
    #[must_use]
    pub fn constructors(&self) -> &Arc<ConstructorSet> {
        &self.constructors
    }

    /// One registration per declared interface, or a registration of the type
    /// itself if it declares none.
    pub(crate) fn descriptors(
        &self,
        lifetime: Lifetime,
    ) -> Vec<ServiceDescriptor> {
        if self.interfaces.is_empty() {
            let constructors = self.constructors.clone();
            return vec![(self.implementation)(constructors, lifetime)];
        }

        self.interfaces
            .iter()
            .map(|interface| {
                (interface.describe)(self.constructors.clone(), lifetime)
            })
            .collect()
    }
}

/// Declares the interfaces implemented by a type in a [`Module`].
pub struct ModuleEntryBuilder<'a, T: Injectable> {
    entry: &'a mut ModuleEntry,
    marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> ModuleEntryBuilder<'_, T> {
    /// Registers the type under the interface `I` when the module is
    /// imported.
    pub fn implements<I>(&mut self) -> &mut Self
    where
        I: ?Sized + InterfaceFor<T>,
    {
        let service_info = ServiceInfo::of::<I>();
        let declared = self
            .entry
            .interfaces
            .iter()
            .any(|interface| interface.service_info == service_info);
        if !declared {
            self.entry.interfaces.push(ModuleInterface {
                service_info,
                describe: ServiceDescriptor::from_constructors::<I, T>,
            });
        }

        self
    }
}

/// Defines a new module using a domain specific language.
///
/// # Example
///
/// ```
/// use service_locator::{
///     define_module, interface, BasicContainer, Constructors, Injectable,
///     Lifetime, ResolverExt, ServiceRegistry, Svc,
/// };
///
/// #[derive(Default)]
/// struct Foo;
/// #[derive(Default)]
/// struct Bar;
/// struct Baz(Vec<Svc<dyn Fooable>>);
///
/// trait Fooable: Send + Sync {}
/// impl Fooable for Foo {}
/// impl Fooable for Bar {}
/// interface! {
///     Fooable = [Foo, Bar]
/// };
///
/// impl Injectable for Foo {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(Foo::default);
///     }
/// }
///
/// impl Injectable for Bar {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(Bar::default);
///     }
/// }
///
/// impl Injectable for Baz {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(Baz);
///     }
/// }
///
/// let module = define_module! {
///     services = [Baz],
///     interfaces = {
///         dyn Fooable = [Foo, Bar],
///     },
/// };
///
/// let container = BasicContainer::new();
/// container
///     .register_module(&module, |_| true, Lifetime::Singleton)
///     .unwrap();
///
/// // The minimal back-end keeps one registration per service
/// let baz: Svc<Baz> = container.get_required().unwrap();
/// assert_eq!(1, baz.0.len());
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $($key:tt = $value:tt),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = $crate::Module::new();
            $($crate::define_module!(@add module, $key = $value);)*
            module
        }
    };
    (
        @add $module:expr,
        services = [
            $($service:ty),*
            $(,)?
        ]
    ) => {
        $($module.add::<$service>();)*
    };
    (
        @add $module:expr,
        interfaces = {
            $($interface:ty = [
                $($implementation:ty),*
                $(,)?
            ]),*
            $(,)?
        }
    ) => {
        $(
            $($module.add::<$implementation>().implements::<$interface>();)*
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interface, Constructors};

    trait Shape: Send + Sync {}
    trait Named: Send + Sync {}

    #[derive(Default)]
    struct Circle;
    impl Shape for Circle {}
    impl Named for Circle {}

    #[derive(Default)]
    struct Label;

    interface!(Shape = [Circle]);
    interface!(Named = [Circle]);

    impl Injectable for Circle {
        fn constructors(constructors: &mut Constructors<Self>) {
            constructors.add(Circle::default);
        }
    }

    impl Injectable for Label {
        fn constructors(constructors: &mut Constructors<Self>) {
            constructors.add(Label::default);
        }
    }

    #[test]
    fn entries_are_merged_per_type() {
        let module = define_module! {
            services = [Label],
            interfaces = {
                dyn Shape = [Circle],
                dyn Named = [Circle],
            },
        };

        assert_eq!(2, module.len());
        let circle = &module.entries()[1];
        assert_eq!(ServiceInfo::of::<Circle>(), circle.service_info());
        assert_eq!(
            vec![
                ServiceInfo::of::<dyn Shape>(),
                ServiceInfo::of::<dyn Named>(),
            ],
            circle.interfaces().collect::<Vec<_>>()
        );
    }

    #[test]
    fn entries_without_interfaces_describe_themselves() {
        let mut module = Module::new();
        module.add::<Label>();
        module
            .add::<Circle>()
            .implements::<dyn Shape>()
            .implements::<dyn Shape>();

        let label = module.entries()[0].descriptors(Lifetime::Scoped);
        assert_eq!(1, label.len());
        assert_eq!(ServiceInfo::of::<Label>(), label[0].service_info());
        assert_eq!(Lifetime::Scoped, label[0].lifetime());

        let circle = module.entries()[1].descriptors(Lifetime::Transient);
        assert_eq!(1, circle.len());
        assert_eq!(ServiceInfo::of::<dyn Shape>(), circle[0].service_info());
        assert_eq!(
            Some(ServiceInfo::of::<Circle>()),
            circle[0].implementation_info()
        );
    }
}
