//! The process-wide container accessor.

use crate::{
    ConfigError, Container, ContainerOptions, ContainerSelector, Diagnostics,
    SelectionMode,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

// Initialized by the first call to `configure` or the first access.
static SELECTOR: OnceCell<ContainerSelector> = OnceCell::new();

/// A process-wide [`ContainerSelector`], for code that can't have the
/// composition root's selector passed to it.
///
/// The selector is initialized once. [`ServiceLocator::configure`] sets its
/// options if called before anything else accesses it; otherwise it is
/// initialized from the environment (see [`ContainerOptions::from_env`]).
///
/// ```
/// use service_locator::{ResolverExt, ServiceLocator, ServiceRegistry, Svc};
///
/// struct Greeting(&'static str);
///
/// ServiceLocator::current()
///     .register_instance(Svc::new(Greeting("hello")))
///     .unwrap();
///
/// let greeting = ServiceLocator::current()
///     .get_required::<Greeting>()
///     .unwrap();
/// assert_eq!("hello", greeting.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ServiceLocator;

impl ServiceLocator {
    /// Initializes the global selector with the given options. Fails if the
    /// selector has already been initialized.
    pub fn configure(options: ContainerOptions) -> Result<(), ConfigError> {
        let mut options = Some(options);
        SELECTOR.get_or_init(|| {
            let options = options.take().unwrap_or_default();
            debug!(?options, "configured service locator");
            ContainerSelector::new(options)
        });

        match options {
            None => Ok(()),
            Some(_) => Err(ConfigError::AlreadyConfigured),
        }
    }

    /// The global selector.
    #[must_use]
    pub fn selector() -> &'static ContainerSelector {
        SELECTOR.get_or_init(|| {
            ContainerSelector::new(ContainerOptions::from_env())
        })
    }

    /// The current global container.
    #[must_use]
    pub fn current() -> Arc<dyn Container> {
        Self::selector().current()
    }

    /// See [`ContainerSelector::set_mode`].
    pub fn set_mode(mode: SelectionMode, force: bool) {
        Self::selector().set_mode(mode, force);
    }

    /// See [`ContainerSelector::reset`].
    pub fn reset() {
        Self::selector().reset();
    }

    /// Describes the current global container.
    #[must_use]
    pub fn diagnostics() -> Diagnostics {
        Self::selector().diagnostics()
    }
}
