use crate::{
    config::MODE_ENV, BasicContainer, ConfigError, Container, ContainerOptions,
    InjectError, InjectResult,
};
use arc_swap::ArcSwapOption;
use derive_more::Display;
use parking_lot::Mutex;
use serde::Deserialize;
use std::{
    any::Any,
    fmt::{Debug, Formatter},
    panic::{catch_unwind, AssertUnwindSafe},
    str::FromStr,
    sync::Arc,
};
use tracing::{debug, info, warn};

/// Which container back-end a [`ContainerSelector`] tries first.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Display, Hash, Default, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Try the rich back-end, quietly falling back to the minimal one.
    #[default]
    #[display(fmt = "auto")]
    Auto,
    /// Try the rich back-end, warning if the minimal one has to be used.
    #[display(fmt = "prefer-rich")]
    PreferRich,
    /// Only use the minimal back-end.
    #[display(fmt = "prefer-minimal")]
    PreferMinimal,
}

impl FromStr for SelectionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "auto" => Ok(SelectionMode::Auto),
            "prefer-rich" => Ok(SelectionMode::PreferRich),
            "prefer-minimal" => Ok(SelectionMode::PreferMinimal),
            _ => Err(ConfigError::InvalidValue {
                key: MODE_ENV,
                value: value.to_owned(),
            }),
        }
    }
}

/// A factory for one kind of container.
pub trait Backend: Send + Sync {
    /// Name of the back-end, used in logs.
    fn name(&self) -> &'static str;

    /// Creates an empty container. Fails with
    /// [`InjectError::BackendUnavailable`] if the back-end can't be used. A
    /// back-end that panics is treated as unavailable.
    fn create(
        &self,
        options: &ContainerOptions,
    ) -> InjectResult<Arc<dyn Container>>;
}

/// Creates [`BasicContainer`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicBackend;

impl Backend for BasicBackend {
    fn name(&self) -> &'static str {
        BasicContainer::BACKEND
    }

    fn create(
        &self,
        options: &ContainerOptions,
    ) -> InjectResult<Arc<dyn Container>> {
        Ok(Arc::new(BasicContainer::with_options(options)))
    }
}

/// Creates [`ConcurrentContainer`](crate::ConcurrentContainer)s. Without the
/// `concurrent` feature, creating a container always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConcurrentBackend;

impl Backend for ConcurrentBackend {
    fn name(&self) -> &'static str {
        "concurrent"
    }

    #[cfg(feature = "concurrent")]
    fn create(
        &self,
        options: &ContainerOptions,
    ) -> InjectResult<Arc<dyn Container>> {
        Ok(Arc::new(crate::ConcurrentContainer::with_options(options)))
    }

    #[cfg(not(feature = "concurrent"))]
    fn create(
        &self,
        _options: &ContainerOptions,
    ) -> InjectResult<Arc<dyn Container>> {
        Err(InjectError::BackendUnavailable {
            backend: self.name(),
            reason: "the crate was built without the `concurrent` feature"
                .to_owned(),
        })
    }
}

struct Selected {
    container: Arc<dyn Container>,
    mode: SelectionMode,
}

/// Chooses which container back-end is current, with fallback to the minimal
/// back-end when the rich one can't be created.
///
/// The current container is created on first access. Reading it afterwards
/// doesn't take a lock, while creating or replacing it is serialized.
///
/// ```
/// use service_locator::{
///     ContainerOptions, ContainerSelector, ResolverExt, SelectionMode,
///     ServiceRegistry, Svc,
/// };
///
/// let selector = ContainerSelector::new(ContainerOptions::default());
/// selector.current().register_instance(Svc::new(5_u32)).unwrap();
/// assert_eq!(5, *selector.current().get_required::<u32>().unwrap());
///
/// // Switching modes with force replaces the current container
/// selector.set_mode(SelectionMode::PreferMinimal, true);
/// assert_eq!("basic", selector.current().backend());
/// assert!(!selector.current().is_registered::<u32>());
/// ```
pub struct ContainerSelector {
    options: Mutex<ContainerOptions>,
    rich: Arc<dyn Backend>,
    minimal: Arc<dyn Backend>,
    current: ArcSwapOption<Selected>,
    swap: Mutex<()>,
}

impl ContainerSelector {
    /// Creates a selector over the built-in back-ends.
    #[must_use]
    pub fn new(options: ContainerOptions) -> Self {
        ContainerSelector::with_backends(
            options,
            Arc::new(ConcurrentBackend),
            Arc::new(BasicBackend),
        )
    }

    /// Creates a selector over custom back-ends.
    #[must_use]
    pub fn with_backends(
        options: ContainerOptions,
        rich: Arc<dyn Backend>,
        minimal: Arc<dyn Backend>,
    ) -> Self {
        ContainerSelector {
            options: Mutex::new(options),
            rich,
            minimal,
            current: ArcSwapOption::empty(),
            swap: Mutex::new(()),
        }
    }

    /// Gets the current container, creating it if needed.
    #[must_use]
    pub fn current(&self) -> Arc<dyn Container> {
        self.selected().container.clone()
    }

    /// The mode used for the next selection.
    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.options.lock().mode
    }

    /// Changes the mode used for future selections. With `force`, the current
    /// container is disposed and replaced immediately.
    pub fn set_mode(&self, mode: SelectionMode, force: bool) {
        self.options.lock().mode = mode;
        debug!(%mode, force, "changed container selection mode");

        if force {
            let _swap = self.swap.lock();
            self.dispose_current();
            let selected = self.select();
            self.current.store(Some(Arc::new(selected)));
        }
    }

    /// Disposes the current container. The next access creates a new one.
    pub fn reset(&self) {
        let _swap = self.swap.lock();
        self.dispose_current();
    }

    /// Describes the current container.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let selected = self.selected();
        let container = &selected.container;

        Diagnostics {
            backend: container.backend(),
            mode: selected.mode,
            registrations: container.registration_count(),
            sealed: container.is_sealed(),
        }
    }

    fn selected(&self) -> Arc<Selected> {
        if let Some(selected) = self.current.load_full() {
            return selected;
        }

        let _swap = self.swap.lock();
        if let Some(selected) = self.current.load_full() {
            return selected;
        }

        let selected = Arc::new(self.select());
        self.current.store(Some(selected.clone()));
        selected
    }

    fn dispose_current(&self) {
        if let Some(previous) = self.current.swap(None) {
            debug!(
                backend = previous.container.backend(),
                "disposing current container"
            );
            previous.container.dispose();
        }
    }

    fn select(&self) -> Selected {
        let options = self.options.lock().clone();
        let mode = options.mode;
        let candidates = match mode {
            SelectionMode::Auto | SelectionMode::PreferRich => {
                vec![&self.rich, &self.minimal]
            }
            SelectionMode::PreferMinimal => vec![&self.minimal],
        };

        for backend in candidates {
            match create(&**backend, &options) {
                Ok(container) => {
                    info!(
                        backend = backend.name(),
                        %mode,
                        "selected container back-end"
                    );
                    return Selected { container, mode };
                }
                Err(error) if mode == SelectionMode::Auto => {
                    info!(
                        backend = backend.name(),
                        %error,
                        "container back-end unavailable, falling back"
                    );
                }
                Err(error) => {
                    warn!(
                        backend = backend.name(),
                        %mode,
                        %error,
                        "container back-end unavailable, falling back"
                    );
                }
            }
        }

        warn!(
            %mode,
            "no container back-end could be created, using the basic one"
        );
        Selected {
            container: Arc::new(BasicContainer::with_options(&options)),
            mode,
        }
    }
}

fn create(
    backend: &dyn Backend,
    options: &ContainerOptions,
) -> InjectResult<Arc<dyn Container>> {
    catch_unwind(AssertUnwindSafe(|| backend.create(options))).unwrap_or_else(
        |payload| {
            Err(InjectError::BackendUnavailable {
                backend: backend.name(),
                reason: format!("panicked: {}", panic_message(&*payload)),
            })
        },
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Default for ContainerSelector {
    fn default() -> Self {
        ContainerSelector::new(ContainerOptions::default())
    }
}

impl Debug for ContainerSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSelector")
            .field("mode", &self.mode())
            .field("rich", &self.rich.name())
            .field("minimal", &self.minimal.name())
            .field(
                "current",
                &self
                    .current
                    .load_full()
                    .map(|selected| selected.container.backend()),
            )
            .finish_non_exhaustive()
    }
}

/// A description of the current container.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display(
    fmt = "back-end: {}, mode: {}, registrations: {}, sealed: {}",
    backend,
    mode,
    registrations,
    sealed
)]
pub struct Diagnostics {
    /// Name of the current back-end.
    pub backend: &'static str,
    /// The mode the current container was selected with.
    pub mode: SelectionMode,
    /// The number of registrations in the current container.
    pub registrations: usize,
    /// Whether the current container rejects new registrations.
    pub sealed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Dispose, DisposeError, Lifetime, ResolverExt, ServiceRegistry, Svc,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingBackend {
        attempts: AtomicUsize,
    }

    impl Backend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn create(
            &self,
            _options: &ContainerOptions,
        ) -> InjectResult<Arc<dyn Container>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(InjectError::BackendUnavailable {
                backend: self.name(),
                reason: "forced failure".to_owned(),
            })
        }
    }

    struct PanickyBackend;

    impl Backend for PanickyBackend {
        fn name(&self) -> &'static str {
            "panicky"
        }

        fn create(
            &self,
            _options: &ContainerOptions,
        ) -> InjectResult<Arc<dyn Container>> {
            panic!("back-end exploded")
        }
    }

    struct Pool {
        releases: Svc<AtomicUsize>,
        fail: bool,
    }

    impl Dispose for Pool {
        fn dispose(&self) -> Result<(), DisposeError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("pool refused to close".into())
            } else {
                Ok(())
            }
        }
    }

    fn register_pool(
        container: &dyn Container,
        releases: &Svc<AtomicUsize>,
        fail: bool,
    ) {
        let releases = releases.clone();
        container
            .register_disposable_factory::<Pool, Pool, _>(
                move |_| {
                    Ok(Svc::new(Pool {
                        releases: releases.clone(),
                        fail,
                    }))
                },
                Lifetime::Singleton,
            )
            .unwrap();
    }

    fn options(mode: SelectionMode) -> ContainerOptions {
        ContainerOptions {
            mode,
            ..ContainerOptions::default()
        }
    }

    #[test]
    fn current_is_created_once() {
        let selector = ContainerSelector::new(options(SelectionMode::Auto));
        let first = selector.current();
        let second = selector.current();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[cfg(feature = "concurrent")]
    #[test]
    fn auto_prefers_rich_backend() {
        let selector = ContainerSelector::new(options(SelectionMode::Auto));
        assert_eq!("concurrent", selector.current().backend());
    }

    #[test]
    fn prefer_minimal_skips_rich_backend() {
        let rich = Arc::new(FailingBackend::default());
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::PreferMinimal),
            rich.clone(),
            Arc::new(BasicBackend),
        );

        assert_eq!("basic", selector.current().backend());
        assert_eq!(0, rich.attempts.load(Ordering::SeqCst));
    }

    #[test]
    fn failing_backends_fall_back_to_basic() {
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::PreferRich),
            Arc::new(FailingBackend::default()),
            Arc::new(FailingBackend::default()),
        );

        let container = selector.current();
        assert_eq!("basic", container.backend());
        container.register_instance(Svc::new(1_u8)).unwrap();
        assert_eq!(1, *container.get_required::<u8>().unwrap());
    }

    #[test]
    fn set_mode_without_force_waits_for_reset() {
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::Auto),
            Arc::new(BasicBackend),
            Arc::new(BasicBackend),
        );
        let first = selector.current();

        selector.set_mode(SelectionMode::PreferMinimal, false);
        assert_eq!(SelectionMode::PreferMinimal, selector.mode());
        assert!(Arc::ptr_eq(&first, &selector.current()));
        assert_eq!(SelectionMode::Auto, selector.diagnostics().mode);

        selector.reset();
        assert!(!Arc::ptr_eq(&first, &selector.current()));
        assert_eq!(SelectionMode::PreferMinimal, selector.diagnostics().mode);
    }

    #[test]
    fn diagnostics_describe_current_container() {
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::Auto),
            Arc::new(FailingBackend::default()),
            Arc::new(BasicBackend),
        );
        selector
            .current()
            .register_instance(Svc::new(1_u8))
            .unwrap();

        let diagnostics = selector.diagnostics();
        assert_eq!(
            "back-end: basic, mode: auto, registrations: 1, sealed: false",
            diagnostics.to_string()
        );
    }

    #[test]
    fn modes_parse_from_kebab_case() {
        assert_eq!(
            SelectionMode::PreferRich,
            "prefer-rich".parse::<SelectionMode>().unwrap()
        );
        assert!("PreferRich".parse::<SelectionMode>().is_err());
        assert_eq!("prefer-minimal", SelectionMode::PreferMinimal.to_string());
    }

    #[test]
    fn panicking_backend_falls_back_to_basic() {
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::Auto),
            Arc::new(PanickyBackend),
            Arc::new(BasicBackend),
        );

        let container = selector.current();
        assert_eq!("basic", container.backend());
        assert!(Arc::ptr_eq(&container, &selector.current()));
    }

    #[test]
    fn forced_switch_disposes_previous_singletons() {
        let releases = Svc::new(AtomicUsize::new(0));
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::Auto),
            Arc::new(BasicBackend),
            Arc::new(BasicBackend),
        );
        let previous = selector.current();
        register_pool(previous.as_ref(), &releases, false);
        previous.get_required::<Pool>().unwrap();
        assert_eq!(0, releases.load(Ordering::SeqCst));

        selector.set_mode(SelectionMode::PreferMinimal, true);
        assert_eq!(1, releases.load(Ordering::SeqCst));
        assert!(!Arc::ptr_eq(&previous, &selector.current()));
        assert!(!selector.current().is_registered::<Pool>());
    }

    #[test]
    fn reset_survives_failed_release() {
        let releases = Svc::new(AtomicUsize::new(0));
        let selector = ContainerSelector::with_backends(
            options(SelectionMode::Auto),
            Arc::new(BasicBackend),
            Arc::new(BasicBackend),
        );
        let previous = selector.current();
        register_pool(previous.as_ref(), &releases, true);
        previous.get_required::<Pool>().unwrap();

        selector.reset();
        assert_eq!(1, releases.load(Ordering::SeqCst));
        assert!(!Arc::ptr_eq(&previous, &selector.current()));

        drop(previous);
        assert_eq!(1, releases.load(Ordering::SeqCst));
    }
}
