use crate::{Service, ServiceInfo, Svc};
use std::{
    error::Error,
    panic::{catch_unwind, AssertUnwindSafe},
};
use tracing::{debug, warn};

/// An error returned while releasing a service's resources.
pub type DisposeError = Box<dyn Error + Send + Sync + 'static>;

/// Implemented by services that hold resources which must be released when the
/// cache that owns them (a container's singletons or a scope's scoped
/// instances) is torn down.
///
/// Containers can't discover this implementation on their own. Mark the type
/// with [`Constructors::disposable()`](crate::Constructors::disposable), or
/// return an [`Activation::disposable()`](crate::Activation::disposable) from
/// a factory.
///
/// ## Example
///
/// ```
/// use service_locator::{
///     BasicContainer, Constructors, Dispose, DisposeError, Injectable,
///     Resolver, ResolverExt, ServiceRegistry,
/// };
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Connection {
///     open: AtomicBool,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) -> Result<(), DisposeError> {
///         self.open.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl Injectable for Connection {
///     fn constructors(constructors: &mut Constructors<Self>) {
///         constructors.add(Connection::default).disposable();
///     }
/// }
///
/// let container = BasicContainer::new();
/// container.register_scoped::<Connection, Connection>().unwrap();
///
/// let scope = container.create_scope();
/// let connection = scope.get_required::<Connection>().unwrap();
/// connection.open.store(true, Ordering::SeqCst);
///
/// scope.dispose();
/// assert!(!connection.open.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Service {
    /// Releases the resources held by this service.
    fn dispose(&self) -> Result<(), DisposeError>;
}

/// Releases every instance in `instances`, newest first. Each release runs in
/// its own failure boundary: errors and panics are logged and the remaining
/// instances are still released. Returns how many releases failed.
pub(crate) fn dispose_all(
    owner: &str,
    instances: Vec<(ServiceInfo, Svc<dyn Dispose>)>,
) -> usize {
    let mut failures = 0;
    for (service_info, instance) in instances.into_iter().rev() {
        let result = catch_unwind(AssertUnwindSafe(|| instance.dispose()));
        match result {
            Ok(Ok(())) => {
                debug!(
                    service = service_info.name(),
                    owner,
                    "disposed service"
                );
            }
            Ok(Err(error)) => {
                failures += 1;
                warn!(
                    service = service_info.name(),
                    owner,
                    %error,
                    "failed to dispose service"
                );
            }
            Err(_) => {
                failures += 1;
                warn!(
                    service = service_info.name(),
                    owner,
                    "service panicked while being disposed"
                );
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        log: Svc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Dispose for Recorder {
        fn dispose(&self) -> Result<(), DisposeError> {
            self.log.lock().push(self.name);
            if self.fail {
                Err(format!("{} refused", self.name).into())
            } else {
                Ok(())
            }
        }
    }

    struct Panicker;

    impl Dispose for Panicker {
        fn dispose(&self) -> Result<(), DisposeError> {
            panic!("release blew up")
        }
    }

    fn recorder(
        name: &'static str,
        log: &Svc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> (ServiceInfo, Svc<dyn Dispose>) {
        let recorder = Recorder {
            name,
            log: log.clone(),
            fail,
        };
        (ServiceInfo::of::<Recorder>(), Svc::new(recorder))
    }

    #[test]
    fn releases_newest_first() {
        let log = Svc::new(Mutex::new(Vec::new()));
        let failures = dispose_all(
            "test",
            vec![
                recorder("first", &log, false),
                recorder("second", &log, false),
            ],
        );

        assert_eq!(0, failures);
        assert_eq!(vec!["second", "first"], *log.lock());
    }

    #[test]
    fn failures_do_not_stop_later_releases() {
        let log = Svc::new(Mutex::new(Vec::new()));
        let failures = dispose_all(
            "test",
            vec![
                recorder("first", &log, false),
                (ServiceInfo::of::<Panicker>(), Svc::new(Panicker)),
                recorder("third", &log, true),
            ],
        );

        assert_eq!(2, failures);
        assert_eq!(vec!["third", "first"], *log.lock());
    }
}
