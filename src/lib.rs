//! Runtime service container with lifetimes, scopes and switchable back-ends.
//!
//! Services are registered against a container under the contract they
//! fulfill, then resolved on demand. A contract is usually a trait object
//! (`dyn Trait`), which lets the implementation be chosen at runtime rather
//! than at compile time.
//!
//! # Constructors
//!
//! Rust has no runtime reflection, so each concrete type declares its
//! constructors by implementing [`Injectable`]. A constructor is any function
//! of up to 12 parameters where each parameter is a [`Request`], such as
//! [`Svc<T>`], [`Option<Svc<T>>`] or [`Vec<Svc<T>>`]. When a type has more
//! than one constructor, the one with the most parameters is used, falling
//! back to narrower ones if a dependency can't be resolved (see
//! [`ConstructorSelection`]).
//!
//! Types whose constructors are known to a container can be resolved without
//! being registered. They are auto-wired as transients.
//!
//! # Service lifetimes
//!
//! - Transient: a new instance is created for every resolution.
//! - Singleton: one instance is created per container and shared with every
//!   scope created from it.
//! - Scoped: one instance is created per [`Scope`]. Resolving a scoped service
//!   directly from a container creates a new instance each time.
//!
//! Instances that hold resources implement [`Dispose`]. Cached instances are
//! released, newest first, when the container or scope owning them is
//! disposed.
//!
//! # Back-ends
//!
//! Two container back-ends are included. [`BasicContainer`] keeps a single
//! registration per service and has no optional dependencies.
//! `ConcurrentContainer` (enabled by the default `concurrent` feature) keeps
//! every registration and seals itself into a resolution plan on first use.
//! A [`ContainerSelector`] picks between them with fallback, and
//! [`ServiceLocator`] exposes one selector to the whole process.
//!
//! # Example
//!
//! ```
//! use service_locator::{
//!     interface, BasicContainer, Constructors, Injectable, ResolverExt,
//!     ServiceRegistry, Svc,
//! };
//! use std::error::Error;
//!
//! // Some type that represents a user
//! struct User;
//!
//! // This is our interface. Services depending on it don't care which
//! // concrete type implements it.
//! trait DataService: Send + Sync {
//!     fn get_user(&self, user_id: &str) -> Option<User>;
//! }
//!
//! // We can use a data service which connects to a SQL database.
//! #[derive(Default)]
//! struct SqlDataService;
//! impl DataService for SqlDataService {
//!     fn get_user(&self, _user_id: &str) -> Option<User> { todo!() }
//! }
//!
//! // ... Or we can mock out the data service entirely!
//! #[derive(Default)]
//! struct MockDataService;
//! impl DataService for MockDataService {
//!     fn get_user(&self, _user_id: &str) -> Option<User> { Some(User) }
//! }
//!
//! // Specify which types implement the DataService interface. This does not
//! // determine the actual implementation used.
//! interface!(DataService = [SqlDataService, MockDataService]);
//!
//! impl Injectable for SqlDataService {
//!     fn constructors(constructors: &mut Constructors<Self>) {
//!         constructors.add(SqlDataService::default);
//!     }
//! }
//!
//! impl Injectable for MockDataService {
//!     fn constructors(constructors: &mut Constructors<Self>) {
//!         constructors.add(MockDataService::default);
//!     }
//! }
//!
//! // Here's another service our application uses. It depends on our data
//! // service without caring how that service is implemented.
//! struct UserService {
//!     data_service: Svc<dyn DataService>,
//! }
//!
//! impl UserService {
//!     // This is just a normal constructor. The only requirement is that each
//!     // parameter is a valid request.
//!     pub fn new(data_service: Svc<dyn DataService>) -> Self {
//!         UserService { data_service }
//!     }
//!
//!     pub fn get_user(&self, user_id: &str) -> Option<User> {
//!         self.data_service.get_user(user_id)
//!     }
//! }
//!
//! impl Injectable for UserService {
//!     fn constructors(constructors: &mut Constructors<Self>) {
//!         constructors.add(UserService::new);
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let container = BasicContainer::new();
//!     container.register_singleton::<UserService, UserService>()?;
//!
//!     // Let's choose to use the MockDataService as our data service. The
//!     // last registration of a service wins.
//!     container.register_singleton::<dyn DataService, SqlDataService>()?;
//!     container.register_singleton::<dyn DataService, MockDataService>()?;
//!
//!     let user_service = container.get_required::<UserService>()?;
//!     let _user = user_service.get_user("john");
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::needless_doctest_main
)]

mod config;
mod container;
mod locator;
mod module;
mod registry;
mod requests;
mod resolver;
mod selector;
mod services;

pub use config::*;
pub use container::*;
pub use locator::*;
pub use module::*;
pub use registry::*;
pub use requests::*;
pub use resolver::*;
pub use selector::*;
pub use services::*;
