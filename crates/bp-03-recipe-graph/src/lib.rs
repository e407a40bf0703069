//! # BP-03: Recipe/Repository Graph
//!
//! Converts component metadata into executable creation recipes and owns
//! every materialised singleton.
//!
//! ## Architecture
//!
//! - **Domain**: `Recipe`/`ValueRecipe` (pure construction plans), `Value`
//!   (resolved injection values, including forward references into a
//!   creation cycle) and errors
//! - **Ports**: `ComponentFactory`, `Converter` and `BeanProcessor`, the
//!   hooks through which application code takes part in creation
//! - **Adapters**: factory registry, aggregate converter, reference proxies
//! - **Application**: `RecipeBuilder`, `Repository` and
//!   `ServiceRegistrationHandle`
//!
//! ## Creation model
//!
//! Every name owns a slot that is empty, `InProgress` or `Ready`. Creation
//! runs under one re-entrant lock: a racing thread waits and then observes
//! `Ready`, while the creating thread re-entering an `InProgress` slot
//! receives a forward reference that resolves once the cycle's root is
//! finished.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use adapters::converters::AggregateConverter;
pub use adapters::factories::{FactoryRegistry, FnFactory};
pub use adapters::proxies::{ReferenceListProxy, ReferenceProxy};
pub use application::builder::{RecipeBuilder, RecipeSet};
pub use application::repository::Repository;
pub use application::service_handle::ServiceRegistrationHandle;
pub use domain::errors::RecipeError;
pub use domain::recipe::{BeanRecipe, Recipe, RecipeKind, ValueRecipe};
pub use domain::value::{ForwardRef, Value};
pub use ports::outbound::{BeanProcessor, ComponentFactory, Converter};
