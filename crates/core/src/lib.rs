pub mod config;
pub mod domain;
pub mod errors;

pub use domain::checklist::Checklists;
pub use domain::collection::{CollectionKey, CollectionShape, CollectionValue, NamedLists};
pub use domain::pick::pick_one;
pub use errors::{CommandError, DomainError};
