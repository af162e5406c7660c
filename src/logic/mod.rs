pub mod authorization;
pub mod catalog;
pub mod resolver;
pub mod schema_mode;

pub use authorization::{Action, AuthorizationGate, Role};
pub use catalog::Catalog;
pub use resolver::Resolver;
pub use schema_mode::SchemaModeController;
