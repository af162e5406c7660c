pub mod handlers;
pub mod routes;
pub mod subject_extractor;

pub use handlers::*;
pub use routes::*;
