pub mod catalog;
pub mod error;

pub use catalog::{ParameterCatalog, ParameterSet, QueryParameter};
pub use error::ParamError;
