mod location;
mod models;

pub use location::StorageLocation;
pub use models::*;
