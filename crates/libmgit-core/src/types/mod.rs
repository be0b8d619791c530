pub mod ids;
pub mod signature;
pub mod record;
pub mod mapping;

pub use ids::Hash;
