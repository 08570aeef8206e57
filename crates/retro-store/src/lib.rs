pub mod projection;
pub mod store;

pub use projection::Projection;
pub use store::{CollectionStore, StoreStatus};
