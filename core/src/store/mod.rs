pub mod factory;
pub mod vector;

pub use factory::open_store;
pub use vector::VectorStore;
