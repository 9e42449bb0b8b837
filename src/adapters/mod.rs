// Adapters layer: concrete implementations of the domain ports.

pub mod document_store;
pub mod local;
pub mod memory;

pub use document_store::DocumentStore;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
