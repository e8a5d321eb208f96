// Adapters layer: concrete implementations of the domain ports.

pub mod loose;
pub mod memory;

pub use loose::LooseObjectStore;
pub use memory::MemoryObjectStore;
