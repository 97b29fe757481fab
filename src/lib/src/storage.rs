pub mod local;
pub mod memory;
pub mod resume_store;

pub use local::LocalResumeStore;
pub use memory::MemoryResumeStore;
pub use resume_store::*;
