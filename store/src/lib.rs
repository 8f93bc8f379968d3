//! Storage for per-user progression records.
//!
//! Every backend implements [`UserStore`]. The rest of the codebase depends
//! only on the trait; [`MemoryUserStore`] is the process-lifetime backend.

pub mod error;
pub mod memory;
pub mod user;

pub use error::StoreError;
pub use memory::MemoryUserStore;
pub use user::UserStore;
