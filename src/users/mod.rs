pub mod memory;
pub mod repo;
pub mod repo_types;

pub use memory::MemoryUserRepo;
pub use repo::{PgUserRepo, StoreError, UserRepo};
pub use repo_types::{NewUser, Notification, ProfilePatch, Role, User};
