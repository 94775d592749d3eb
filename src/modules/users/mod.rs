//! User management: the business layer ([`UserBus`]), its storage
//! ([`PgUserStore`]) and the HTTP handlers.

pub mod bus;
pub mod controller;
pub mod filters;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod router;
pub mod store;

pub use bus::{DEFAULT_BCRYPT_COST, UserBus, UserError, UserStore};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemUserStore;
pub use store::PgUserStore;
