//! # Roster Models
//!
//! Domain models and DTOs for the Roster API.
//!
//! - [`role`]: The closed set of user roles
//! - [`users`]: The user entity, business inputs and HTTP DTOs
//! - [`filter`]: Query filters and orderable fields for user listings

pub mod filter;
pub mod role;
pub mod users;

pub use filter::{QueryFilter, UserOrderField};
pub use role::{ADMIN_ONLY, ADMIN_OR_USER, Department, Role, ValueError};
pub use users::{
    CreateUserDto, LoginDto, NewUser, TokenResponse, UpdateRolesDto, UpdateUser, UpdateUserDto,
    User, UserResponse,
};
