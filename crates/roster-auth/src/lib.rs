//! Signing keys, access-token claims and JWT verification.

pub mod claims;
pub mod jwt;
pub mod keystore;

pub use claims::Claims;
pub use jwt::{ALGORITHM, Auth, AuthError, LEEWAY_SECS};
pub use keystore::{Key, KeyStore, KeyStoreError, MAX_KEY_FILE_SIZE, parse_private_key};
