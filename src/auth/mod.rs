//! Authentication module for fileshelf.
//!
//! This module provides password hashing, user registration, login and
//! password changes.

mod password;
mod profile;
mod registration;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use profile::{change_password, get_profile, PasswordChange, ProfileError};
pub use registration::{authenticate, register, LoginError, RegistrationError, RegistrationRequest};
pub use validation::ValidationError;
