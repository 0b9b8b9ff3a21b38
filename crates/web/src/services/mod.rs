//! Business logic services for the shop.
//!
//! # Services
//!
//! - `auth` - Signup, login and password reset
//! - `uploads` - Product image filtering and storage

pub mod auth;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use uploads::{ImageStore, UploadError, UploadedImage};
