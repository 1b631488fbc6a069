//! Utility functions shared across the application.

pub(crate) mod permissions;

pub use permissions::{restrict_file_permissions, write_private_file};
