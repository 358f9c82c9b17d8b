//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the business rules and talk to the hosted backend
//! through its trait seams, so route handlers stay focused on protocol
//! translation and cookie plumbing.

pub mod account;
pub mod clients;
pub mod packages;
