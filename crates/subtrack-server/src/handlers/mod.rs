//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod admin;
pub mod audit;
pub mod auth;
pub mod banks;
pub mod calendar;
pub mod catalog;
pub mod home;
pub mod notifications;
pub mod payment_methods;
pub mod profile;
pub mod subscriptions;

// Re-export all handlers for use in router
pub use admin::*;
pub use audit::*;
pub use auth::*;
pub use banks::*;
pub use calendar::*;
pub use catalog::*;
pub use home::*;
pub use notifications::*;
pub use payment_methods::*;
pub use profile::*;
pub use subscriptions::*;
