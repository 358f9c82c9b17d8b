//! Route guard: decides whether a navigation renders or redirects.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every page route runs behind [`middleware::route_guard`]; websocket shells
//! drive a [`navigator::Navigator`] instead. Both call the same
//! [`decision::evaluate`], so HTTP and live navigation always agree.

pub mod decision;
pub mod middleware;
pub mod navigator;
pub mod route;

pub use decision::Viewer;
pub use navigator::{GuardSnapshot, Navigator, RedirectEvent};
pub use route::home_for;
