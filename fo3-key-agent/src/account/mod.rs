//! Account credentials
//!
//! A credential is the public identity of one derived account: its address
//! plus the coordinates it was derived from.

mod credential;

pub use credential::*;
