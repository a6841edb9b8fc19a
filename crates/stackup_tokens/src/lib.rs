//! # stackup_tokens
//!
//! Post-provisioning token exchange for stackup.
//!
//! After the stack is deployed, the dashboard's bootstrap password is
//! exchanged for a long-lived service-account API token over the
//! dashboard's own administrative API. The exchange is best-effort and
//! safely re-runnable: the service account is looked up by stable name
//! before creation, so repeating the step never duplicates identities.
//!
//! The dashboard sits behind a self-signed ingress, so the HTTP client
//! trusts invalid certificates by construction.

pub mod error;
pub mod exchanger;

pub use error::{ExchangeError, ExchangeResult};
pub use exchanger::TokenExchanger;
