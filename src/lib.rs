//! oauth-guard -- checks Claude OAuth credentials before a CI step uses them.
//!
//! The [`guidance::Validator`] reads the three credential secrets through a
//! [`credentials::CredentialSource`], evaluates their expiry with the
//! functions in [`expiry`] against an injected [`clock::Clock`], and reports
//! operator guidance to a [`guidance::GuidanceSink`].

pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod expiry;
pub mod guidance;

pub use clock::{Clock, FixedClock, SystemClock};
pub use credentials::{CredentialBundle, CredentialSource, EnvCredentialSource};
pub use error::CredentialError;
pub use expiry::{ExpirationStatus, is_expired, remaining_time};
pub use guidance::{AdvicePolicy, AdviceTier, GuidanceSink, Validator};
