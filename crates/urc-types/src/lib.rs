//! # URC Types
//!
//! Small validated primitives shared by every URC surveillance crate.
//!
//! - [`NonEmptyText`]: trimmed text guaranteed to carry at least one visible character
//! - [`RiskTier`]: organism severity classification, 1 (limited) to 5 (critical)
//!
//! Both types validate on construction *and* on deserialisation, so a value that exists is
//! always valid.

mod risk;
mod text;

pub use risk::{RiskTier, RiskTierError};
pub use text::{NonEmptyText, TextError};
