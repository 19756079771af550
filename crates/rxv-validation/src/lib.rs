#![forbid(unsafe_code)]

//! Validation-state composition for reactive view models.
//!
//! This crate provides:
//! - [`ValidationText`] and [`ValidationState`]: immutable validation results
//!   with content-based equality
//! - [`component`]: rules that observe view-model properties and publish a
//!   [`ValidationState`] on every change
//! - [`ValidationContext`] for folding many rules into one aggregate state
//! - [`ValidationBinding`] and [`BindingScope`] for pushing results into UI
//!   sinks through a [`ValidationTextFormatter`]
//! - [`source`]: external outcome sources, including a channel for results
//!   produced on worker threads
//!
//! # Example
//!
//! ```
//! use rxv_reactive::Observable;
//! use rxv_validation::ValidationContext;
//!
//! let password = Observable::new(String::from("secret"));
//! let confirm = Observable::new(String::new());
//!
//! let context = ValidationContext::new();
//! context
//!     .add_multi_property_rule(
//!         (&password, "Password"),
//!         (&confirm, "ConfirmPassword"),
//!         |a: &String, b: &String| a == b,
//!         "Passwords must match.",
//!     )
//!     .unwrap();
//! assert!(!context.current_validity());
//!
//! confirm.set("secret".into());
//! assert!(context.current_validity());
//! ```

pub mod binding;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod formatter;
pub mod source;
pub mod state;
pub mod text;

pub use binding::{BindingScope, ValidationBinding};
pub use component::{
    ClaimMode, MultiPropertyRule, ObservableRule, PropertyRule, RuleError, RuleMessage,
    RuleOutcome, RuleResult, ValidationComponent,
};
pub use config::ValidationConfig;
pub use context::{ComponentHandle, ValidationContext};
pub use error::{Result, ValidationError};
pub use formatter::{SingleLineFormatter, ValidationTextFormatter};
pub use source::{CompletionSource, Pending, StateChannel, StatePump, StateSender, StateSource};
pub use state::{ComponentId, ValidationState, ValidationStateComparer};
pub use text::ValidationText;
