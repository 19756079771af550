#![forbid(unsafe_code)]

//! rxv public facade.
//!
//! Re-exports the observable primitives and the validation engine, plus a
//! [`prelude`] for view-model code.
//!
//! ```
//! use rxv::prelude::*;
//!
//! let user_name = Observable::new(String::new());
//! let context = ValidationContext::new();
//! context
//!     .add_property_rule(&user_name, "UserName", |v: &String| !v.is_empty(), "UserName is required.")
//!     .unwrap();
//! assert_eq!(context.text_for("UserName"), ValidationText::single("UserName is required."));
//! ```

pub use rxv_reactive as reactive;
pub use rxv_validation as validation;

pub use rxv_reactive::{Observable, Signal, Subscription};
pub use rxv_validation::{
    BindingScope, ValidationBinding, ValidationConfig, ValidationContext, ValidationError,
    ValidationState, ValidationText,
};

pub mod prelude {
    //! Everything a view model needs to declare and consume validation.

    pub use rxv_reactive::{Observable, Signal, Subscription};
    pub use rxv_validation::{
        BindingScope, ClaimMode, MultiPropertyRule, ObservableRule, PropertyRule, RuleOutcome,
        SingleLineFormatter, StateChannel, ValidationBinding, ValidationComponent,
        ValidationConfig, ValidationContext, ValidationError, ValidationState, ValidationText,
        ValidationTextFormatter,
    };
}
