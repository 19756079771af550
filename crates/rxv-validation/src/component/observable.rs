#![forbid(unsafe_code)]

//! Rule whose state comes from an external source.

use std::rc::Rc;

use rxv_reactive::Observable;

use super::{RuleCore, RuleOutcome, RuleResult, delegate_to_core};
use crate::error::Result;
use crate::source::{self, StateSink, StateSource};
use crate::text::ValidationText;

/// Re-emits outcomes produced by a [`StateSource`].
///
/// The rule does no evaluation of its own. It starts valid and takes on
/// each item the source delivers, so whatever arrives last is what the rule
/// reports. Source errors are shown as the failure text.
///
/// A rule may cover any number of properties, including none (a model-level
/// check).
#[derive(Debug)]
pub struct ObservableRule {
    core: RuleCore,
}

impl ObservableRule {
    /// Create a rule covering `properties`, fed by `source`.
    ///
    /// # Errors
    ///
    /// [`InvalidArgument`](crate::ValidationError::InvalidArgument) if a
    /// property name is blank or repeated.
    pub fn new<I, S>(properties: I, source: impl StateSource) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let core = RuleCore::new(properties.into_iter().map(Into::into).collect())?;
        let shared = core.shared();
        let sink: StateSink = Rc::new(move |result: RuleResult| shared.publish_result(result));
        core.attach(source.connect(sink));
        Ok(Self { core })
    }

    /// Rule following a boolean observable, showing `message` while false.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_validity<I, S>(
        properties: I,
        validity: &Observable<bool>,
        message: impl Into<ValidationText>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let message = message.into();
        Self::new(
            properties,
            source::map(validity, move |valid| {
                RuleOutcome::check(*valid, message.clone())
            }),
        )
    }
}

delegate_to_core!(ObservableRule);
