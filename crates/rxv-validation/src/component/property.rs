#![forbid(unsafe_code)]

//! Predicate rule over a single observable property.

use std::rc::Rc;

use rxv_reactive::Observable;

use super::{RuleCore, RuleMessage, RuleOutcome, RuleShared, delegate_to_core};
use crate::error::Result;

/// Validates one property with a synchronous predicate.
///
/// The predicate runs once at construction and again on every change of the
/// property, so the rule's state is never stale.
///
/// # Example
///
/// ```
/// use rxv_reactive::Observable;
/// use rxv_validation::component::{PropertyRule, ValidationComponent};
///
/// let user_name = Observable::new(String::new());
/// let rule = PropertyRule::new(
///     &user_name,
///     "UserName",
///     |name: &String| !name.trim().is_empty(),
///     "UserName is required.",
/// )
/// .unwrap();
/// assert!(!rule.is_valid());
///
/// user_name.set("Bob".into());
/// assert!(rule.is_valid());
/// ```
#[derive(Debug)]
pub struct PropertyRule {
    core: RuleCore,
}

impl PropertyRule {
    /// Create a rule named after `property_name`, bound to `property`.
    ///
    /// # Errors
    ///
    /// [`InvalidArgument`](crate::ValidationError::InvalidArgument) if the
    /// property name is blank.
    pub fn new<T>(
        property: &Observable<T>,
        property_name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + 'static,
        message: impl Into<RuleMessage<T>>,
    ) -> Result<Self>
    where
        T: Clone + PartialEq + 'static,
    {
        let core = RuleCore::new(vec![property_name.into()])?;
        let message = message.into();
        let evaluate = Rc::new(move |shared: &RuleShared, value: &T| {
            shared.evaluate(|| {
                if predicate(value) {
                    RuleOutcome::valid()
                } else {
                    RuleOutcome::invalid(message.render(value))
                }
            });
        });

        let shared = core.shared();
        evaluate(&*shared, &property.get());

        let on_change = Rc::clone(&evaluate);
        core.attach(property.subscribe(move |value| on_change(&*shared, value)));
        Ok(Self { core })
    }
}

delegate_to_core!(PropertyRule);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ClaimMode, ValidationComponent};
    use crate::text::ValidationText;
    use std::cell::RefCell;

    fn required(property: &Observable<String>) -> PropertyRule {
        PropertyRule::new(
            property,
            "UserName",
            |v: &String| !v.trim().is_empty(),
            "UserName is required.",
        )
        .expect("valid rule")
    }

    #[test]
    fn evaluates_on_construction() {
        let name = Observable::new(String::from("   "));
        let rule = required(&name);
        assert!(!rule.is_valid());
        assert_eq!(rule.text(), ValidationText::single("UserName is required."));
    }

    #[test]
    fn reevaluates_on_change() {
        let name = Observable::new(String::new());
        let rule = required(&name);

        name.set("Bob".into());
        assert!(rule.is_valid());
        assert_eq!(rule.text(), ValidationText::NONE);

        name.set(String::new());
        assert!(!rule.is_valid());
    }

    #[test]
    fn computed_message_sees_rejected_value() {
        let password = Observable::new(String::from("ab"));
        let rule = PropertyRule::new(
            &password,
            "Password",
            |p: &String| p.len() > 2,
            RuleMessage::computed(|p: &String| {
                format!("Password must be longer than 2 characters, got {}.", p.len())
            }),
        )
        .expect("valid rule");
        assert!(rule.text().contains("got 2"));
    }

    #[test]
    fn distinct_states_only() {
        let name = Observable::new(String::new());
        let rule = required(&name);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = rule
            .changes()
            .subscribe(move |s| l.borrow_mut().push(s.is_valid()));

        name.set("a".into());
        name.set("ab".into());
        name.set("abc".into());
        name.set(String::new());
        assert_eq!(*log.borrow(), vec![true, false]);
    }

    #[test]
    fn dispose_stops_evaluation() {
        let name = Observable::new(String::new());
        let rule = required(&name);
        rule.dispose();
        name.set("Bob".into());
        assert!(!rule.is_valid());
        assert_eq!(name.subscriber_count(), 0);
    }

    #[test]
    fn property_coverage() {
        let name = Observable::new(String::new());
        let rule = required(&name).exclusive();
        assert_eq!(rule.property_count(), 1);
        assert!(rule.contains_property("UserName", true));
        assert!(!rule.contains_property("Password", false));
        assert_eq!(rule.claim(), ClaimMode::Exclusive);
    }

    #[test]
    fn blank_name_is_invalid_argument() {
        let name = Observable::new(String::new());
        let result = PropertyRule::new(&name, "", |_: &String| true, "unused");
        assert!(result.is_err());
    }

    #[test]
    fn panicking_predicate_is_isolated() {
        let value = Observable::new(0u32);
        let rule = PropertyRule::new(
            &value,
            "Count",
            |v: &u32| {
                assert!(*v < 10, "count overflow");
                true
            },
            "unused",
        )
        .expect("valid rule")
        .with_failure_text("Count could not be checked.");

        assert!(rule.is_valid());
        value.set(11);
        assert!(!rule.is_valid());
        assert_eq!(rule.text(), ValidationText::single("Count could not be checked."));

        value.set(1);
        assert!(rule.is_valid());
    }
}
