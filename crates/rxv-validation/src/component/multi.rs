#![forbid(unsafe_code)]

//! Predicate rules spanning several properties.

use std::rc::Rc;

use rxv_reactive::Observable;

use super::{RuleCore, RuleMessage, RuleOutcome, delegate_to_core};
use crate::error::Result;

/// Validates a relationship between two or three properties.
///
/// The rule covers every input property: `contains_property(name, false)`
/// matches any of them, while `contains_property(name, true)` never does
/// because the rule does not cover a single property on its own.
///
/// The predicate re-runs whenever any input changes. The message closure
/// receives a tuple of the current input values.
#[derive(Debug)]
pub struct MultiPropertyRule {
    core: RuleCore,
}

impl MultiPropertyRule {
    /// Rule over two properties.
    ///
    /// # Errors
    ///
    /// [`InvalidArgument`](crate::ValidationError::InvalidArgument) if a
    /// name is blank or both names are the same.
    pub fn new2<A, B>(
        (first, first_name): (&Observable<A>, &str),
        (second, second_name): (&Observable<B>, &str),
        predicate: impl Fn(&A, &B) -> bool + 'static,
        message: impl Into<RuleMessage<(A, B)>>,
    ) -> Result<Self>
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let core = RuleCore::new(vec![first_name.to_string(), second_name.to_string()])?;
        let message = message.into();
        let shared = core.shared();
        let (a, b) = (first.clone(), second.clone());
        let evaluate = Rc::new(move || {
            let values = (a.get(), b.get());
            shared.evaluate(|| {
                if predicate(&values.0, &values.1) {
                    RuleOutcome::valid()
                } else {
                    RuleOutcome::invalid(message.render(&values))
                }
            });
        });

        evaluate();
        let on_first = Rc::clone(&evaluate);
        core.attach(first.subscribe(move |_| on_first()));
        core.attach(second.subscribe(move |_| evaluate()));
        Ok(Self { core })
    }

    /// Rule over three properties.
    ///
    /// # Errors
    ///
    /// [`InvalidArgument`](crate::ValidationError::InvalidArgument) if a
    /// name is blank or repeated.
    pub fn new3<A, B, C>(
        (first, first_name): (&Observable<A>, &str),
        (second, second_name): (&Observable<B>, &str),
        (third, third_name): (&Observable<C>, &str),
        predicate: impl Fn(&A, &B, &C) -> bool + 'static,
        message: impl Into<RuleMessage<(A, B, C)>>,
    ) -> Result<Self>
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
        C: Clone + PartialEq + 'static,
    {
        let core = RuleCore::new(vec![
            first_name.to_string(),
            second_name.to_string(),
            third_name.to_string(),
        ])?;
        let message = message.into();
        let shared = core.shared();
        let (a, b, c) = (first.clone(), second.clone(), third.clone());
        let evaluate = Rc::new(move || {
            let values = (a.get(), b.get(), c.get());
            shared.evaluate(|| {
                if predicate(&values.0, &values.1, &values.2) {
                    RuleOutcome::valid()
                } else {
                    RuleOutcome::invalid(message.render(&values))
                }
            });
        });

        evaluate();
        let on_first = Rc::clone(&evaluate);
        let on_second = Rc::clone(&evaluate);
        core.attach(first.subscribe(move |_| on_first()));
        core.attach(second.subscribe(move |_| on_second()));
        core.attach(third.subscribe(move |_| evaluate()));
        Ok(Self { core })
    }
}

delegate_to_core!(MultiPropertyRule);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ValidationComponent;
    use crate::error::ValidationError;
    use crate::text::ValidationText;

    fn passwords_match(
        password: &Observable<String>,
        confirm: &Observable<String>,
    ) -> MultiPropertyRule {
        MultiPropertyRule::new2(
            (password, "Password"),
            (confirm, "ConfirmPassword"),
            |p: &String, c: &String| p == c,
            "Passwords must match.",
        )
        .expect("valid rule")
    }

    #[test]
    fn tracks_both_inputs() {
        let password = Observable::new(String::from("x"));
        let confirm = Observable::new(String::from("y"));
        let rule = passwords_match(&password, &confirm);
        assert!(!rule.is_valid());
        assert_eq!(rule.text(), ValidationText::single("Passwords must match."));

        confirm.set("x".into());
        assert!(rule.is_valid());

        password.set("z".into());
        assert!(!rule.is_valid());
    }

    #[test]
    fn covers_all_inputs_but_none_exclusively() {
        let password = Observable::new(String::new());
        let confirm = Observable::new(String::new());
        let rule = passwords_match(&password, &confirm);
        assert_eq!(rule.property_count(), 2);
        assert!(rule.contains_property("Password", false));
        assert!(rule.contains_property("ConfirmPassword", false));
        assert!(!rule.contains_property("Password", true));
    }

    #[test]
    fn same_name_twice_rejected() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let result = MultiPropertyRule::new2((&a, "A"), (&b, "A"), |x: &i32, y: &i32| x < y, "x");
        assert!(matches!(
            result,
            Err(ValidationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn three_inputs_with_computed_message() {
        let min = Observable::new(1);
        let value = Observable::new(5);
        let max = Observable::new(3);
        let rule = MultiPropertyRule::new3(
            (&min, "Min"),
            (&value, "Value"),
            (&max, "Max"),
            |lo: &i32, v: &i32, hi: &i32| lo <= v && v <= hi,
            RuleMessage::computed(|(lo, v, hi): &(i32, i32, i32)| {
                format!("{v} is outside {lo}..={hi}.")
            }),
        )
        .expect("valid rule");
        assert_eq!(rule.text(), ValidationText::single("5 is outside 1..=3."));

        max.set(10);
        assert!(rule.is_valid());
    }

    #[test]
    fn dispose_releases_every_input() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let rule =
            MultiPropertyRule::new2((&a, "A"), (&b, "B"), |x: &i32, y: &i32| x < y, "A < B");
        let rule = rule.expect("valid rule");
        assert_eq!(a.subscriber_count(), 1);
        rule.dispose();
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 0);
    }
}
