//! Property-based invariant tests for observables.
//!
//! Verifies:
//! 1. Version counts exactly the sets that changed the value
//! 2. Subscribers see exactly the distinct consecutive values, in order
//! 3. A released subscription never fires again

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use rxv_reactive::Observable;

proptest! {
    #[test]
    fn version_counts_changes(values in prop::collection::vec(0u8..4, 0..32)) {
        let obs = Observable::new(0u8);
        let mut expected = 0u64;
        let mut current = 0u8;
        for value in values {
            if value != current {
                expected += 1;
                current = value;
            }
            obs.set(value);
        }
        prop_assert_eq!(obs.version(), expected);
        prop_assert_eq!(obs.get(), current);
    }

    #[test]
    fn watchers_see_distinct_values(values in prop::collection::vec(0u8..4, 0..32)) {
        let obs = Observable::new(0u8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = obs.watch(move |v| s.borrow_mut().push(*v));

        let mut expected = vec![0u8];
        for value in values {
            if expected.last() != Some(&value) {
                expected.push(value);
            }
            obs.set(value);
        }
        prop_assert_eq!(&*seen.borrow(), &expected);
    }

    #[test]
    fn released_subscription_is_silent(
        before in prop::collection::vec(1u8..8, 0..8),
        after in prop::collection::vec(1u8..8, 0..8),
    ) {
        let obs = Observable::new(0u8);
        let hits = Rc::new(RefCell::new(0usize));
        let h = Rc::clone(&hits);
        let mut sub = obs.subscribe(move |_| *h.borrow_mut() += 1);
        for value in before {
            obs.set(value);
        }
        let fired = *hits.borrow();
        sub.unsubscribe();
        for value in after {
            obs.set(value.wrapping_add(100));
        }
        prop_assert_eq!(*hits.borrow(), fired);
        prop_assert_eq!(obs.subscriber_count(), 0);
    }
}
