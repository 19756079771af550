#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rxv_reactive::Observable;
use rxv_validation::{ObservableRule, RuleOutcome, ValidationContext};

#[derive(Debug, Arbitrary)]
enum Op {
    Add { property: u8, exclusive: bool, valid: bool },
    Set { index: u8, valid: bool },
    Remove { index: u8 },
}

fuzz_target!(|ops: Vec<Op>| {
    let context = ValidationContext::new();
    let mut live = Vec::new();

    for op in ops.into_iter().take(64) {
        match op {
            Op::Add { property, exclusive, valid } => {
                let source = Observable::new(RuleOutcome::check(valid, format!("P{property}")));
                let Ok(rule) = ObservableRule::new([format!("P{}", property % 8)], source.clone())
                else {
                    continue;
                };
                let rule = if exclusive { rule.exclusive() } else { rule };
                let before = context.len();
                match context.register(rule) {
                    Ok(id) => live.push((id, source)),
                    Err(_) => assert_eq!(context.len(), before),
                }
            }
            Op::Set { index, valid } => {
                if let Some((_, source)) = live.get(usize::from(index) % live.len().max(1)) {
                    source.set(RuleOutcome::check(valid, "changed"));
                }
            }
            Op::Remove { index } => {
                if !live.is_empty() {
                    let (id, _) = live.remove(usize::from(index) % live.len());
                    assert!(context.unregister(id));
                }
            }
        }

        let expected = live.iter().all(|(_, source)| source.get().is_valid);
        assert_eq!(context.current_validity(), expected);
    }

    context.dispose();
    assert!(context.is_empty());
});
