#![no_main]

use libfuzzer_sys::fuzz_target;
use rxv_validation::{SingleLineFormatter, ValidationText, ValidationTextFormatter};

fuzz_target!(|input: (Vec<Option<String>>, String)| {
    let (messages, separator) = input;
    let kept: Vec<String> = messages.iter().flatten().cloned().collect();
    let text = ValidationText::from_messages(messages);

    match kept.as_slice() {
        [] => assert_eq!(text, ValidationText::NONE),
        [only] if only.is_empty() => assert_eq!(text, ValidationText::EMPTY),
        _ => assert_eq!(text.as_slice(), kept.as_slice()),
    }
    assert_eq!(text.len(), text.iter().count());

    let line = SingleLineFormatter::new(separator.clone()).format(&text);
    assert_eq!(line, kept.join(&separator));

    let merged = ValidationText::merge([&text, &text]);
    assert_eq!(merged.len(), text.len() * 2);
});
