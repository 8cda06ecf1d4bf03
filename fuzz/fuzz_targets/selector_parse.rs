#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(ident) = std::str::from_utf8(data) else {
        return;
    };
    if ident.is_empty() || ident.contains('\0') {
        return;
    }
    let selector = format!("#{}", html::css_escape(ident));
    let parsed = html::Selector::parse(&selector).expect("escaped identifiers always parse");
    let id = parsed.compounds().next().and_then(|c| c.id.clone());
    assert_eq!(id.as_deref(), Some(ident));
});
