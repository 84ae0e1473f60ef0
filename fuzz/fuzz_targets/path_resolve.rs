#![no_main]

use libfuzzer_sys::fuzz_target;

// Input: markup, a NUL byte, then a path.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (markup, path) = input.split_once('\0').unwrap_or((input, "/html/body"));
    let doc = html::parse_document(markup);
    if let Some(node) = html::resolve_path(&doc, path) {
        if doc.node_type(node) == Some(html::NodeType::DocumentType) {
            return;
        }
        let computed = html::compute_path(&doc, node);
        assert_eq!(html::resolve_path(&doc, &computed), Some(node));
    }
});
