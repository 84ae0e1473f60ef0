#![no_main]

use libfuzzer_sys::fuzz_target;
use mirror::{MutationRecord, ReplayEngine};

const BASE: &str = "<div id=a><span>x</span><!--c-->text<svg><rect/></svg></div><p>p</p>";

fuzz_target!(|data: &[u8]| {
    let Ok(records) = serde_json::from_slice::<Vec<MutationRecord>>(data) else {
        return;
    };
    let mut doc = html::parse_document(BASE);
    let mut engine = ReplayEngine::default();
    for record in &records {
        let _ = engine.apply(&mut doc, record);
    }
    let _ = doc.to_markup();
});
