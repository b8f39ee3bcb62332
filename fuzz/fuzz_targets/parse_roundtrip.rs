#![no_main]

use libfuzzer_sys::fuzz_target;
use weft_syntax::{build_tree, flatten_tree, sample, Engine};

const MAX_SOURCE_BYTES: usize = 4096;

fn decode_source(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_SOURCE_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

fuzz_target!(|data: &[u8]| {
    let source = decode_source(data);
    let sample = sample::arithmetic().expect("sample grammar");
    let engine = Engine::new(&sample.grammar);

    let parse = engine.parse(sample.script, &source).expect("successful traces build");
    if !parse.ok() {
        return;
    }
    assert_eq!(parse.trace().text(), source, "trace must reproduce its input");

    let Some(tree) = parse.tree() else {
        return;
    };
    let rebuilt = build_tree(&sample.grammar, &flatten_tree(tree, None)).expect("flattened tree rebuilds");
    assert_eq!(&rebuilt, tree);
    assert!(engine.matches(tree, sample.script));

    let unparsed = engine.unparse(tree).expect("parsed trees unparse");
    let reparsed = engine.parse(sample.script, unparsed.text()).expect("trace builds");
    assert_eq!(reparsed.tree(), Some(tree), "unparsed text must give the same tree: {:?}", unparsed.text());
});
