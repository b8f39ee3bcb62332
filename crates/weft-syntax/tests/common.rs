//! Shared helpers for engine integration tests.
#![allow(dead_code, unused_imports)]

pub use weft_syntax::sample::{arithmetic, SampleGrammar};
pub use weft_syntax::{sexpr, Engine, Grammar, GrammarBuilder, Node, ParSer, ProductionId, VariantId};

/// `E := E '+' T | T`, `T := [0-9]+`.
pub struct Additive {
    pub grammar: Grammar,
    pub e: ProductionId,
    pub t: ProductionId,
    pub add: VariantId,
    pub num: VariantId,
}

pub fn additive() -> Additive {
    let mut b = GrammarBuilder::new();
    let e = b.production("E");
    let t = b.production("T");
    let add = b
        .inner(e, "Add", ParSer::seq([ParSer::r(e), ParSer::lit("+"), ParSer::r(t)]))
        .id();
    b.inner(e, "T", ParSer::r(t)).anon();
    let num = b.leaf(t, "Num", ParSer::pattern("[0-9]+").unwrap()).id();
    Additive {
        grammar: b.build().unwrap(),
        e,
        t,
        add,
        num,
    }
}

pub fn sample() -> SampleGrammar {
    arithmetic().expect("sample grammar builds")
}

/// Parses `source` and renders the tree, or the error message.
pub fn parse_sexpr(grammar: &Grammar, production: ProductionId, source: &str) -> String {
    let parse = Engine::new(grammar).parse(production, source).unwrap();
    match parse.tree() {
        Some(tree) => sexpr(grammar, tree),
        None => format!("error: {}", parse.error().unwrap()),
    }
}
