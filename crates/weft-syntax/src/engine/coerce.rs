//! Fitting values that do not already conform.

use tracing::debug;

use super::Engine;
use crate::grammar::ProductionId;
use crate::tree::{Node, ShapeError, TreeError};

impl Engine<'_> {
    /// Coerces a raw string into a node of `production`.
    ///
    /// The string is parsed as is first. Failing that, each variant's fitter
    /// gets a chance to rewrite it (quoting a string literal, for example)
    /// and the rewrite is parsed instead. The resulting node carries no
    /// source positions, since it did not come from source text.
    pub fn force_fit(&self, production: ProductionId, raw: &str) -> Result<Option<Node>, TreeError> {
        if let Some(tree) = self.parse(production, raw)?.into_tree() {
            return Ok(Some(tree.without_positions()));
        }
        let grammar = self.grammar();
        for variant in grammar.production(production).variants() {
            let Some(fitted) = grammar.variant(*variant).fitter().and_then(|fit| fit(raw)) else {
                continue;
            };
            if let Some(tree) = self.parse(production, &fitted)?.into_tree() {
                debug!(
                    variant = grammar.variant(*variant).qualified_name(),
                    raw, %fitted, "value fitted"
                );
                return Ok(Some(tree.without_positions()));
            }
        }
        Ok(None)
    }

    /// Wraps `node` in the intermediate nodes that make it a `production`.
    /// Returns `None` when no delegate path leads there.
    #[must_use]
    pub fn try_to_coerce(&self, node: &Node, production: ProductionId) -> Option<Node> {
        let grammar = self.grammar();
        grammar.intermediates().wrap(grammar, node.clone(), production)
    }

    /// Replaces child `index` of `parent` with `replacement` and returns the
    /// new parent if it is still well-formed. When `replacement` does not
    /// fit as is, it is wrapped into the production of the child it
    /// replaces and checked again.
    ///
    /// `parent` itself is left untouched.
    pub fn check_replacement(
        &self,
        parent: &Node,
        index: usize,
        replacement: &Node,
    ) -> Result<Option<Node>, ShapeError> {
        let children = parent.children();
        let old = children.get(index).ok_or(ShapeError::OutOfRange {
            index,
            len: children.len(),
        })?;
        let mut candidates = vec![replacement.clone()];
        if let Some(wrapped) = self.try_to_coerce(replacement, old.production()) {
            if !wrapped.ptr_eq(replacement) {
                candidates.push(wrapped);
            }
        }
        for child in candidates {
            let mut candidate = parent.clone();
            candidate.replace(index, child)?;
            if self.matches(&candidate, parent.production()) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, GrammarBuilder, ParSer, VariantId};

    struct Fixture {
        grammar: Grammar,
        expr: ProductionId,
        lit: ProductionId,
        add: VariantId,
        num: VariantId,
        text: VariantId,
    }

    fn fixture() -> Fixture {
        let mut b = GrammarBuilder::new();
        let expr = b.production("Expr");
        let lit = b.production("Lit");
        let add = b
            .inner(expr, "Add", ParSer::seq([ParSer::r(lit), ParSer::lit("+"), ParSer::r(lit)]))
            .id();
        b.inner(expr, "Lit", ParSer::r(lit));
        let num = b.leaf(lit, "Num", ParSer::pattern("[0-9]+").expect("pattern")).id();
        let text = b
            .leaf(lit, "Str", ParSer::pattern(r#""[^"]*""#).expect("pattern"))
            .fitter(|raw| (!raw.contains('"')).then(|| format!("\"{raw}\"")))
            .id();
        Fixture {
            grammar: b.build().expect("valid grammar"),
            expr,
            lit,
            add,
            num,
            text,
        }
    }

    #[test]
    fn force_fit_parses_then_quotes() {
        let f = fixture();
        let engine = Engine::new(&f.grammar);

        let direct = engine.force_fit(f.lit, "42").expect("trace").expect("fits");
        assert_eq!(direct.variant(), f.num);
        assert_eq!(direct.source_position(), None);

        let quoted = engine.force_fit(f.lit, "hi there").expect("trace").expect("fits");
        assert_eq!(quoted.variant(), f.text);
        assert_eq!(quoted.value(), Some("\"hi there\""));

        assert!(engine.force_fit(f.lit, "say \"x\"").expect("trace").is_none());
    }

    #[test]
    fn replacement_is_coerced_and_checked() {
        let f = fixture();
        let engine = Engine::new(&f.grammar);
        let one = Node::leaf(&f.grammar, f.num, "1").expect("leaf");
        let sum = Node::inner(&f.grammar, f.add, vec![one.clone(), one]).expect("inner");

        let two = Node::leaf(&f.grammar, f.num, "2").expect("leaf");
        let replaced = engine.check_replacement(&sum, 1, &two).expect("in range").expect("fits");
        assert_eq!(replaced.children()[1].value(), Some("2"));
        assert_eq!(sum.children()[1].value(), Some("1"));

        let bad = Node::leaf(&f.grammar, f.num, "two").expect("leaf");
        assert!(engine.check_replacement(&sum, 1, &bad).expect("in range").is_none());

        let nested = sum.clone();
        assert!(engine.check_replacement(&sum, 0, &nested).expect("in range").is_none());

        assert!(matches!(
            engine.check_replacement(&sum, 5, &two),
            Err(ShapeError::OutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn coercion_wraps_through_delegates() {
        let f = fixture();
        let engine = Engine::new(&f.grammar);
        let one = Node::leaf(&f.grammar, f.num, "1").expect("leaf");
        let wrapped = engine.try_to_coerce(&one, f.expr).expect("path exists");
        assert_eq!(wrapped.production(), f.expr);
        assert_eq!(wrapped.children(), &[one.clone()]);
        assert!(engine.try_to_coerce(&wrapped, f.lit).is_none());
    }
}
