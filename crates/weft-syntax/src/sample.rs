//! A small expression language exercising every engine feature.
//!
//! ```text
//! Script     := Statement (";" Statement)* ";"?
//! Statement  := DocComment Expr | Invocation &(";" | END) | Shift
//! Shift      := Shift "<<" Expr | Shift ">>" Expr | Expr
//! Expr       := Expr AddOp Term | Term
//! Term       := Term MulOp Factor | Factor
//! Factor     := Number | StringLit | Identifier "(" args ")" | Identifier | "(" Expr ")"
//! Invocation := Factor                  -- only when the factor is a call
//! Template   := "$" Identifier          -- non-standard, extends Factor
//! Fragments  := (Statement ";"?)*       -- non-standard, pseudo-root
//! ```
//!
//! `<<` and `>>` are glued: `> >` is two tokens and does not shift.
//! Parentheses get a node of their own, since a tree keeps no tokens and an
//! anonymous group could not print them back.

use crate::grammar::{
    CharSet, ExtensionMode, Grammar, GrammarBuilder, GrammarError, ParSer, ProductionId, VariantId,
};
use crate::postcondition::Postcondition;

/// The sample grammar plus handles to its productions and variants.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct SampleGrammar {
    pub grammar: Grammar,
    pub script: ProductionId,
    pub statement: ProductionId,
    pub shift: ProductionId,
    pub expr: ProductionId,
    pub term: ProductionId,
    pub factor: ProductionId,
    pub number: ProductionId,
    pub string: ProductionId,
    pub identifier: ProductionId,
    pub invocation: ProductionId,
    pub doc_comment: ProductionId,
    pub template: ProductionId,
    pub fragments: ProductionId,
    pub add: VariantId,
    pub mul: VariantId,
    pub call: VariantId,
    pub paren: VariantId,
    pub plain: VariantId,
    pub int: VariantId,
}

fn quote(raw: &str) -> Option<String> {
    (!raw.contains('"')).then(|| format!("\"{raw}\""))
}

/// Builds the sample grammar.
///
/// # Errors
///
/// Only if a pattern fails to compile, which would be a bug here.
pub fn arithmetic() -> Result<SampleGrammar, GrammarError> {
    let mut b = GrammarBuilder::new();
    let script = b.production("Script");
    let statement = b.production("Statement");
    let shift = b.production("Shift");
    let expr = b.production("Expr");
    let add_op = b.production("AddOp");
    let term = b.production("Term");
    let mul_op = b.production("MulOp");
    let factor = b.production("Factor");
    let number = b.production("Number");
    let string = b.production("StringLit");
    let identifier = b.production("Identifier");
    let invocation = b.production("Invocation");
    let doc_comment = b.production("DocComment");
    let template = b.production("Template");
    let fragments = b.production("Fragments");
    b.top_level(script)
        .identifier_wrapper(identifier)
        .non_standard(template)
        .non_standard(fragments);

    b.inner(
        script,
        "Statements",
        ParSer::seq([
            ParSer::r(statement),
            ParSer::seq([ParSer::lit(";"), ParSer::r(statement)]).star(),
            ParSer::lit(";").opt(),
        ]),
    );

    b.inner(statement, "Documented", ParSer::seq([ParSer::r(doc_comment), ParSer::r(expr)]));
    b.inner(
        statement,
        "Call",
        ParSer::seq([
            ParSer::r(invocation),
            ParSer::alt([ParSer::lit(";"), ParSer::End]).followed_by(),
        ]),
    );
    let plain = b.inner(statement, "Plain", ParSer::r(shift)).id();

    b.inner(
        shift,
        "Left",
        ParSer::seq([ParSer::r(shift), ParSer::glue([ParSer::lit("<"), ParSer::lit("<")]), ParSer::r(expr)]),
    );
    b.inner(
        shift,
        "Right",
        ParSer::seq([ParSer::r(shift), ParSer::glue([ParSer::lit(">"), ParSer::lit(">")]), ParSer::r(expr)]),
    );
    b.inner(shift, "Expr", ParSer::r(expr)).anon();

    let add = b
        .inner(expr, "Add", ParSer::seq([ParSer::r(expr), ParSer::r(add_op), ParSer::r(term)]))
        .id();
    b.inner(expr, "Term", ParSer::r(term)).anon();
    b.leaf(add_op, "Op", ParSer::pattern_starting("[+-]", CharSet::of("+-"))?);

    let mul = b
        .inner(term, "Mul", ParSer::seq([ParSer::r(term), ParSer::r(mul_op), ParSer::r(factor)]))
        .id();
    b.inner(term, "Factor", ParSer::r(factor)).anon();
    b.leaf(mul_op, "Op", ParSer::pattern_starting("[*/%]", CharSet::of("*/%"))?);

    b.inner(factor, "Number", ParSer::r(number)).anon();
    b.inner(factor, "Str", ParSer::r(string)).anon();
    let call = b
        .inner(
            factor,
            "Call",
            ParSer::seq([
                ParSer::r(identifier),
                ParSer::lit("("),
                ParSer::seq([ParSer::r(expr), ParSer::seq([ParSer::lit(","), ParSer::r(expr)]).star()]).opt(),
                ParSer::lit(")"),
            ]),
        )
        .id();
    b.inner(factor, "Ident", ParSer::r(identifier)).anon();
    let paren = b
        .inner(factor, "Paren", ParSer::seq([ParSer::lit("("), ParSer::r(expr), ParSer::lit(")")]))
        .id();
    b.extension(factor, ParSer::r(template), ExtensionMode::Before);

    let int = b
        .leaf(number, "Int", ParSer::pattern_starting("[0-9]+", CharSet::range('0', '9'))?)
        .id();
    b.leaf(string, "Quoted", ParSer::pattern_starting(r#""[^"]*""#, CharSet::of("\""))?)
        .fitter(quote);
    let letters = CharSet::range('a', 'z')
        .union(CharSet::range('A', 'Z'))
        .union(CharSet::of("_"));
    b.leaf(
        identifier,
        "Name",
        ParSer::pattern_starting("[A-Za-z_][A-Za-z0-9_]*", letters)?,
    );

    b.inner(invocation, "Call", ParSer::r(factor))
        .postcondition(Postcondition::new(1, call));
    b.leaf(doc_comment, "Doc", ParSer::comment(r"(?s)/\*\*.*?\*/")?)
        .ignorable();

    b.inner(template, "Var", ParSer::seq([ParSer::lit("$"), ParSer::r(identifier)]));
    let items = b
        .inner(
            fragments,
            "Items",
            ParSer::seq([ParSer::r(statement), ParSer::lit(";").opt()]).star(),
        )
        .id();
    b.pseudo_root(items);

    Ok(SampleGrammar {
        grammar: b.build()?,
        script,
        statement,
        shift,
        expr,
        term,
        factor,
        number,
        string,
        identifier,
        invocation,
        doc_comment,
        template,
        fragments,
        add,
        mul,
        call,
        paren,
        plain,
        int,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_flags() {
        let s = arithmetic().expect("sample grammar");
        let g = &s.grammar;
        assert!(g.production(s.expr).is_left_recursive());
        assert!(g.production(s.shift).is_left_recursive());
        assert!(!g.production(s.factor).is_left_recursive());
        assert!(g.variant(s.add).is_left_recursive());
        assert!(!g.variant(s.call).is_left_recursive());
        assert_eq!(g.variant(s.plain).delegate(), Some(s.shift));
        assert_eq!(g.variant(s.paren).delegate(), Some(s.expr));
        assert!(!g.variant(s.paren).is_anon());
        assert_eq!(g.top_level().collect::<Vec<_>>(), vec![s.script]);
        assert!(g.production(s.template).is_non_standard());
    }
}
