//! Grammar registration and the analysis run once when it is frozen.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use super::{
    CharSet, Extension, ExtensionMode, Fitter, Grammar, GrammarError, Lookahead, NodeShape,
    ParSer, Production, ProductionId, Variant, VariantId,
};
use crate::intermediates::Intermediates;
use crate::postcondition::Postcondition;

struct ProductionDecl {
    name: SmolStr,
    variants: Vec<VariantId>,
    non_standard: bool,
    top_level: bool,
    identifier_wrapper: bool,
}

struct VariantDecl {
    name: SmolStr,
    production: ProductionId,
    body: ParSer,
    shape: NodeShape,
    anon: bool,
    ignorable: bool,
    delegate: Option<ProductionId>,
    postcondition: Option<Postcondition>,
    fitter: Option<Fitter>,
}

/// Declares productions and variants, then freezes them into a [`Grammar`].
///
/// Productions are declared first so that bodies can refer to each other
/// by id, including forward and recursive references.
#[derive(Default)]
pub struct GrammarBuilder {
    productions: Vec<ProductionDecl>,
    variants: Vec<VariantDecl>,
    extensions: FxHashMap<ProductionId, Extension>,
    pseudo_root: Option<VariantId>,
}

/// A freshly declared variant, for chaining optional attributes.
pub struct VariantHandle<'b> {
    builder: &'b mut GrammarBuilder,
    id: VariantId,
}

impl VariantHandle<'_> {
    fn decl(&mut self) -> &mut VariantDecl {
        &mut self.builder.variants[self.id.index()]
    }

    /// Marks the variant anonymous: it groups but never builds a node.
    pub fn anon(mut self) -> Self {
        self.decl().anon = true;
        self
    }

    /// Marks the variant's content as ignorable (comments).
    pub fn ignorable(mut self) -> Self {
        self.decl().ignorable = true;
        self
    }

    /// Declares the production this variant wraps. Normally inferred.
    pub fn delegate(mut self, production: ProductionId) -> Self {
        self.decl().delegate = Some(production);
        self
    }

    /// Restricts the variant to traces whose shape passes `postcondition`.
    pub fn postcondition(mut self, postcondition: Postcondition) -> Self {
        self.decl().postcondition = Some(postcondition);
        self
    }

    /// Installs a coercion helper used by force-fitting.
    pub fn fitter(mut self, fitter: Fitter) -> Self {
        self.decl().fitter = Some(fitter);
        self
    }

    /// The id of the declared variant.
    #[must_use]
    pub fn id(self) -> VariantId {
        self.id
    }
}

impl GrammarBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a production.
    pub fn production(&mut self, name: &str) -> ProductionId {
        let id = ProductionId::from_raw(self.productions.len() as u32);
        self.productions.push(ProductionDecl {
            name: name.into(),
            variants: Vec::new(),
            non_standard: false,
            top_level: false,
            identifier_wrapper: false,
        });
        id
    }

    /// Marks a production as a valid root for a whole parse.
    pub fn top_level(&mut self, production: ProductionId) -> &mut Self {
        if let Some(decl) = self.productions.get_mut(production.index()) {
            decl.top_level = true;
        }
        self
    }

    /// Marks a production as non-standard.
    pub fn non_standard(&mut self, production: ProductionId) -> &mut Self {
        if let Some(decl) = self.productions.get_mut(production.index()) {
            decl.non_standard = true;
        }
        self
    }

    /// Marks a production as an identifier wrapper.
    pub fn identifier_wrapper(&mut self, production: ProductionId) -> &mut Self {
        if let Some(decl) = self.productions.get_mut(production.index()) {
            decl.identifier_wrapper = true;
        }
        self
    }

    /// Declares an inner-node variant.
    pub fn inner(&mut self, production: ProductionId, name: &str, body: ParSer) -> VariantHandle<'_> {
        self.variant(production, name, body, NodeShape::Inner)
    }

    /// Declares a leaf variant.
    pub fn leaf(&mut self, production: ProductionId, name: &str, body: ParSer) -> VariantHandle<'_> {
        self.variant(production, name, body, NodeShape::Leaf)
    }

    fn variant(
        &mut self,
        production: ProductionId,
        name: &str,
        body: ParSer,
        shape: NodeShape,
    ) -> VariantHandle<'_> {
        let id = VariantId::from_raw(self.variants.len() as u32);
        self.variants.push(VariantDecl {
            name: name.into(),
            production,
            body,
            shape,
            anon: false,
            ignorable: false,
            delegate: None,
            postcondition: None,
            fitter: None,
        });
        if let Some(decl) = self.productions.get_mut(production.index()) {
            decl.variants.push(id);
        }
        VariantHandle { builder: self, id }
    }

    /// Attaches a non-standard parser to a production.
    pub fn extension(
        &mut self,
        production: ProductionId,
        parser: ParSer,
        mode: ExtensionMode,
    ) -> &mut Self {
        self.extensions.insert(production, Extension { parser, mode });
        self
    }

    /// Designates the inner variant that aggregates multiple roots.
    pub fn pseudo_root(&mut self, variant: VariantId) -> &mut Self {
        self.pseudo_root = Some(variant);
        self
    }

    /// Validates the declarations and derives the tables the engine needs.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for dangling references, empty or duplicate
    /// declarations, malformed glue, or an unusable pseudo-root.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        self.validate()?;

        let count = self.productions.len();
        let lookaheads = production_lookaheads(&self, false);
        let extended_lookaheads = production_lookaheads(&self, true);
        let nullable: Vec<bool> = lookaheads.iter().map(|l| l.nullable).collect();

        let leftmost: Vec<Vec<ProductionId>> = self
            .variants
            .iter()
            .map(|v| {
                let mut refs = Vec::new();
                leftmost_refs(&v.body, &nullable, &mut refs);
                refs
            })
            .collect();
        let mut reach = vec![vec![false; count]; count];
        for (decl, refs) in self.variants.iter().zip(&leftmost) {
            for target in refs {
                reach[decl.production.index()][target.index()] = true;
            }
        }
        for k in 0..count {
            for i in 0..count {
                if reach[i][k] {
                    for j in 0..count {
                        if reach[k][j] {
                            reach[i][j] = true;
                        }
                    }
                }
            }
        }

        let mut direct_comment = vec![false; count];
        for decl in &self.variants {
            if leads_with_comment(&decl.body, &nullable) {
                direct_comment[decl.production.index()] = true;
            }
        }

        let variants: Vec<Variant> = self
            .variants
            .into_iter()
            .zip(leftmost)
            .map(|(decl, refs)| {
                let owner = decl.production;
                let left_recursive = refs
                    .iter()
                    .any(|q| *q == owner || reach[q.index()][owner.index()]);
                let lookahead = body_lookahead(&decl.body, &lookaheads);
                let extended_lookahead = body_lookahead(&decl.body, &extended_lookaheads);
                let delegate = decl.delegate.or_else(|| inferred_delegate(&decl));
                let qualified_name =
                    SmolStr::from(format!("{}.{}", self.productions[owner.index()].name, decl.name));
                Variant {
                    name: decl.name,
                    qualified_name,
                    production: owner,
                    body: decl.body,
                    shape: decl.shape,
                    anon: decl.anon,
                    ignorable: decl.ignorable,
                    left_recursive,
                    lookahead,
                    extended_lookahead,
                    delegate,
                    postcondition: decl.postcondition,
                    fitter: decl.fitter,
                }
            })
            .collect();

        let productions: Vec<Production> = self
            .productions
            .into_iter()
            .enumerate()
            .map(|(i, decl)| Production {
                left_recursive: decl.variants.iter().any(|v| variants[v.index()].left_recursive),
                opens_with_comment: direct_comment[i]
                    || (0..count).any(|j| reach[i][j] && direct_comment[j]),
                lookahead: lookaheads[i],
                name: decl.name,
                variants: decl.variants,
                non_standard: decl.non_standard,
                top_level: decl.top_level,
                identifier_wrapper: decl.identifier_wrapper,
            })
            .collect();

        let production_names = productions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), ProductionId::from_raw(i as u32)))
            .collect();

        debug!(
            productions = productions.len(),
            variants = variants.len(),
            left_recursive = productions.iter().filter(|p| p.left_recursive).count(),
            "grammar built"
        );

        Ok(Grammar {
            productions,
            variants,
            production_names,
            extensions: self.extensions,
            pseudo_root: self.pseudo_root,
            left_reach: reach,
            intermediates: Intermediates::default(),
        })
    }

    fn validate(&self) -> Result<(), GrammarError> {
        let mut names = FxHashMap::default();
        for decl in &self.productions {
            if names.insert(decl.name.clone(), ()).is_some() {
                return Err(GrammarError::DuplicateName(decl.name.clone()));
            }
            if decl.variants.is_empty() {
                return Err(GrammarError::EmptyProduction(decl.name.clone()));
            }
            let mut variant_names = FxHashMap::default();
            for v in &decl.variants {
                let name = &self.variants[v.index()].name;
                if variant_names.insert(name.clone(), ()).is_some() {
                    return Err(GrammarError::DuplicateName(
                        format!("{}.{}", decl.name, name).into(),
                    ));
                }
            }
        }

        let known = |p: ProductionId| p.index() < self.productions.len();
        for decl in &self.variants {
            let qualified = || -> SmolStr {
                let owner = self
                    .productions
                    .get(decl.production.index())
                    .map_or("?", |p| p.name.as_str());
                format!("{owner}.{}", decl.name).into()
            };
            if !known(decl.production) {
                return Err(GrammarError::UnknownProduction {
                    variant: qualified(),
                    production: decl.production.raw(),
                });
            }
            let mut unknown = None;
            decl.body.for_each_ref(&mut |p| {
                if !known(p) && unknown.is_none() {
                    unknown = Some(p);
                }
            });
            if let Some(p) = unknown.or(decl.delegate.filter(|p| !known(*p))) {
                return Err(GrammarError::UnknownProduction {
                    variant: qualified(),
                    production: p.raw(),
                });
            }
            if !glue_is_valid(&decl.body) {
                return Err(GrammarError::InvalidGlue(qualified()));
            }
            if let Some(postcondition) = decl.postcondition {
                let target = postcondition.variant();
                if target.index() >= self.variants.len() {
                    return Err(GrammarError::UnknownVariant(target.raw()));
                }
            }
        }

        for (production, extension) in &self.extensions {
            let mut unknown = None;
            extension.parser.for_each_ref(&mut |p| {
                if !known(p) {
                    unknown = Some(p);
                }
            });
            if let Some(p) = unknown.or(Some(*production).filter(|p| !known(*p))) {
                return Err(GrammarError::UnknownProduction {
                    variant: "<extension>".into(),
                    production: p.raw(),
                });
            }
        }

        if let Some(root) = self.pseudo_root {
            let decl = self
                .variants
                .get(root.index())
                .ok_or(GrammarError::UnknownVariant(root.raw()))?;
            if decl.shape != NodeShape::Inner || decl.anon {
                return Err(GrammarError::InvalidPseudoRoot(decl.name.clone()));
            }
        }
        Ok(())
    }
}

fn glue_is_valid(parser: &ParSer) -> bool {
    match parser {
        ParSer::Glue(parts) => !parts.is_empty() && parts.iter().all(ParSer::is_token_level),
        ParSer::Seq(parts) | ParSer::Alt(parts) => parts.iter().all(glue_is_valid),
        ParSer::Repeat { body, .. } | ParSer::Optional(body) => glue_is_valid(body),
        ParSer::Lookahead { body, .. } => glue_is_valid(body),
        _ => true,
    }
}

/// Least fixpoint of every production's lookahead, nullability included.
///
/// With `extensions`, each extension parser counts as one more alternative of
/// its production (the only one, for `ExtensionMode::Instead`).
fn production_lookaheads(builder: &GrammarBuilder, extensions: bool) -> Vec<Lookahead> {
    let mut table = vec![Lookahead::NONE; builder.productions.len()];
    loop {
        let mut changed = false;
        for (i, decl) in builder.productions.iter().enumerate() {
            let standard = || {
                decl.variants
                    .iter()
                    .map(|v| body_lookahead(&builder.variants[v.index()].body, &table))
                    .fold(Lookahead::NONE, Lookahead::either)
            };
            let extension = extensions
                .then(|| builder.extensions.get(&ProductionId::from_raw(i as u32)))
                .flatten();
            let next = match extension {
                Some(ext) if ext.mode == ExtensionMode::Instead => body_lookahead(&ext.parser, &table),
                Some(ext) => standard().either(body_lookahead(&ext.parser, &table)),
                None => standard(),
            };
            if next != table[i] {
                table[i] = next;
                changed = true;
            }
        }
        if !changed {
            return table;
        }
    }
}

const UNPREDICTABLE: Lookahead = Lookahead {
    first: CharSet::empty(),
    any: true,
    nullable: false,
};

const EMPTY: Lookahead = Lookahead {
    first: CharSet::empty(),
    any: false,
    nullable: true,
};

fn body_lookahead(parser: &ParSer, table: &[Lookahead]) -> Lookahead {
    match parser {
        ParSer::Empty | ParSer::End | ParSer::Lookahead { .. } => EMPTY,
        ParSer::Literal(text) => match text.chars().next() {
            Some(c) => Lookahead {
                first: CharSet::of(&c.to_string()),
                any: false,
                nullable: false,
            },
            None => EMPTY,
        },
        ParSer::Pattern(pattern) => pattern.first().map_or(UNPREDICTABLE, |first| Lookahead {
            first,
            any: false,
            nullable: false,
        }),
        ParSer::Comment(_) => UNPREDICTABLE,
        ParSer::Ref(p) => table.get(p.index()).copied().unwrap_or(UNPREDICTABLE),
        ParSer::Seq(parts) | ParSer::Glue(parts) => {
            let mut acc = EMPTY;
            for part in parts {
                let next = body_lookahead(part, table);
                acc.first = acc.first.union(next.first);
                acc.any |= next.any;
                if !next.nullable {
                    acc.nullable = false;
                    break;
                }
            }
            acc
        }
        ParSer::Alt(alternatives) => alternatives
            .iter()
            .map(|alt| body_lookahead(alt, table))
            .fold(Lookahead::NONE, Lookahead::either),
        ParSer::Repeat { body, min } => {
            let inner = body_lookahead(body, table);
            Lookahead {
                nullable: *min == 0 || inner.nullable,
                ..inner
            }
        }
        ParSer::Optional(body) => Lookahead {
            nullable: true,
            ..body_lookahead(body, table)
        },
    }
}

fn is_nullable(parser: &ParSer, nullable: &[bool]) -> bool {
    match parser {
        ParSer::Empty | ParSer::End | ParSer::Lookahead { .. } | ParSer::Optional(_) => true,
        ParSer::Literal(text) => text.is_empty(),
        ParSer::Pattern(_) | ParSer::Comment(_) => false,
        ParSer::Ref(p) => nullable.get(p.index()).copied().unwrap_or(false),
        ParSer::Seq(parts) | ParSer::Glue(parts) => parts.iter().all(|p| is_nullable(p, nullable)),
        ParSer::Alt(alternatives) => alternatives.iter().any(|p| is_nullable(p, nullable)),
        ParSer::Repeat { body, min } => *min == 0 || is_nullable(body, nullable),
    }
}

/// Productions that `parser` may call before consuming any input.
fn leftmost_refs(parser: &ParSer, nullable: &[bool], out: &mut Vec<ProductionId>) {
    match parser {
        ParSer::Ref(p) => out.push(*p),
        ParSer::Seq(parts) | ParSer::Glue(parts) => {
            for part in parts {
                leftmost_refs(part, nullable, out);
                if !is_nullable(part, nullable) {
                    break;
                }
            }
        }
        ParSer::Alt(alternatives) => {
            for alt in alternatives {
                leftmost_refs(alt, nullable, out);
            }
        }
        ParSer::Repeat { body, .. } | ParSer::Optional(body) => leftmost_refs(body, nullable, out),
        ParSer::Lookahead { body, .. } => leftmost_refs(body, nullable, out),
        ParSer::Empty
        | ParSer::Literal(_)
        | ParSer::Pattern(_)
        | ParSer::Comment(_)
        | ParSer::End => {}
    }
}

fn leads_with_comment(parser: &ParSer, nullable: &[bool]) -> bool {
    match parser {
        ParSer::Comment(_) => true,
        ParSer::Seq(parts) => {
            for part in parts {
                if leads_with_comment(part, nullable) {
                    return true;
                }
                if !is_nullable(part, nullable) {
                    return false;
                }
            }
            false
        }
        ParSer::Alt(alternatives) => alternatives.iter().any(|p| leads_with_comment(p, nullable)),
        ParSer::Repeat { body, .. } | ParSer::Optional(body) => leads_with_comment(body, nullable),
        _ => false,
    }
}

/// An inner variant whose body is one reference plus literal tokens wraps
/// that production.
fn inferred_delegate(decl: &VariantDecl) -> Option<ProductionId> {
    if decl.shape != NodeShape::Inner || decl.ignorable {
        return None;
    }
    match &decl.body {
        ParSer::Ref(p) => Some(*p),
        ParSer::Seq(parts) => {
            let mut target = None;
            for part in parts {
                match part {
                    ParSer::Literal(_) => {}
                    ParSer::Ref(p) if target.is_none() => target = Some(*p),
                    _ => return None,
                }
            }
            target
        }
        _ => None,
    }
}
