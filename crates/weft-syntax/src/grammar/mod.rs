//! Node model: productions, their variants, and the grammar that owns them.
//!
//! A grammar is declared once through [`GrammarBuilder`] and then frozen.
//! Productions and variants live in flat tables and are addressed by
//! [`ProductionId`] and [`VariantId`]; everything the engine needs per
//! variant (lookahead set, left-recursion flag, delegate edge, postcondition)
//! is derived during [`GrammarBuilder::build`].

mod builder;
mod lookahead;
mod par_ser;

pub use builder::{GrammarBuilder, VariantHandle};
pub use lookahead::{CharSet, Lookahead};
pub use par_ser::{ContentPattern, ParSer};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::intermediates::Intermediates;
use crate::postcondition::Postcondition;

/// Identifies a production (a grammar nonterminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(u32);

impl ProductionId {
    /// Creates an id from its table index.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The table index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a variant (one alternative of a production).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantId(u32);

impl VariantId {
    /// Creates an id from its table index.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The table index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a variant builds a leaf or an inner node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeShape {
    /// Holds a literal string value.
    Leaf,
    /// Holds an ordered list of children.
    Inner,
}

/// Turns a raw string into text the variant's grammar accepts, e.g. by
/// quoting and escaping it.
pub type Fitter = fn(&str) -> Option<String>;

/// When an extension parser runs relative to the standard variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionMode {
    /// Try the extension first, then fall back to the standard variants.
    Before,
    /// Only the extension is tried.
    Instead,
}

/// A non-standard parser attached to a production.
#[derive(Debug, Clone)]
pub struct Extension {
    /// The replacement parser.
    pub parser: ParSer,
    /// Ordering relative to the standard variants.
    pub mode: ExtensionMode,
}

/// Problems found while declaring or freezing a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// A content pattern failed to compile.
    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern {
        /// The pattern source.
        pattern: SmolStr,
        /// Compiler message.
        message: String,
    },
    /// A body refers to a production id that was never declared.
    #[error("variant '{variant}' refers to undeclared production #{production}")]
    UnknownProduction {
        /// Qualified variant name.
        variant: SmolStr,
        /// The raw id.
        production: u32,
    },
    /// A postcondition, pseudo-root, or other declaration names a variant id
    /// that was never declared.
    #[error("undeclared variant #{0}")]
    UnknownVariant(u32),
    /// A production was declared without variants.
    #[error("production '{0}' has no variants")]
    EmptyProduction(SmolStr),
    /// Two productions, or two variants of one production, share a name.
    #[error("duplicate name '{0}'")]
    DuplicateName(SmolStr),
    /// A glue combinator holds something other than tokens or patterns.
    #[error("variant '{0}' glues a part that is not a token or pattern")]
    InvalidGlue(SmolStr),
    /// The designated pseudo-root is not an inner variant.
    #[error("pseudo-root '{0}' must be an inner variant")]
    InvalidPseudoRoot(SmolStr),
}

/// A grammar nonterminal.
#[derive(Debug)]
pub struct Production {
    pub(crate) name: SmolStr,
    pub(crate) variants: Vec<VariantId>,
    pub(crate) non_standard: bool,
    pub(crate) top_level: bool,
    pub(crate) identifier_wrapper: bool,
    pub(crate) left_recursive: bool,
    pub(crate) opens_with_comment: bool,
    pub(crate) lookahead: Lookahead,
}

impl Production {
    /// The production's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variants in declaration order, which is also the order of choice.
    #[must_use]
    pub fn variants(&self) -> &[VariantId] {
        &self.variants
    }

    /// Non-standard productions only match when extensions are enabled.
    #[must_use]
    pub fn is_non_standard(&self) -> bool {
        self.non_standard
    }

    /// Whether this production is a valid root for a whole parse.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.top_level
    }

    /// Whether this production wraps an identifier.
    #[must_use]
    pub fn is_identifier_wrapper(&self) -> bool {
        self.identifier_wrapper
    }

    /// Whether any variant is left-recursive.
    #[must_use]
    pub fn is_left_recursive(&self) -> bool {
        self.left_recursive
    }

    /// Lookahead of the production as a whole.
    #[must_use]
    pub fn lookahead(&self) -> Lookahead {
        self.lookahead
    }
}

/// One alternative right-hand side of a production.
#[derive(Debug)]
pub struct Variant {
    pub(crate) name: SmolStr,
    pub(crate) qualified_name: SmolStr,
    pub(crate) production: ProductionId,
    pub(crate) body: ParSer,
    pub(crate) shape: NodeShape,
    pub(crate) anon: bool,
    pub(crate) ignorable: bool,
    pub(crate) left_recursive: bool,
    pub(crate) lookahead: Lookahead,
    /// Lookahead when extension parsers may run.
    pub(crate) extended_lookahead: Lookahead,
    pub(crate) delegate: Option<ProductionId>,
    pub(crate) postcondition: Option<Postcondition>,
    pub(crate) fitter: Option<Fitter>,
}

impl Variant {
    /// The variant's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Production.Variant`.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// The owning production.
    #[must_use]
    pub fn production(&self) -> ProductionId {
        self.production
    }

    /// The right-hand side.
    #[must_use]
    pub fn body(&self) -> &ParSer {
        &self.body
    }

    /// Leaf or inner.
    #[must_use]
    pub fn shape(&self) -> NodeShape {
        self.shape
    }

    /// Anonymous variants never materialize a node; their single child
    /// takes their place.
    #[must_use]
    pub fn is_anon(&self) -> bool {
        self.anon
    }

    /// Ignorable variants carry comments; their content does not take part
    /// in structural equality.
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        self.ignorable
    }

    /// Whether the body can call back into its own production without
    /// consuming input first.
    #[must_use]
    pub fn is_left_recursive(&self) -> bool {
        self.left_recursive
    }

    /// Characters that may begin a match.
    #[must_use]
    pub fn lookahead(&self) -> Lookahead {
        self.lookahead
    }

    /// Characters that may begin a match once extension parsers are enabled.
    #[must_use]
    pub fn extended_lookahead(&self) -> Lookahead {
        self.extended_lookahead
    }

    /// The production this variant is a plain wrapper around.
    #[must_use]
    pub fn delegate(&self) -> Option<ProductionId> {
        self.delegate
    }

    /// Check run against the trace right after the variant's `Pop`.
    #[must_use]
    pub fn postcondition(&self) -> Option<Postcondition> {
        self.postcondition
    }

    /// Coercion helper used by force-fitting.
    #[must_use]
    pub fn fitter(&self) -> Option<Fitter> {
        self.fitter
    }
}

/// An immutable, fully analysed grammar.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) productions: Vec<Production>,
    pub(crate) variants: Vec<Variant>,
    pub(crate) production_names: FxHashMap<SmolStr, ProductionId>,
    pub(crate) extensions: FxHashMap<ProductionId, Extension>,
    pub(crate) pseudo_root: Option<VariantId>,
    /// `reach[a][b]`: `b` can be called from `a` without consuming input.
    pub(crate) left_reach: Vec<Vec<bool>>,
    pub(crate) intermediates: Intermediates,
}

impl Grammar {
    /// Starts declaring a grammar.
    #[must_use]
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Looks up a production.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this grammar.
    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.index()]
    }

    /// Looks up a variant.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this grammar.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> &Variant {
        &self.variants[id.index()]
    }

    /// All production ids in declaration order.
    pub fn production_ids(&self) -> impl Iterator<Item = ProductionId> + '_ {
        (0..self.productions.len()).map(|i| ProductionId(i as u32))
    }

    /// All variant ids in declaration order.
    pub fn variant_ids(&self) -> impl Iterator<Item = VariantId> + '_ {
        (0..self.variants.len()).map(|i| VariantId(i as u32))
    }

    /// Finds a production by name.
    #[must_use]
    pub fn production_named(&self, name: &str) -> Option<ProductionId> {
        self.production_names.get(name).copied()
    }

    /// Finds a variant by production and variant name.
    #[must_use]
    pub fn variant_named(&self, production: ProductionId, name: &str) -> Option<VariantId> {
        self.production(production)
            .variants
            .iter()
            .copied()
            .find(|v| self.variant(*v).name == name)
    }

    /// Productions that are valid roots for a whole parse.
    pub fn top_level(&self) -> impl Iterator<Item = ProductionId> + '_ {
        self.production_ids()
            .filter(|p| self.production(*p).top_level)
    }

    /// The extension attached to a production, if any.
    #[must_use]
    pub fn extension(&self, production: ProductionId) -> Option<&Extension> {
        self.extensions.get(&production)
    }

    /// The inner variant that aggregates multiple roots of a trace.
    #[must_use]
    pub fn pseudo_root(&self) -> Option<VariantId> {
        self.pseudo_root
    }

    /// Returns `true` when each production can reach the other without
    /// consuming input, i.e. they take part in the same left-recursive cycle.
    #[must_use]
    pub fn same_left_cycle(&self, a: ProductionId, b: ProductionId) -> bool {
        self.left_reach[a.index()][b.index()] && self.left_reach[b.index()][a.index()]
    }

    /// Delegate-path cache used to coerce nodes into outer productions.
    #[must_use]
    pub fn intermediates(&self) -> &Intermediates {
        &self.intermediates
    }
}
