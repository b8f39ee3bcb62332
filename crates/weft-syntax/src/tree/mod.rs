//! Syntax tree nodes.
//!
//! Nodes are persistent values: children are shared by reference and a node
//! has no parent link, so a subtree can appear in several trees at once.
//! Mutators are copy-on-write and only copy what is shared.

mod build;
mod dump;
mod flatten;

pub use build::{build_tree, TreeError};
pub use dump::{ascii_tree, sexpr};
pub use flatten::{flatten_tree, Decorator};

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;
use text_size::TextRange;
use thiserror::Error;

use crate::grammar::{Grammar, NodeShape, ProductionId, VariantId};

/// A mutator or constructor was used against the node's shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// Children were requested from a leaf.
    #[error("leaf node has no children")]
    NotInner,
    /// A value was requested from an inner node.
    #[error("inner node has no value")]
    NotLeaf,
    /// A child index is past the end.
    #[error("child index {index} out of range for {len} children")]
    OutOfRange {
        /// The requested index.
        index: usize,
        /// Number of children.
        len: usize,
    },
    /// Anonymous variants never build nodes.
    #[error("anonymous variant cannot build a node")]
    Anonymous,
}

#[derive(Debug, Clone, Copy)]
struct NodeTag {
    variant: VariantId,
    production: ProductionId,
    ignorable: bool,
}

#[derive(Debug, Clone)]
enum NodeBody {
    Leaf(SmolStr),
    Inner(Vec<Node>),
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: NodeTag,
    body: NodeBody,
    position: Option<TextRange>,
}

/// A syntax tree node, tagged by its variant.
///
/// Equality and hashing look at variants, values, and children only. Source
/// positions never take part, and neither does the value of an ignorable
/// leaf.
#[derive(Debug, Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    /// Creates a leaf node.
    ///
    /// # Errors
    ///
    /// Fails if `variant` is an inner or anonymous variant.
    pub fn leaf(
        grammar: &Grammar,
        variant: VariantId,
        value: impl Into<SmolStr>,
    ) -> Result<Self, ShapeError> {
        let tag = tag_for(grammar, variant, NodeShape::Leaf)?;
        Ok(Self::from_parts(tag, NodeBody::Leaf(value.into()), None))
    }

    /// Creates an inner node.
    ///
    /// # Errors
    ///
    /// Fails if `variant` is a leaf or anonymous variant.
    pub fn inner(
        grammar: &Grammar,
        variant: VariantId,
        children: Vec<Node>,
    ) -> Result<Self, ShapeError> {
        let tag = tag_for(grammar, variant, NodeShape::Inner)?;
        Ok(Self::from_parts(tag, NodeBody::Inner(children), None))
    }

    fn from_parts(tag: NodeTag, body: NodeBody, position: Option<TextRange>) -> Self {
        Self(Arc::new(NodeData {
            tag,
            body,
            position,
        }))
    }

    /// The node's variant.
    #[must_use]
    pub fn variant(&self) -> VariantId {
        self.0.tag.variant
    }

    /// The production the node's variant belongs to.
    #[must_use]
    pub fn production(&self) -> ProductionId {
        self.0.tag.production
    }

    /// Returns `true` for leaf nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.0.body, NodeBody::Leaf(_))
    }

    /// The literal value of a leaf.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match &self.0.body {
            NodeBody::Leaf(value) => Some(value.as_str()),
            NodeBody::Inner(_) => None,
        }
    }

    /// Children of an inner node; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match &self.0.body {
            NodeBody::Inner(children) => children.as_slice(),
            NodeBody::Leaf(_) => &[],
        }
    }

    /// The first child whose variant belongs to `production`.
    #[must_use]
    pub fn first_child_with_type(&self, production: ProductionId) -> Option<&Node> {
        self.children()
            .iter()
            .find(|child| child.production() == production)
    }

    /// Where the node came from, if known.
    #[must_use]
    pub fn source_position(&self) -> Option<TextRange> {
        self.0.position
    }

    /// Returns the node with its source position replaced.
    #[must_use]
    pub fn with_position(mut self, position: Option<TextRange>) -> Self {
        if self.0.position != position {
            Arc::make_mut(&mut self.0).position = position;
        }
        self
    }

    /// Returns the tree with every source position removed.
    #[must_use]
    pub fn without_positions(&self) -> Self {
        let body = match &self.0.body {
            NodeBody::Leaf(value) => NodeBody::Leaf(value.clone()),
            NodeBody::Inner(children) => {
                NodeBody::Inner(children.iter().map(Node::without_positions).collect())
            }
        };
        Self::from_parts(self.0.tag, body, None)
    }

    /// This node and all of its descendants, in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = &Node> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }

    /// Returns `true` if both handles share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn children_mut(&mut self) -> Result<&mut Vec<Node>, ShapeError> {
        match &mut Arc::make_mut(&mut self.0).body {
            NodeBody::Inner(children) => Ok(children),
            NodeBody::Leaf(_) => Err(ShapeError::NotInner),
        }
    }

    fn check_inner(&self, index: usize, allow_end: bool) -> Result<(), ShapeError> {
        let len = match &self.0.body {
            NodeBody::Inner(children) => children.len(),
            NodeBody::Leaf(_) => return Err(ShapeError::NotInner),
        };
        if index < len || (allow_end && index == len) {
            Ok(())
        } else {
            Err(ShapeError::OutOfRange { index, len })
        }
    }

    /// Appends a child.
    ///
    /// # Errors
    ///
    /// Fails on a leaf.
    pub fn add(&mut self, child: Node) -> Result<(), ShapeError> {
        self.check_inner(0, true)?;
        self.children_mut()?.push(child);
        Ok(())
    }

    /// Inserts a child before `index`.
    ///
    /// # Errors
    ///
    /// Fails on a leaf or if `index` is past the end.
    pub fn insert(&mut self, index: usize, child: Node) -> Result<(), ShapeError> {
        self.check_inner(index, true)?;
        self.children_mut()?.insert(index, child);
        Ok(())
    }

    /// Replaces the child at `index` and returns the old one.
    ///
    /// # Errors
    ///
    /// Fails on a leaf or if `index` is out of range.
    pub fn replace(&mut self, index: usize, child: Node) -> Result<Node, ShapeError> {
        self.check_inner(index, false)?;
        Ok(std::mem::replace(&mut self.children_mut()?[index], child))
    }

    /// Removes and returns the child at `index`.
    ///
    /// # Errors
    ///
    /// Fails on a leaf or if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<Node, ShapeError> {
        self.check_inner(index, false)?;
        Ok(self.children_mut()?.remove(index))
    }

    /// Replaces every child and returns the old list.
    ///
    /// # Errors
    ///
    /// Fails on a leaf.
    pub fn replace_children(&mut self, children: Vec<Node>) -> Result<Vec<Node>, ShapeError> {
        self.check_inner(0, true)?;
        Ok(std::mem::replace(self.children_mut()?, children))
    }

    /// Replaces a leaf's value and returns the old one.
    ///
    /// # Errors
    ///
    /// Fails on an inner node.
    pub fn set_value(&mut self, value: impl Into<SmolStr>) -> Result<SmolStr, ShapeError> {
        if !self.is_leaf() {
            return Err(ShapeError::NotLeaf);
        }
        match &mut Arc::make_mut(&mut self.0).body {
            NodeBody::Leaf(old) => Ok(std::mem::replace(old, value.into())),
            NodeBody::Inner(_) => Err(ShapeError::NotLeaf),
        }
    }
}

fn tag_for(grammar: &Grammar, variant: VariantId, shape: NodeShape) -> Result<NodeTag, ShapeError> {
    let decl = grammar.variant(variant);
    if decl.is_anon() {
        return Err(ShapeError::Anonymous);
    }
    match (decl.shape(), shape) {
        (NodeShape::Leaf, NodeShape::Inner) => Err(ShapeError::NotInner),
        (NodeShape::Inner, NodeShape::Leaf) => Err(ShapeError::NotLeaf),
        _ => Ok(NodeTag {
            variant,
            production: decl.production(),
            ignorable: decl.is_ignorable(),
        }),
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (&*self.0, &*other.0);
        a.tag.variant == b.tag.variant
            && match (&a.body, &b.body) {
                (NodeBody::Leaf(x), NodeBody::Leaf(y)) => a.tag.ignorable || x == y,
                (NodeBody::Inner(x), NodeBody::Inner(y)) => x == y,
                _ => false,
            }
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.tag.variant.hash(state);
        match &self.0.body {
            NodeBody::Leaf(value) => {
                if !self.0.tag.ignorable {
                    value.hash(state);
                }
            }
            NodeBody::Inner(children) => children.hash(state),
        }
    }
}
