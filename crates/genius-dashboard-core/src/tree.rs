//! Persistent namespace tree keyed by path segments.
//!
//! Every [`NamespaceTree::set`] returns a new tree. Nodes on the path from
//! the root to the written leaf are fresh; every other subtree is shared by
//! reference with the previous version. A consumer can therefore detect
//! "nothing under this node changed" with [`Node::ptr_eq`] alone.
//!
//! Writing the same value twice still produces a new root and new branches
//! along the path. Only the untouched siblings are shared.

use crate::path::{PathError, TopicPath};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node of a namespace tree.
#[derive(Debug)]
pub enum Node<V> {
    /// A single value
    Leaf(Arc<V>),
    /// A mapping of child segment to node
    Branch(Arc<Branch<V>>),
}

// Manual impl: cloning a node clones the `Arc`, never `V`.
impl<V> Clone for Node<V> {
    fn clone(&self) -> Self {
        match self {
            Node::Leaf(value) => Node::Leaf(Arc::clone(value)),
            Node::Branch(branch) => Node::Branch(Arc::clone(branch)),
        }
    }
}

impl<V> Node<V> {
    /// Whether both nodes are the very same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => Arc::ptr_eq(a, b),
            (Node::Branch(a), Node::Branch(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The leaf value, if this node is a leaf.
    #[must_use]
    pub fn as_leaf(&self) -> Option<&V> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    /// The branch, if this node is a branch.
    #[must_use]
    pub fn as_branch(&self) -> Option<&Branch<V>> {
        match self {
            Node::Leaf(_) => None,
            Node::Branch(branch) => Some(branch),
        }
    }

    /// Whether this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

impl<V: PartialEq> PartialEq for Node<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => a == b,
            (Node::Branch(a), Node::Branch(b)) => a == b,
            _ => false,
        }
    }
}

/// An interior node: child segment to node.
#[derive(Debug)]
pub struct Branch<V> {
    children: BTreeMap<String, Node<V>>,
}

impl<V> Default for Branch<V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
        }
    }
}

// Shallow copy: children are shared.
impl<V> Clone for Branch<V> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
        }
    }
}

impl<V: PartialEq> PartialEq for Branch<V> {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
    }
}

impl<V> Branch<V> {
    /// Look up a direct child.
    #[must_use]
    pub fn get(&self, segment: &str) -> Option<&Node<V>> {
        self.children.get(segment)
    }

    /// Whether a direct child exists.
    #[must_use]
    pub fn contains(&self, segment: &str) -> bool {
        self.children.contains_key(segment)
    }

    /// Iterate over direct children, ordered by segment name.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node<V>)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the branch has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// A copy of this branch with `segments` written to `value`.
    fn with_value(&self, segments: &[String], value: Arc<V>) -> Self {
        let Some((head, rest)) = segments.split_first() else {
            return self.clone();
        };

        let child = if rest.is_empty() {
            Node::Leaf(value)
        } else {
            let next = match self.children.get(head) {
                Some(Node::Branch(existing)) => existing.with_value(rest, value),
                // Absent, or a leaf being replaced by a branch
                Some(Node::Leaf(_)) | None => Branch::default().with_value(rest, value),
            };
            Node::Branch(Arc::new(next))
        };

        let mut copy = self.clone();
        copy.children.insert(head.clone(), child);
        copy
    }
}

/// A persistent tree of values addressed by [`TopicPath`].
#[derive(Debug)]
pub struct NamespaceTree<V> {
    root: Arc<Branch<V>>,
}

impl<V> Clone for NamespaceTree<V> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
        }
    }
}

impl<V> Default for NamespaceTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// View a subtree as a tree of its own; paths become relative to it.
impl<V> From<Arc<Branch<V>>> for NamespaceTree<V> {
    fn from(root: Arc<Branch<V>>) -> Self {
        Self { root }
    }
}

impl<V> NamespaceTree<V> {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Arc::new(Branch::default()),
        }
    }

    /// The root node. Always a branch.
    #[must_use]
    pub fn root(&self) -> Node<V> {
        Node::Branch(Arc::clone(&self.root))
    }

    /// The root branch.
    #[must_use]
    pub fn root_branch(&self) -> &Branch<V> {
        &self.root
    }

    /// Resolve a path.
    ///
    /// Returns `None` as soon as a segment is missing or an intermediate node
    /// is a leaf. An existing but empty branch is returned as such.
    #[must_use]
    pub fn get(&self, path: &TopicPath) -> Option<&Node<V>> {
        let (last, parents) = path.segments().split_last()?;
        let mut branch: &Branch<V> = &self.root;
        for segment in parents {
            branch = branch.get(segment)?.as_branch()?;
        }
        branch.get(last)
    }

    /// Resolve a canonical path string.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the path is malformed.
    pub fn get_str(&self, path: &str) -> Result<Option<&Node<V>>, PathError> {
        let path = TopicPath::parse(path)?;
        Ok(self.get(&path))
    }

    /// A new tree with `value` stored as a leaf at `path`.
    ///
    /// Intermediate leaves along the path become branches. Whatever was at
    /// `path` itself (leaf or whole subtree) is replaced.
    #[must_use]
    pub fn set(&self, path: &TopicPath, value: V) -> Self {
        let root = self.root.with_value(path.segments(), Arc::new(value));
        Self {
            root: Arc::new(root),
        }
    }

    /// [`NamespaceTree::set`] with a canonical path string.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the path is malformed.
    pub fn set_str(&self, path: &str, value: V) -> Result<Self, PathError> {
        let path = TopicPath::parse(path)?;
        Ok(self.set(&path, value))
    }

    /// Depth-first iterator over every leaf and its path, in name order.
    pub fn leaves(&self) -> Leaves<'_, V> {
        Leaves {
            stack: vec![Entry::Branch(Vec::new(), &self.root)],
        }
    }

    /// Number of leaves in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Whether the tree holds no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

enum Entry<'a, V> {
    Leaf(Vec<&'a str>, &'a V),
    Branch(Vec<&'a str>, &'a Branch<V>),
}

/// Iterator returned by [`NamespaceTree::leaves`].
pub struct Leaves<'a, V> {
    stack: Vec<Entry<'a, V>>,
}

impl<'a, V> Iterator for Leaves<'a, V> {
    type Item = (TopicPath, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(entry) = self.stack.pop() {
            match entry {
                Entry::Leaf(segments, value) => {
                    // Segments come from existing keys, which are never empty.
                    if let Ok(path) = TopicPath::from_segments(segments) {
                        return Some((path, value));
                    }
                }
                Entry::Branch(prefix, branch) => {
                    // Reversed so that popping yields children in name order.
                    for (name, node) in branch.children.iter().rev() {
                        let mut segments = prefix.clone();
                        segments.push(name.as_str());
                        self.stack.push(match node {
                            Node::Leaf(value) => Entry::Leaf(segments, value),
                            Node::Branch(child) => Entry::Branch(segments, child),
                        });
                    }
                }
            }
        }
        None
    }
}
