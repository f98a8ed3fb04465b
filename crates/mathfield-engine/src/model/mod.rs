//! # Block Model
//!
//! The document is an arena of [`Node`]s addressed by [`BlockId`]. Sibling
//! and parent links are ids looked up in the arena, so the left/right/parent
//! graph never needs shared ownership.
//!
//! ## Chains
//!
//! A chain is an ordered run of blocks linked through `left`/`right`. It is
//! referenced by its start block only; the end is found by walking right.
//! A chain start carries a [`ParentLink`] naming the composite block and the
//! child slot that own it. Every other block in the chain has a left sibling
//! and no parent link. The root block owns the top-level `body` chain.
//!
//! ## Lifecycle
//!
//! Removing a block only unlinks it. Detached blocks stay in the arena until
//! [`Document::collect_garbage`] sweeps everything unreachable from the root,
//! which lets edits move whole chains around (e.g. promoting a numerator)
//! without copying.
//!
//! ## Modules
//!
//! - **`chain`**: splicing, removal, splitting and cloning of chains
//! - **`kinds`**: `BlockKind`, per-kind `CompositeConfig` tables and the
//!   behavior table
//! - **`position`**: structural addressing (`Position`)
//! - **`serialize`**: `SerializedBlock` and arena reconstruction
//! - **`invariants`**: `check_integrity`

pub mod chain;
pub mod invariants;
pub mod kinds;
pub mod position;
pub mod serialize;

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use kinds::{
    BlockKind, ChildSpec, CompositeConfig, CursorOrder, Entries, EntryRules, KindBehavior,
    behavior, slot,
};
pub use position::{Position, Relation};
pub use serialize::SerializedBlock;

/// Stable identifier of a block, preserved across serialization.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which composite block and child slot own a chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentLink {
    pub block: BlockId,
    pub slot: usize,
}

impl ParentLink {
    pub fn new(block: BlockId, slot: usize) -> Self {
        Self { block, slot }
    }
}

/// A block in the arena.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: BlockKind,
    pub(crate) data: Option<String>,
    pub(crate) left: Option<BlockId>,
    pub(crate) right: Option<BlockId>,
    /// Only set on chain starts
    pub(crate) parent: Option<ParentLink>,
    /// One chain start per child slot, indexed by chain number
    pub(crate) children: Vec<Option<BlockId>>,
}

impl Node {
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

/// Internal consistency failures of the block arena.
///
/// These indicate bugs in an edit operation rather than bad user input. The
/// editor contains them by restoring the pre-command snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("block {0} is not part of the document")]
    UnknownBlock(BlockId),
    #[error("the root block cannot be moved or removed")]
    RootBlock,
    #[error("block {0} has both a parent link and a left sibling")]
    ParentAndLeft(BlockId),
    #[error("non-nullable chain {slot} of block {parent} has no start")]
    MissingChainStart { parent: BlockId, slot: usize },
    #[error("block {block} has no child slot {slot}")]
    NoSuchSlot { block: BlockId, slot: usize },
    #[error("block {0} is still linked into a chain")]
    NotDetached(BlockId),
    #[error("block {0} is not the start of a chain")]
    NotChainStart(BlockId),
    #[error("block {last} does not follow block {first} in its chain")]
    NotInChain { first: BlockId, last: BlockId },
    #[error("block {0} is not attached to the document")]
    Detached(BlockId),
    #[error("block {0} is reachable twice (cycle or shared chain)")]
    Cycle(BlockId),
    #[error("sibling or parent links around block {0} disagree")]
    LinkMismatch(BlockId),
    #[error("block {0} has the wrong number of child slots")]
    SlotCount(BlockId),
    #[error("top-level block must be a root block, found {0}")]
    InvalidRoot(BlockKind),
    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),
    #[error("{kind} has no child chain named '{name}'")]
    UnknownChain { kind: BlockKind, name: String },
    #[error("invalid data {data:?} for {kind}")]
    InvalidData { kind: BlockKind, data: Option<String> },
}

/// The block arena plus its root.
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) nodes: HashMap<BlockId, Node>,
    pub(crate) root: BlockId,
    pub(crate) next_id: u64,
}

impl Document {
    /// An empty document: a root whose body chain holds a single blank.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: HashMap::new(),
            root: BlockId(0),
            next_id: 0,
        };
        doc.root = doc.create(BlockKind::Root, None);
        doc
    }

    /// Create a detached block. Non-nullable child slots are filled with
    /// blank placeholders so the new block is immediately valid.
    pub fn create(&mut self, kind: BlockKind, data: Option<String>) -> BlockId {
        let required: Vec<bool> = kind
            .config(data.as_deref())
            .map(|config| config.children.iter().map(|c| !c.nullable).collect())
            .unwrap_or_default();

        let id = self.alloc_id();
        self.nodes.insert(
            id,
            Node {
                kind,
                data,
                left: None,
                right: None,
                parent: None,
                children: vec![None; required.len()],
            },
        );

        for (slot, required) in required.into_iter().enumerate() {
            if required {
                let blank = self.create(BlockKind::Blank, None);
                self.attach_start(ParentLink::new(id, slot), blank);
            }
        }
        id
    }

    fn alloc_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Low-level attach used on freshly created blocks.
    fn attach_start(&mut self, link: ParentLink, start: BlockId) {
        if let Some(node) = self.nodes.get_mut(&start) {
            node.parent = Some(link);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&link.block)
            .and_then(|node| node.children.get_mut(link.slot))
        {
            *slot = Some(start);
        }
    }

    pub fn root(&self) -> BlockId {
        self.root
    }

    /// Start of the top-level chain.
    pub fn body(&self) -> Option<BlockId> {
        self.child(self.root, slot::BODY)
    }

    /// Number of blocks in the arena, including detached ones not yet swept.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_blank_chain(self.body())
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node(&self, id: BlockId) -> Result<&Node, ModelError> {
        self.nodes.get(&id).ok_or(ModelError::UnknownBlock(id))
    }

    pub(crate) fn node_mut(&mut self, id: BlockId) -> Result<&mut Node, ModelError> {
        self.nodes.get_mut(&id).ok_or(ModelError::UnknownBlock(id))
    }

    pub fn kind(&self, id: BlockId) -> Option<BlockKind> {
        self.get(id).map(|node| node.kind)
    }

    pub fn data(&self, id: BlockId) -> Option<&str> {
        self.get(id).and_then(|node| node.data.as_deref())
    }

    pub fn left(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).and_then(|node| node.left)
    }

    pub fn right(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).and_then(|node| node.right)
    }

    /// The parent link stored on `id` itself (chain starts only).
    pub fn parent(&self, id: BlockId) -> Option<ParentLink> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn child(&self, id: BlockId, slot: usize) -> Option<BlockId> {
        self.get(id)
            .and_then(|node| node.children.get(slot).copied())
            .flatten()
    }

    pub fn children(&self, id: BlockId) -> &[Option<BlockId>] {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn config(&self, id: BlockId) -> Option<Cow<'static, CompositeConfig>> {
        self.get(id)
            .and_then(|node| node.kind.config(node.data.as_deref()))
    }

    pub fn is_composite(&self, id: BlockId) -> bool {
        self.kind(id).is_some_and(BlockKind::is_composite)
    }

    pub fn is_blank(&self, id: BlockId) -> bool {
        self.kind(id) == Some(BlockKind::Blank)
    }

    /// A chain is blank when it is absent or holds only a placeholder.
    pub fn is_blank_chain(&self, start: Option<BlockId>) -> bool {
        match start {
            None => true,
            Some(start) => self.is_blank(start) && self.right(start).is_none(),
        }
    }

    /// All child chains of `id` are blank.
    pub fn is_all_blank(&self, id: BlockId) -> bool {
        self.children(id)
            .iter()
            .all(|start| self.is_blank_chain(*start))
    }

    pub fn slot_nullable(&self, link: ParentLink) -> Result<bool, ModelError> {
        self.config(link.block)
            .and_then(|config| config.children.get(link.slot).map(|spec| spec.nullable))
            .ok_or(ModelError::NoSuchSlot {
                block: link.block,
                slot: link.slot,
            })
    }

    pub fn chain_start(&self, id: BlockId) -> BlockId {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.left(current) {
                Some(left) => current = left,
                None => break,
            }
        }
        current
    }

    pub fn chain_end(&self, id: BlockId) -> BlockId {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.right(current) {
                Some(right) => current = right,
                None => break,
            }
        }
        current
    }

    /// Blocks of the chain starting at `start`, in order.
    pub fn chain_blocks(&self, start: Option<BlockId>) -> Vec<BlockId> {
        let mut blocks = Vec::new();
        let mut current = start.filter(|id| self.contains(*id));
        while let Some(id) = current {
            if blocks.len() > self.nodes.len() {
                break;
            }
            blocks.push(id);
            current = self.right(id);
        }
        blocks
    }

    pub fn chain_len(&self, start: Option<BlockId>) -> usize {
        self.chain_blocks(start).len()
    }

    pub fn index_in_chain(&self, id: BlockId) -> usize {
        let mut index = 0;
        let mut current = id;
        while let Some(left) = self.left(current) {
            if index > self.nodes.len() {
                break;
            }
            index += 1;
            current = left;
        }
        index
    }

    /// The composite block and slot owning the chain that contains `id`.
    pub fn owner(&self, id: BlockId) -> Option<ParentLink> {
        self.parent(self.chain_start(id))
    }

    /// Whether `id` is reachable from the root through owner links.
    pub fn is_attached(&self, id: BlockId) -> bool {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            if current == self.root {
                return true;
            }
            if !self.contains(current) {
                return false;
            }
            match self.owner(current) {
                Some(link) if self.child(link.block, link.slot).is_some() => {
                    current = link.block
                }
                _ => return false,
            }
        }
        false
    }

    /// Whether `ancestor` strictly contains `id`.
    pub fn is_ancestor_of(&self, ancestor: BlockId, id: BlockId) -> bool {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.owner(current) {
                Some(link) if link.block == ancestor => return true,
                Some(link) => current = link.block,
                None => return false,
            }
        }
        false
    }

    /// Every block reachable from the root.
    pub fn reachable(&self) -> HashSet<BlockId> {
        let mut live = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            for start in self.children(id).iter().flatten() {
                stack.extend(self.chain_blocks(Some(*start)));
            }
        }
        live
    }

    /// Drop every block that is no longer reachable from the root.
    pub fn collect_garbage(&mut self) -> usize {
        let live = self.reachable();
        let before = self.nodes.len();
        self.nodes.retain(|id, _| live.contains(id));
        before - self.nodes.len()
    }

    /// Names of the user functions used in the document.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .reachable()
            .into_iter()
            .filter(|id| self.kind(*id) == Some(BlockKind::Function))
            .filter_map(|id| self.data(id).map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_document_has_blank_body() {
        let doc = Document::new();
        let body = doc.body().unwrap();

        assert_eq!(doc.kind(doc.root()), Some(BlockKind::Root));
        assert_eq!(doc.kind(body), Some(BlockKind::Blank));
        assert_eq!(doc.parent(body), Some(ParentLink::new(doc.root(), slot::BODY)));
        assert!(doc.is_empty());
    }

    #[test]
    fn create_fills_required_slots_only() {
        let mut doc = Document::new();
        let radical = doc.create(BlockKind::Radical, None);

        assert_eq!(doc.child(radical, slot::RADICAL_INDEX), None);
        let inner = doc.child(radical, slot::RADICAL_INNER).unwrap();
        assert!(doc.is_blank(inner));
        assert_eq!(
            doc.parent(inner),
            Some(ParentLink::new(radical, slot::RADICAL_INNER))
        );
    }

    #[test]
    fn collect_garbage_sweeps_detached_blocks() {
        let mut doc = Document::new();
        let fraction = doc.create(BlockKind::Fraction, None);
        assert_eq!(doc.len(), 5);

        // fraction plus its two blanks are unreachable
        assert_eq!(doc.collect_garbage(), 3);
        assert!(!doc.contains(fraction));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn is_attached_follows_owner_links() {
        let mut doc = Document::new();
        let fraction = doc.create(BlockKind::Fraction, None);
        let num = doc.child(fraction, slot::NUM).unwrap();
        assert!(!doc.is_attached(num));

        let body = doc.body().unwrap();
        doc.replace_with(body, fraction).unwrap();
        assert!(doc.is_attached(num));
        assert!(doc.is_ancestor_of(fraction, num));
        assert!(!doc.is_ancestor_of(num, fraction));
    }
}
