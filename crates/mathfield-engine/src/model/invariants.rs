//! Structural integrity checks.
//!
//! Walks every chain reachable from the root and verifies the link rules:
//!
//! - a chain start has a parent link pointing back at the slot holding it,
//!   and no left sibling
//! - every other block has a left sibling that points back at it, and no
//!   parent link
//! - every required slot has a chain
//! - no block is reachable twice
//! - the root never appears inside a chain

use std::collections::HashSet;

use super::{BlockId, BlockKind, Document, ModelError, ParentLink};

impl Document {
    pub fn check_integrity(&self) -> Result<(), ModelError> {
        let root = self.node(self.root)?;
        if root.kind != BlockKind::Root {
            return Err(ModelError::InvalidRoot(root.kind));
        }
        if root.left.is_some() || root.right.is_some() || root.parent.is_some() {
            return Err(ModelError::LinkMismatch(self.root));
        }
        let mut visited = HashSet::new();
        self.check_block(self.root, &mut visited)
    }

    fn check_block(&self, id: BlockId, visited: &mut HashSet<BlockId>) -> Result<(), ModelError> {
        if !visited.insert(id) {
            return Err(ModelError::Cycle(id));
        }
        let node = self.node(id)?;
        let Some(config) = node.kind.config(node.data.as_deref()) else {
            return if node.children.is_empty() {
                Ok(())
            } else {
                Err(ModelError::SlotCount(id))
            };
        };
        if node.children.len() != config.children.len() {
            return Err(ModelError::SlotCount(id));
        }

        for (slot, start) in node.children.iter().enumerate() {
            match start {
                Some(start) => self.check_chain(ParentLink::new(id, slot), *start, visited)?,
                None if !config.is_nullable(slot) => {
                    return Err(ModelError::MissingChainStart { parent: id, slot });
                }
                None => {}
            }
        }
        Ok(())
    }

    fn check_chain(
        &self,
        link: ParentLink,
        start: BlockId,
        visited: &mut HashSet<BlockId>,
    ) -> Result<(), ModelError> {
        let first = self.node(start)?;
        if first.left.is_some() {
            return Err(ModelError::ParentAndLeft(start));
        }
        if first.parent != Some(link) {
            return Err(ModelError::LinkMismatch(start));
        }

        let mut previous = None;
        let mut current = Some(start);
        while let Some(id) = current {
            let node = self.node(id)?;
            if node.kind == BlockKind::Root {
                return Err(ModelError::RootBlock);
            }
            if node.left != previous {
                return Err(ModelError::LinkMismatch(id));
            }
            if previous.is_some() && node.parent.is_some() {
                return Err(ModelError::ParentAndLeft(id));
            }
            self.check_block(id, visited)?;
            previous = Some(id);
            current = node.right;
        }
        Ok(())
    }
}
