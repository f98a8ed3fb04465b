//! Chain splicing.
//!
//! Every operation here keeps the two link rules intact: a chain start has a
//! parent link and no left sibling, every other block has a left sibling and
//! no parent link. Required slots that end up empty are refilled with a blank.

use super::{BlockId, BlockKind, Document, ModelError, Node, ParentLink};

impl Document {
    /// Splice the detached chain starting at `start` immediately right of `target`.
    pub fn insert_chain_right(&mut self, target: BlockId, start: BlockId) -> Result<(), ModelError> {
        self.ensure_spliceable(target)?;
        self.ensure_detached(start)?;
        let end = self.chain_end(start);
        let old_right = self.node(target)?.right;

        self.node_mut(target)?.right = Some(start);
        self.node_mut(start)?.left = Some(target);
        self.node_mut(end)?.right = old_right;
        if let Some(right) = old_right {
            self.node_mut(right)?.left = Some(end);
        }
        Ok(())
    }

    /// Splice the detached chain starting at `start` immediately left of
    /// `target`. When `target` was a chain start the new chain takes over its
    /// parent link.
    pub fn insert_chain_left(&mut self, target: BlockId, start: BlockId) -> Result<(), ModelError> {
        self.ensure_spliceable(target)?;
        if let Some(left) = self.node(target)?.left {
            return self.insert_chain_right(left, start);
        }
        self.ensure_detached(start)?;
        let end = self.chain_end(start);
        let link = self.node_mut(target)?.parent.take();

        self.node_mut(target)?.left = Some(end);
        self.node_mut(end)?.right = Some(target);
        if let Some(link) = link {
            self.node_mut(start)?.parent = Some(link);
            self.set_slot(link, Some(start))?;
        }
        Ok(())
    }

    /// Unlink a single block from its chain.
    ///
    /// A removed chain start hands its parent link to its right sibling; a
    /// required chain left empty gets a fresh blank. Fails with
    /// [`ModelError::ParentAndLeft`] if the new neighbour would end up with
    /// both a left sibling and a parent link.
    pub fn remove(&mut self, id: BlockId) -> Result<(), ModelError> {
        self.ensure_spliceable(id)?;
        let (left, right, parent) = {
            let node = self.node(id)?;
            (node.left, node.right, node.parent)
        };

        if let Some(right) = right {
            self.node_mut(right)?.left = left;
        }
        match (left, parent) {
            (Some(left), _) => {
                self.node_mut(left)?.right = right;
            }
            (None, Some(link)) => match right {
                Some(right) => {
                    self.node_mut(right)?.parent = Some(link);
                    self.set_slot(link, Some(right))?;
                }
                None => {
                    self.set_slot(link, None)?;
                    self.fill_if_required(link)?;
                }
            },
            (None, None) => {}
        }

        let node = self.node_mut(id)?;
        node.left = None;
        node.right = None;
        node.parent = None;

        if let Some(right) = right {
            let neighbour = self.node(right)?;
            if neighbour.left.is_some() && neighbour.parent.is_some() {
                return Err(ModelError::ParentAndLeft(right));
            }
        }
        Ok(())
    }

    /// Swap the chain in `slot` of `parent` for `start`, returning the old
    /// chain (now detached). Passing `None` for a required slot installs a
    /// blank instead.
    pub fn replace_chain(
        &mut self,
        parent: BlockId,
        slot: usize,
        start: Option<BlockId>,
    ) -> Result<Option<BlockId>, ModelError> {
        let link = ParentLink::new(parent, slot);
        let nullable = self.slot_nullable(link)?;
        if let Some(start) = start {
            self.ensure_detached(start)?;
        }

        let start = match start {
            None if !nullable => Some(self.create(BlockKind::Blank, None)),
            start => start,
        };
        let old = self.child(parent, slot);
        if let Some(old) = old {
            self.node_mut(old)?.parent = None;
        }
        if let Some(start) = start {
            self.node_mut(start)?.parent = Some(link);
        }
        self.set_slot(link, start)?;
        Ok(old)
    }

    /// Detach the chain in `slot` of `parent`.
    pub fn take_chain(&mut self, parent: BlockId, slot: usize) -> Result<Option<BlockId>, ModelError> {
        self.replace_chain(parent, slot, None)
    }

    /// Put the detached chain starting at `start` where `id` was.
    pub fn replace_with(&mut self, id: BlockId, start: BlockId) -> Result<(), ModelError> {
        self.insert_chain_right(id, start)?;
        self.remove(id)
    }

    /// Cut the run `first..=last` out of its chain and return it as a
    /// detached chain starting at `first`.
    pub fn detach_range(&mut self, first: BlockId, last: BlockId) -> Result<BlockId, ModelError> {
        self.ensure_spliceable(first)?;
        if !self.chain_blocks(Some(first)).contains(&last) {
            return Err(ModelError::NotInChain { first, last });
        }
        let (left, parent) = {
            let node = self.node(first)?;
            (node.left, node.parent)
        };
        let right = self.node(last)?.right;

        {
            let node = self.node_mut(first)?;
            node.left = None;
            node.parent = None;
        }
        self.node_mut(last)?.right = None;
        if let Some(right) = right {
            self.node_mut(right)?.left = left;
        }

        match (left, parent) {
            (Some(left), _) => {
                self.node_mut(left)?.right = right;
            }
            (None, Some(link)) => match right {
                Some(right) => {
                    self.node_mut(right)?.parent = Some(link);
                    self.set_slot(link, Some(right))?;
                }
                None => {
                    self.set_slot(link, None)?;
                    self.fill_if_required(link)?;
                }
            },
            (None, None) => {}
        }
        Ok(first)
    }

    /// Split the chain starting at `start` before the block at `offset`.
    ///
    /// Returns the two halves. The left half keeps the parent link; splitting
    /// at zero detaches the whole chain as the right half.
    pub fn split_at(
        &mut self,
        start: BlockId,
        offset: usize,
    ) -> Result<(Option<BlockId>, Option<BlockId>), ModelError> {
        if self.node(start)?.left.is_some() {
            return Err(ModelError::NotChainStart(start));
        }
        if offset == 0 {
            if let Some(link) = self.node(start)?.parent {
                self.take_chain(link.block, link.slot)?;
            }
            return Ok((None, Some(start)));
        }

        let blocks = self.chain_blocks(Some(start));
        match (blocks.get(offset - 1), blocks.get(offset)) {
            (Some(&before), Some(&cut)) => {
                self.node_mut(before)?.right = None;
                self.node_mut(cut)?.left = None;
                Ok((Some(start), Some(cut)))
            }
            _ => Ok((Some(start), None)),
        }
    }

    /// Deep-copy `id`, everything right of it in its chain and all
    /// descendants, with fresh ids. The copy is detached.
    pub fn clone_deep(&mut self, id: BlockId) -> Result<BlockId, ModelError> {
        let blocks = self.chain_blocks(Some(id));
        let mut copies = Vec::with_capacity(blocks.len());
        for block in blocks {
            copies.push(self.clone_single(block)?);
        }
        self.link_chain(&copies)?
            .ok_or(ModelError::UnknownBlock(id))
    }

    fn clone_single(&mut self, id: BlockId) -> Result<BlockId, ModelError> {
        let (kind, data, children) = {
            let node = self.node(id)?;
            (node.kind, node.data.clone(), node.children.clone())
        };
        let copy = self.alloc_id();
        self.nodes.insert(
            copy,
            Node {
                kind,
                data,
                left: None,
                right: None,
                parent: None,
                children: vec![None; children.len()],
            },
        );
        for (slot, start) in children.into_iter().enumerate() {
            if let Some(start) = start {
                let cloned = self.clone_deep(start)?;
                let link = ParentLink::new(copy, slot);
                self.node_mut(cloned)?.parent = Some(link);
                self.set_slot(link, Some(cloned))?;
            }
        }
        Ok(copy)
    }

    /// Link detached chains into one, in order. Returns the first start.
    pub fn link_chain(&mut self, starts: &[BlockId]) -> Result<Option<BlockId>, ModelError> {
        let Some(&first) = starts.first() else {
            return Ok(None);
        };
        for pair in starts.windows(2) {
            let end = self.chain_end(pair[0]);
            self.insert_chain_right(end, pair[1])?;
        }
        Ok(Some(first))
    }

    fn ensure_detached(&self, start: BlockId) -> Result<(), ModelError> {
        let node = self.node(start)?;
        if node.left.is_some() || node.parent.is_some() || start == self.root {
            return Err(ModelError::NotDetached(start));
        }
        Ok(())
    }

    fn ensure_spliceable(&self, id: BlockId) -> Result<(), ModelError> {
        if id == self.root {
            return Err(ModelError::RootBlock);
        }
        self.node(id).map(|_| ())
    }

    fn set_slot(&mut self, link: ParentLink, start: Option<BlockId>) -> Result<(), ModelError> {
        let node = self.node_mut(link.block)?;
        let slot = node
            .children
            .get_mut(link.slot)
            .ok_or(ModelError::NoSuchSlot {
                block: link.block,
                slot: link.slot,
            })?;
        *slot = start;
        Ok(())
    }

    fn fill_if_required(&mut self, link: ParentLink) -> Result<(), ModelError> {
        if self.child(link.block, link.slot).is_none() && !self.slot_nullable(link)? {
            let blank = self.create(BlockKind::Blank, None);
            self.node_mut(blank)?.parent = Some(link);
            self.set_slot(link, Some(blank))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::slot;
    use pretty_assertions::assert_eq;

    fn atom(doc: &mut Document, text: &str) -> BlockId {
        doc.create(BlockKind::Atom, Some(text.to_string()))
    }

    /// Body holding one atom per character of `text`.
    fn doc_with(text: &str) -> (Document, Vec<BlockId>) {
        let mut doc = Document::new();
        let atoms: Vec<BlockId> = text.chars().map(|c| atom(&mut doc, &c.to_string())).collect();
        let start = doc.link_chain(&atoms).unwrap().unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
        (doc, atoms)
    }

    fn body_text(doc: &Document) -> String {
        doc.chain_blocks(doc.body())
            .into_iter()
            .map(|id| doc.data(id).unwrap_or("_").to_string())
            .collect()
    }

    #[test]
    fn remove_rejects_neighbour_with_parent_and_left() {
        let (mut doc, atoms) = doc_with("abc");
        let stray = ParentLink::new(doc.root(), slot::BODY);
        doc.node_mut(atoms[2]).unwrap().parent = Some(stray);

        assert_eq!(
            doc.remove(atoms[1]),
            Err(ModelError::ParentAndLeft(atoms[2]))
        );
    }

    #[test]
    fn insert_right_and_left() {
        let (mut doc, atoms) = doc_with("ac");
        let b = atom(&mut doc, "b");
        doc.insert_chain_right(atoms[0], b).unwrap();
        assert_eq!(body_text(&doc), "abc");

        let z = atom(&mut doc, "z");
        doc.insert_chain_left(atoms[0], z).unwrap();
        assert_eq!(body_text(&doc), "zabc");
        assert_eq!(doc.body(), Some(z));
        assert_eq!(doc.parent(atoms[0]), None);
        doc.check_integrity().unwrap();
    }

    #[test]
    fn inserting_attached_chain_is_rejected() {
        let (mut doc, atoms) = doc_with("ab");
        let result = doc.insert_chain_right(atoms[1], atoms[0]);
        assert_eq!(result, Err(ModelError::NotDetached(atoms[0])));
    }

    #[test]
    fn removing_chain_start_moves_parent_link() {
        let (mut doc, atoms) = doc_with("ab");
        doc.remove(atoms[0]).unwrap();

        assert_eq!(doc.body(), Some(atoms[1]));
        assert_eq!(
            doc.parent(atoms[1]),
            Some(ParentLink::new(doc.root(), slot::BODY))
        );
        assert_eq!(doc.parent(atoms[0]), None);
        doc.check_integrity().unwrap();
    }

    #[test]
    fn removing_only_block_refills_required_chain() {
        let (mut doc, atoms) = doc_with("a");
        doc.remove(atoms[0]).unwrap();

        let body = doc.body().unwrap();
        assert!(doc.is_blank(body));
        doc.check_integrity().unwrap();
    }

    #[test]
    fn take_chain_leaves_nullable_slot_empty() {
        let mut doc = Document::new();
        let scripts = doc.create(BlockKind::SupSub, None);
        let two = atom(&mut doc, "2");
        doc.replace_chain(scripts, slot::SUP, Some(two)).unwrap();

        let taken = doc.take_chain(scripts, slot::SUP).unwrap();
        assert_eq!(taken, Some(two));
        assert_eq!(doc.child(scripts, slot::SUP), None);
        assert_eq!(doc.parent(two), None);
    }

    #[test]
    fn detach_range_from_middle() {
        let (mut doc, atoms) = doc_with("abcd");
        let cut = doc.detach_range(atoms[1], atoms[2]).unwrap();

        assert_eq!(body_text(&doc), "ad");
        assert_eq!(doc.chain_blocks(Some(cut)), vec![atoms[1], atoms[2]]);
        assert_eq!(doc.left(cut), None);
        doc.check_integrity().unwrap();
    }

    #[test]
    fn detach_range_rejects_reversed_bounds() {
        let (mut doc, atoms) = doc_with("ab");
        let result = doc.detach_range(atoms[1], atoms[0]);
        assert_eq!(
            result,
            Err(ModelError::NotInChain {
                first: atoms[1],
                last: atoms[0]
            })
        );
    }

    #[test]
    fn split_keeps_left_half_attached() {
        let (mut doc, atoms) = doc_with("abc");
        let (left, right) = doc.split_at(atoms[0], 1).unwrap();

        assert_eq!(left, Some(atoms[0]));
        assert_eq!(right, Some(atoms[1]));
        assert_eq!(body_text(&doc), "a");
        assert_eq!(doc.chain_blocks(right), vec![atoms[1], atoms[2]]);
    }

    #[test]
    fn split_at_end_and_start() {
        let (mut doc, atoms) = doc_with("ab");
        assert_eq!(doc.split_at(atoms[0], 2).unwrap(), (Some(atoms[0]), None));

        let (left, right) = doc.split_at(atoms[0], 0).unwrap();
        assert_eq!((left, right), (None, Some(atoms[0])));
        assert!(doc.is_blank(doc.body().unwrap()));
        doc.check_integrity().unwrap();
    }

    #[test]
    fn clone_deep_copies_descendants_with_new_ids() {
        let mut doc = Document::new();
        let fraction = doc.create(BlockKind::Fraction, None);
        let x = atom(&mut doc, "x");
        doc.replace_chain(fraction, slot::NUM, Some(x)).unwrap();

        let copy = doc.clone_deep(fraction).unwrap();
        assert_ne!(copy, fraction);
        let copied_num = doc.child(copy, slot::NUM).unwrap();
        assert_ne!(copied_num, x);
        assert_eq!(doc.data(copied_num), Some("x"));
        assert_eq!(doc.parent(copied_num), Some(ParentLink::new(copy, slot::NUM)));
        assert!(doc.is_blank(doc.child(copy, slot::DENOM).unwrap()));
    }
}
