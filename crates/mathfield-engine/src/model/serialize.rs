//! Serialized block trees.
//!
//! The persisted shape is a plain JSON tree:
//!
//! ```json
//! { "id": 0, "type": "root", "children": { "body": [ { "id": 2, "type": "atom", "data": "x" } ] } }
//! ```
//!
//! Composite blocks always carry a `children` map keyed by chain name; an
//! absent nullable chain serializes as an empty list. Ids survive the round
//! trip so undo snapshots can restore the exact same block identities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::kinds::parse_dimensions;
use super::{BlockId, BlockKind, Document, ModelError, Node};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, Vec<SerializedBlock>>>,
}

impl SerializedBlock {
    fn max_id(&self) -> u64 {
        self.children
            .iter()
            .flat_map(|children| children.values())
            .flatten()
            .map(SerializedBlock::max_id)
            .fold(self.id.0, u64::max)
    }
}

impl Document {
    /// Serialize the whole document from the root down.
    pub fn serialize(&self) -> SerializedBlock {
        match self.get(self.root) {
            Some(node) => self.serialize_node(self.root, node),
            None => SerializedBlock {
                id: self.root,
                kind: BlockKind::Root,
                data: None,
                children: None,
            },
        }
    }

    /// Serialize one attached subtree.
    pub fn serialize_block(&self, id: BlockId) -> Option<SerializedBlock> {
        self.get(id).map(|node| self.serialize_node(id, node))
    }

    fn serialize_node(&self, id: BlockId, node: &Node) -> SerializedBlock {
        let children = node.kind.config(node.data.as_deref()).map(|config| {
            config
                .children
                .iter()
                .enumerate()
                .map(|(slot, spec)| {
                    let start = node.children.get(slot).copied().flatten();
                    let blocks = self
                        .chain_blocks(start)
                        .into_iter()
                        .filter_map(|block| self.serialize_block(block))
                        .collect();
                    (spec.name.to_string(), blocks)
                })
                .collect()
        });
        SerializedBlock {
            id,
            kind: node.kind,
            data: node.data.clone(),
            children,
        }
    }

    /// Rebuild an arena from a serialized root, keeping every id.
    ///
    /// Missing required chains (or empty lists for them) come back as blanks.
    pub fn from_serialized(root: &SerializedBlock) -> Result<Self, ModelError> {
        if root.kind != BlockKind::Root {
            return Err(ModelError::InvalidRoot(root.kind));
        }
        let mut doc = Self {
            nodes: Default::default(),
            root: root.id,
            next_id: root.max_id() + 1,
        };
        doc.load_block(root)?;
        doc.check_integrity()?;
        Ok(doc)
    }

    fn load_block(&mut self, block: &SerializedBlock) -> Result<BlockId, ModelError> {
        if self.contains(block.id) {
            return Err(ModelError::DuplicateId(block.id));
        }
        if block.kind == BlockKind::Root && block.id != self.root {
            return Err(ModelError::InvalidRoot(block.kind));
        }
        validate_data(block)?;

        let config = block.kind.config(block.data.as_deref());
        let slot_count = config.as_ref().map_or(0, |config| config.children.len());
        self.nodes.insert(
            block.id,
            Node {
                kind: block.kind,
                data: block.data.clone(),
                left: None,
                right: None,
                parent: None,
                children: vec![None; slot_count],
            },
        );

        let Some(config) = config else {
            if block.children.as_ref().is_some_and(|c| !c.is_empty()) {
                return Err(ModelError::UnknownChain {
                    kind: block.kind,
                    name: block
                        .children
                        .iter()
                        .flat_map(|c| c.keys())
                        .next()
                        .cloned()
                        .unwrap_or_default(),
                });
            }
            return Ok(block.id);
        };

        for (name, chain) in block.children.iter().flatten() {
            let slot = config.slot(name).ok_or_else(|| ModelError::UnknownChain {
                kind: block.kind,
                name: name.clone(),
            })?;
            let mut ids = Vec::with_capacity(chain.len());
            for child in chain {
                ids.push(self.load_block(child)?);
            }
            let start = self.link_chain(&ids)?;
            if start.is_some() {
                self.replace_chain(block.id, slot, start)?;
            }
        }
        for slot in 0..slot_count {
            if self.child(block.id, slot).is_none() && !config.is_nullable(slot) {
                self.replace_chain(block.id, slot, None)?;
            }
        }
        Ok(block.id)
    }
}

fn validate_data(block: &SerializedBlock) -> Result<(), ModelError> {
    let data = block.data.as_deref();
    let valid = match block.kind {
        BlockKind::Atom => data.is_some_and(|d| !d.is_empty()),
        BlockKind::Matrix => parse_dimensions(data).is_some(),
        BlockKind::Function => {
            data.is_some_and(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_alphabetic()))
        }
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidData {
            kind: block.kind,
            data: block.data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::slot;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut doc = Document::new();
        let x = doc.create(BlockKind::Atom, Some("x".into()));
        let radical = doc.create(BlockKind::Radical, None);
        let two = doc.create(BlockKind::Atom, Some("2".into()));
        doc.replace_chain(radical, slot::RADICAL_INNER, Some(two)).unwrap();
        let start = doc.link_chain(&[x, radical]).unwrap().unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
        doc.collect_garbage();
        doc
    }

    #[test]
    fn serialized_json_shape() {
        let doc = sample();
        let json = serde_json::to_value(doc.serialize()).unwrap();

        insta::assert_json_snapshot!(json, @r#"
        {
          "children": {
            "body": [
              {
                "data": "x",
                "id": 2,
                "type": "atom"
              },
              {
                "children": {
                  "index": [],
                  "inner": [
                    {
                      "data": "2",
                      "id": 5,
                      "type": "atom"
                    }
                  ]
                },
                "id": 3,
                "type": "radical"
              }
            ]
          },
          "id": 0,
          "type": "root"
        }
        "#);
    }

    #[test]
    fn round_trip_keeps_ids() {
        let doc = sample();
        let serialized = doc.serialize();
        let restored = Document::from_serialized(&serialized).unwrap();

        assert_eq!(restored.serialize(), serialized);
        assert_eq!(restored.root(), doc.root());
    }

    #[test]
    fn missing_required_chain_becomes_blank() {
        let json = r#"{"id":0,"type":"root","children":{"body":[{"id":1,"type":"fraction","children":{"num":[{"id":2,"type":"atom","data":"1"}]}}]}}"#;
        let block: SerializedBlock = serde_json::from_str(json).unwrap();
        let doc = Document::from_serialized(&block).unwrap();

        let denom = doc.child(BlockId(1), slot::DENOM).unwrap();
        assert!(doc.is_blank(denom));
        // fresh blanks never collide with loaded ids
        assert!(denom.0 > 2);
    }

    #[test]
    fn rejects_bad_input() {
        let not_root: SerializedBlock =
            serde_json::from_str(r#"{"id":0,"type":"atom","data":"x"}"#).unwrap();
        assert_eq!(
            Document::from_serialized(&not_root).unwrap_err(),
            ModelError::InvalidRoot(BlockKind::Atom)
        );

        let duplicate: SerializedBlock = serde_json::from_str(
            r#"{"id":0,"type":"root","children":{"body":[{"id":1,"type":"atom","data":"a"},{"id":1,"type":"atom","data":"b"}]}}"#,
        )
        .unwrap();
        assert_eq!(
            Document::from_serialized(&duplicate).unwrap_err(),
            ModelError::DuplicateId(BlockId(1))
        );

        let unknown: SerializedBlock = serde_json::from_str(
            r#"{"id":0,"type":"root","children":{"bogus":[]}}"#,
        )
        .unwrap();
        assert!(matches!(
            Document::from_serialized(&unknown),
            Err(ModelError::UnknownChain { .. })
        ));
    }
}
