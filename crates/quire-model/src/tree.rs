//! Block tree: the addressable container of blocks forming a document.
//!
//! The tree is an arena of [`Block`]s keyed by id plus a derived position
//! view. There are no parent pointers inside blocks: each block's
//! `children_ids` array is the single source of truth for structure, and the
//! [`NodePosition`] map (parent, depth, sibling index, indent level) is
//! recomputed from the root whenever structure changes. A block that no
//! `children_ids` array names stays in the arena but has no position; it is
//! stored, not part of the document view.
//!
//! ## Mutation contract
//!
//! - `insert` never attaches: a new block becomes visible only once a
//!   `set_children` names it. The remote pairs block-add events with a
//!   children update for the parent in the same batch.
//! - `remove` deletes a single entry and never cascades; descendants become
//!   unreachable until a later `set_children` or full rebuild drops or
//!   re-parents them.
//! - `set_children` replaces the child list verbatim. Ids without an arena
//!   entry are kept in the list (downstream lookups see a no-op leaf miss,
//!   not a structural error).

use std::collections::{BTreeMap, HashMap, HashSet};

use quire_types::{Block, BlockId};

use crate::error::TreeError;
use crate::Result;

/// Maximum expected tree depth. Rebuild uses this as a circuit breaker:
/// exceeding it indicates a cycle in remote-supplied `children_ids` or a
/// corrupted document, not a real tree.
pub const MAX_TREE_DEPTH: usize = 256;

/// Derived placement of a block within the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePosition {
    /// Parent block, `None` for the root. This is a lookup key into the
    /// arena, never an owning reference.
    pub parent: Option<BlockId>,
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// Index within the parent's `children_ids`.
    pub sibling_index: usize,
    /// Visual indentation. Increases by one per level, except meta blocks
    /// (layout wrappers) inherit their parent's level.
    pub indent_level: usize,
}

/// Arena of blocks plus the derived position view.
pub struct BlockTree {
    /// Root block id, fixed at construction.
    root_id: BlockId,

    /// Blocks indexed by id.
    blocks: BTreeMap<BlockId, Block>,

    /// Derived positions for blocks reachable from the root.
    positions: HashMap<BlockId, NodePosition>,

    /// Tree version (bumped on any mutation).
    version: u64,
}

impl BlockTree {
    /// Create a tree holding just the given root block.
    pub fn new(root: Block) -> Self {
        let root_id = root.id.clone();
        let mut tree = Self {
            root_id,
            blocks: BTreeMap::new(),
            positions: HashMap::new(),
            version: 0,
        };
        tree.blocks.insert(root.id.clone(), root);
        tree.rebuild_positions();
        tree
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The root block id.
    pub fn root_id(&self) -> &BlockId {
        &self.root_id
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of stored blocks (reachable or not).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the arena is empty (never true for a live tree since the root
    /// is pre-inserted, but removal of the root is not special-cased).
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// O(1) lookup by id.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Whether an id has an arena entry.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// The derived position, if the block is reachable from the root.
    pub fn position(&self, id: &BlockId) -> Option<&NodePosition> {
        self.positions.get(id)
    }

    /// Parent id from the derived view.
    pub fn parent(&self, id: &BlockId) -> Option<&BlockId> {
        self.positions.get(id).and_then(|p| p.parent.as_ref())
    }

    /// A block's child list (empty for unknown ids).
    pub fn children(&self, id: &BlockId) -> &[BlockId] {
        self.blocks
            .get(id)
            .map(|b| b.children_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Ids in document order (pre-order walk of the reachable tree).
    pub fn ids_ordered(&self) -> Vec<BlockId> {
        let mut out = Vec::with_capacity(self.positions.len());
        let mut stack = vec![self.root_id.clone()];
        let mut seen: HashSet<BlockId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(block) = self.blocks.get(&id) else {
                continue;
            };
            out.push(id);
            for child in block.children_ids.iter().rev() {
                stack.push(child.clone());
            }
        }
        out
    }

    /// Blocks in document order.
    pub fn blocks_ordered(&self) -> Vec<&Block> {
        self.ids_ordered()
            .iter()
            .filter_map(|id| self.blocks.get(id))
            .collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a new block to the arena.
    ///
    /// Fails with [`TreeError::DuplicateId`] if the id is already present.
    /// The block is not attached anywhere; a later `set_children` on its
    /// parent makes it reachable.
    pub fn insert(&mut self, block: Block) -> Result<()> {
        if self.blocks.contains_key(&block.id) {
            return Err(TreeError::DuplicateId(block.id));
        }
        self.blocks.insert(block.id.clone(), block);
        self.version += 1;
        Ok(())
    }

    /// Delete the entry for `id`.
    ///
    /// Fails with [`TreeError::NotFound`] if absent. Never cascades: the
    /// caller is expected to also apply a corrected `set_children` for the
    /// former parent, delivered in the same event batch.
    pub fn remove(&mut self, id: &BlockId) -> Result<()> {
        if self.blocks.remove(id).is_none() {
            return Err(TreeError::NotFound(id.clone()));
        }
        self.version += 1;
        self.rebuild_positions();
        Ok(())
    }

    /// Replace `parent_id`'s child list with `ids` verbatim and rebuild the
    /// derived positions.
    ///
    /// Ids are not validated against the arena. An absent parent is a no-op
    /// with a diagnostic: the root is pre-inserted at document open, so a
    /// miss means the event stream got ahead of itself.
    pub fn set_children(&mut self, parent_id: &BlockId, ids: Vec<BlockId>) {
        let Some(parent) = self.blocks.get_mut(parent_id) else {
            tracing::warn!(parent = %parent_id, "set_children on unknown parent, skipping");
            return;
        };
        parent.children_ids = ids;
        self.version += 1;
        self.rebuild_positions();
    }

    /// Fetch the block for `id`, apply `mutator`, and write it back.
    ///
    /// Fails with [`TreeError::NotFound`] if absent; callers branch on this
    /// to decide whether an update signal is warranted. Structural changes
    /// must go through `set_children`; if a mutator edits `children_ids` or
    /// flips the meta classification anyway, the derived view is rebuilt so
    /// it cannot go stale.
    pub fn update<F>(&mut self, id: &BlockId, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Block),
    {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| TreeError::NotFound(id.clone()))?;

        let children_before = block.children_ids.clone();
        let was_meta = block.is_meta();
        mutator(block);
        let structure_changed =
            block.children_ids != children_before || block.is_meta() != was_meta;

        self.version += 1;
        if structure_changed {
            tracing::warn!(block = %id, "update changed tree structure, rebuilding positions");
            self.rebuild_positions();
        }
        Ok(())
    }

    // =========================================================================
    // Derived positions
    // =========================================================================

    /// Recompute the position view by walking `children_ids` from the root.
    ///
    /// Child depth = parent depth + 1; sibling index = array index; indent
    /// level = parent indent + 1, except a meta block inherits the parent's
    /// indent. Visited-set plus depth cap guard against cycles and duplicate
    /// child references in remote-supplied ids.
    fn rebuild_positions(&mut self) {
        self.positions.clear();

        let Some(_) = self.blocks.get(&self.root_id) else {
            return;
        };
        self.positions.insert(
            self.root_id.clone(),
            NodePosition {
                parent: None,
                depth: 0,
                sibling_index: 0,
                indent_level: 0,
            },
        );

        let mut stack: Vec<BlockId> = vec![self.root_id.clone()];

        while let Some(parent_id) = stack.pop() {
            let (parent_depth, parent_indent) = {
                let pos = &self.positions[&parent_id];
                (pos.depth, pos.indent_level)
            };
            if parent_depth >= MAX_TREE_DEPTH {
                tracing::warn!(
                    "position rebuild hit MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), truncating"
                );
                continue;
            }

            let child_ids = match self.blocks.get(&parent_id) {
                Some(parent) => parent.children_ids.clone(),
                None => continue,
            };

            for (index, child_id) in child_ids.iter().enumerate() {
                if self.positions.contains_key(child_id) {
                    tracing::warn!(
                        block = %child_id,
                        "child referenced twice during rebuild (cycle or duplicate), skipping"
                    );
                    continue;
                }
                let Some(child) = self.blocks.get(child_id) else {
                    // Listed id without an arena entry: stays in the child
                    // list, gets no position.
                    continue;
                };

                let indent_level = if child.is_meta() {
                    parent_indent
                } else {
                    parent_indent + 1
                };
                self.positions.insert(
                    child_id.clone(),
                    NodePosition {
                        parent: Some(parent_id.clone()),
                        depth: parent_depth + 1,
                        sibling_index: index,
                        indent_level,
                    },
                );
                stack.push(child_id.clone());
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
