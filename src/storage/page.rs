// ┌─────────────────────────────────────────────────────────────────────────┐
// │ Offset │ Length │ Description                                           │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │   0    │   1    │ NODE_TYPE (0 = internal, 1 = leaf)                    │
// │   1    │   1    │ IS_ROOT   (0 = false, 1 = true)                       │
// │   2    │   4    │ PARENT_PAGE (u32): parent page, u32::MAX if none      │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │   6    │   4    │ LEAF:     NUM_CELLS (u32)                             │
// │   6    │   4    │ INTERNAL: NUM_KEYS (u32)                              │
// │  10    │   4    │ INTERNAL: RIGHT_CHILD (u32)                           │
// │  14    │ 8 * k  │ INTERNAL: cells [child u32][key u32] ...              │
// └─────────────────────────────────────────────────────────────────────────┘
//
// All integers are little-endian.

use std::fmt;

use crate::error::{TreeError, TreeResult};
use crate::storage::pager::Page;

pub const PAGE_SIZE: usize = 4096;

/// Default number of pages the inspector attempts before stopping.
pub const TABLE_MAX_PAGES: u32 = 100;

/// Parent pointer value meaning "this node has no parent".
pub const INVALID_PAGE_NUM: u32 = u32::MAX;

// Common node header
pub const NODE_TYPE_SIZE: usize = 1;
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = 1;
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = 4;
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header and body
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize = COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE;

/// A leaf row is an id, a 32 byte username and a 255 byte email.
pub const ROW_SIZE: usize = 4 + 32 + 255;
pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + ROW_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

// Internal node header and body
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_MAX_CELLS: usize = INTERNAL_NODE_SPACE_FOR_CELLS / INTERNAL_NODE_CELL_SIZE;

pub const NODE_INTERNAL: u8 = 0;
pub const NODE_LEAF: u8 = 1;

/// The discriminant stored in the first byte of every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal,
    Leaf,
}

impl TryFrom<u8> for NodeKind {
    type Error = TreeError;

    fn try_from(byte: u8) -> TreeResult<Self> {
        match byte {
            NODE_INTERNAL => Ok(NodeKind::Internal),
            NODE_LEAF => Ok(NodeKind::Leaf),
            other => Err(TreeError::UnknownNodeKind(other)),
        }
    }
}

impl From<NodeKind> for u8 {
    fn from(kind: NodeKind) -> u8 {
        match kind {
            NodeKind::Internal => NODE_INTERNAL,
            NodeKind::Leaf => NODE_LEAF,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Internal => write!(f, "INTERNAL"),
            NodeKind::Leaf => write!(f, "LEAF"),
        }
    }
}

/// The common header present at the start of every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub kind: NodeKind,
    pub is_root: bool,
    pub parent: Option<u32>,
}

impl NodeHeader {
    /// Decode the common header. Only the kind byte is validated.
    pub fn decode(page: &Page) -> TreeResult<Self> {
        let kind = NodeKind::try_from(get_node_type(&page.data))?;
        let parent = match get_parent(&page.data) {
            INVALID_PAGE_NUM => None,
            p => Some(p),
        };
        Ok(NodeHeader {
            kind,
            is_root: get_is_root(&page.data) == 1,
            parent,
        })
    }
}

/// Little-endian u32 at `offset`. All multi-byte header fields use this
/// and `write_u32`.
pub(crate) fn read_u32(page: &[u8; PAGE_SIZE], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&page[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

pub(crate) fn write_u32(page: &mut [u8; PAGE_SIZE], offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Raw discriminant byte; `NodeKind::try_from` decides whether it is valid.
pub fn get_node_type(page: &[u8; PAGE_SIZE]) -> u8 {
    page[NODE_TYPE_OFFSET]
}

pub fn set_node_type(page: &mut [u8; PAGE_SIZE], node_type: u8) {
    page[NODE_TYPE_OFFSET] = node_type;
}

/// Raw root byte. Only 1 means root; `NodeHeader::decode` treats every
/// other value as false.
pub fn get_is_root(page: &[u8; PAGE_SIZE]) -> u8 {
    page[IS_ROOT_OFFSET]
}

pub fn set_is_root(page: &mut [u8; PAGE_SIZE], is_root: bool) {
    page[IS_ROOT_OFFSET] = u8::from(is_root);
}

/// Parent page index, or `INVALID_PAGE_NUM` for a node with no parent.
pub fn get_parent(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, PARENT_POINTER_OFFSET)
}

/// Pass `INVALID_PAGE_NUM` to mark the root.
pub fn set_parent(page: &mut [u8; PAGE_SIZE], parent: u32) {
    write_u32(page, PARENT_POINTER_OFFSET, parent);
}

pub fn get_leaf_num_cells(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, LEAF_NODE_NUM_CELLS_OFFSET)
}

pub fn set_leaf_num_cells(page: &mut [u8; PAGE_SIZE], num_cells: u32) {
    write_u32(page, LEAF_NODE_NUM_CELLS_OFFSET, num_cells);
}

pub fn get_internal_num_keys(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, INTERNAL_NODE_NUM_KEYS_OFFSET)
}

pub fn set_internal_num_keys(page: &mut [u8; PAGE_SIZE], num_keys: u32) {
    write_u32(page, INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys);
}

pub fn get_internal_right_child(page: &[u8; PAGE_SIZE]) -> u32 {
    read_u32(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_right_child(page: &mut [u8; PAGE_SIZE], right_child: u32) {
    write_u32(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET, right_child);
}

/// Byte offset of internal cell `cell_num`. Callers must keep
/// `cell_num < INTERNAL_NODE_MAX_CELLS`.
pub fn internal_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}
