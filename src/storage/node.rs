use nom::IResult;
use nom::Parser;
use nom::multi::count;
use nom::number::complete::le_u32;

use crate::error::{TreeError, TreeResult};
use crate::storage::page::{
    get_internal_num_keys, get_internal_right_child, get_leaf_num_cells, internal_cell_offset,
    read_u32, set_internal_num_keys, set_internal_right_child, set_is_root, set_leaf_num_cells,
    set_node_type, set_parent, write_u32, NodeHeader, NodeKind, INTERNAL_NODE_CHILD_SIZE,
    INTERNAL_NODE_HEADER_SIZE, INTERNAL_NODE_MAX_CELLS, INVALID_PAGE_NUM, LEAF_NODE_MAX_CELLS,
    PAGE_SIZE,
};
use crate::storage::pager::Page;

/// One entry of an internal node: the child holding keys up to `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub child: u32,
    pub key: u32,
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Internal => "internal",
        NodeKind::Leaf => "leaf",
    }
}

fn expect_kind(page: &Page, expected: NodeKind) -> TreeResult<NodeHeader> {
    let header = NodeHeader::decode(page)?;
    if header.kind != expected {
        return Err(TreeError::WrongNodeKind {
            expected: kind_name(expected),
            found: kind_name(header.kind),
        });
    }
    Ok(header)
}

/// A page known to hold a leaf node.
#[derive(Debug, Clone, Copy)]
pub struct LeafNode<'a> {
    page: &'a Page,
    header: NodeHeader,
}

impl<'a> LeafNode<'a> {
    pub fn new(page: &'a Page) -> TreeResult<Self> {
        let header = expect_kind(page, NodeKind::Leaf)?;
        Ok(LeafNode { page, header })
    }

    pub fn header(&self) -> NodeHeader {
        self.header
    }

    pub fn num_cells(&self) -> u32 {
        get_leaf_num_cells(&self.page.data)
    }

    /// Decoding accepts any count; this reports one the format cannot hold.
    pub fn check_capacity(&self) -> TreeResult<()> {
        let num_cells = self.num_cells();
        if num_cells as usize > LEAF_NODE_MAX_CELLS {
            return Err(TreeError::CellCountOverflow {
                count: num_cells,
                max: LEAF_NODE_MAX_CELLS,
            });
        }
        Ok(())
    }
}

/// A page known to hold an internal node whose key count fits in the page.
#[derive(Debug, Clone, Copy)]
pub struct InternalNode<'a> {
    page: &'a Page,
    header: NodeHeader,
    num_keys: u32,
}

fn parse_cell(input: &[u8]) -> IResult<&[u8], Cell> {
    let (input, child) = le_u32(input)?;
    let (input, key) = le_u32(input)?;
    Ok((input, Cell { child, key }))
}

impl<'a> InternalNode<'a> {
    pub fn new(page: &'a Page) -> TreeResult<Self> {
        let header = expect_kind(page, NodeKind::Internal)?;
        let num_keys = get_internal_num_keys(&page.data);
        if num_keys as usize > INTERNAL_NODE_MAX_CELLS {
            return Err(TreeError::CellCountOverflow {
                count: num_keys,
                max: INTERNAL_NODE_MAX_CELLS,
            });
        }
        Ok(InternalNode {
            page,
            header,
            num_keys,
        })
    }

    pub fn header(&self) -> NodeHeader {
        self.header
    }

    pub fn num_keys(&self) -> u32 {
        self.num_keys
    }

    pub fn right_child(&self) -> u32 {
        get_internal_right_child(&self.page.data)
    }

    pub fn cell(&self, index: usize) -> TreeResult<Cell> {
        if index >= self.num_keys as usize {
            return Err(TreeError::CellOutOfBounds {
                index,
                count: self.num_keys,
            });
        }
        let offset = internal_cell_offset(index);
        Ok(Cell {
            child: read_u32(&self.page.data, offset),
            key: read_u32(&self.page.data, offset + INTERNAL_NODE_CHILD_SIZE),
        })
    }

    /// Decode the whole cell array in one pass.
    pub fn cells(&self) -> TreeResult<Vec<Cell>> {
        let body = &self.page.data[INTERNAL_NODE_HEADER_SIZE..];
        let (_, cells) = count(parse_cell, self.num_keys as usize)
            .parse(body)
            .map_err(|e| match e {
                nom::Err::Error(err) | nom::Err::Failure(err) => TreeError::Truncated(format!(
                    "{:?} at byte {}",
                    err.code,
                    PAGE_SIZE - err.input.len()
                )),
                nom::Err::Incomplete(_) => TreeError::Truncated("incomplete input".into()),
            })?;
        Ok(cells)
    }

    pub fn children(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_keys as usize)
            .map(|i| read_u32(&self.page.data, internal_cell_offset(i)))
    }

    /// Every child reference (cells, then the right child) not below `page_count`.
    pub fn out_of_range_children(&self, page_count: u32) -> Vec<u32> {
        self.children()
            .chain(std::iter::once(self.right_child()))
            .filter(|&child| child >= page_count)
            .collect()
    }
}

/// A decoded page, tagged by node kind.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Leaf(LeafNode<'a>),
    Internal(InternalNode<'a>),
}

impl<'a> Node<'a> {
    pub fn decode(page: &'a Page) -> TreeResult<Self> {
        match NodeHeader::decode(page)?.kind {
            NodeKind::Leaf => Ok(Node::Leaf(LeafNode::new(page)?)),
            NodeKind::Internal => Ok(Node::Internal(InternalNode::new(page)?)),
        }
    }

    pub fn header(&self) -> NodeHeader {
        match self {
            Node::Leaf(leaf) => leaf.header(),
            Node::Internal(internal) => internal.header(),
        }
    }
}

fn write_common_header(page: &mut Page, kind: NodeKind, is_root: bool, parent: u32) {
    set_node_type(&mut page.data, kind.into());
    set_is_root(&mut page.data, is_root);
    set_parent(&mut page.data, parent);
}

/// Builds a leaf page using the same layout the decoder reads.
#[derive(Debug, Clone)]
pub struct LeafPageBuilder {
    is_root: bool,
    parent: u32,
    num_cells: u32,
}

impl Default for LeafPageBuilder {
    fn default() -> Self {
        LeafPageBuilder {
            is_root: false,
            parent: INVALID_PAGE_NUM,
            num_cells: 0,
        }
    }
}

impl LeafPageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    pub fn parent(mut self, parent: u32) -> Self {
        self.parent = parent;
        self
    }

    pub fn num_cells(mut self, num_cells: u32) -> Self {
        self.num_cells = num_cells;
        self
    }

    pub fn build(self) -> Page {
        let mut page = Page::new();
        write_common_header(&mut page, NodeKind::Leaf, self.is_root, self.parent);
        set_leaf_num_cells(&mut page.data, self.num_cells);
        page
    }
}

/// Builds an internal page; cells are written in the order they were added.
#[derive(Debug, Clone)]
pub struct InternalPageBuilder {
    is_root: bool,
    parent: u32,
    right_child: u32,
    cells: Vec<Cell>,
}

impl Default for InternalPageBuilder {
    fn default() -> Self {
        InternalPageBuilder {
            is_root: false,
            parent: INVALID_PAGE_NUM,
            right_child: INVALID_PAGE_NUM,
            cells: Vec::new(),
        }
    }
}

impl InternalPageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    pub fn parent(mut self, parent: u32) -> Self {
        self.parent = parent;
        self
    }

    pub fn right_child(mut self, right_child: u32) -> Self {
        self.right_child = right_child;
        self
    }

    pub fn cell(mut self, child: u32, key: u32) -> Self {
        self.cells.push(Cell { child, key });
        self
    }

    pub fn build(self) -> TreeResult<Page> {
        if self.cells.len() > INTERNAL_NODE_MAX_CELLS {
            return Err(TreeError::CellCountOverflow {
                count: self.cells.len() as u32,
                max: INTERNAL_NODE_MAX_CELLS,
            });
        }

        let mut page = Page::new();
        write_common_header(&mut page, NodeKind::Internal, self.is_root, self.parent);
        set_internal_num_keys(&mut page.data, self.cells.len() as u32);
        set_internal_right_child(&mut page.data, self.right_child);
        for (i, cell) in self.cells.iter().enumerate() {
            let offset = internal_cell_offset(i);
            write_u32(&mut page.data, offset, cell.child);
            write_u32(&mut page.data, offset + INTERNAL_NODE_CHILD_SIZE, cell.key);
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::INTERNAL_NODE_CELL_SIZE;

    #[test]
    fn leaf_num_cells_round_trips() {
        let page = LeafPageBuilder::new().num_cells(3).build();
        let leaf = LeafNode::new(&page).unwrap();
        assert_eq!(leaf.num_cells(), 3);
        assert_eq!(leaf.num_cells(), leaf.num_cells());
        assert!(leaf.check_capacity().is_ok());
    }

    #[test]
    fn leaf_capacity_is_reported_not_enforced() {
        let page = LeafPageBuilder::new().num_cells(14).build();
        let leaf = LeafNode::new(&page).unwrap();
        assert_eq!(leaf.num_cells(), 14);
        assert!(matches!(
            leaf.check_capacity(),
            Err(TreeError::CellCountOverflow { count: 14, max: 13 })
        ));
    }

    #[test]
    fn internal_cells_round_trip_in_order() {
        let page = InternalPageBuilder::new()
            .is_root(true)
            .right_child(5)
            .cell(1, 10)
            .cell(2, 20)
            .build()
            .unwrap();
        let node = InternalNode::new(&page).unwrap();

        assert_eq!(node.num_keys(), 2);
        assert_eq!(node.right_child(), 5);
        assert_eq!(node.cell(0).unwrap(), Cell { child: 1, key: 10 });
        assert_eq!(node.cell(1).unwrap(), Cell { child: 2, key: 20 });
        assert_eq!(node.children().collect::<Vec<_>>(), vec![1, 2]);
        assert!(node.header().is_root);
        assert_eq!(node.header().parent, None);
    }

    #[test]
    fn cell_past_num_keys_is_rejected() {
        let page = InternalPageBuilder::new()
            .right_child(9)
            .cell(4, 40)
            .build()
            .unwrap();
        let node = InternalNode::new(&page).unwrap();
        assert!(node.cell(0).is_ok());
        assert!(matches!(
            node.cell(1),
            Err(TreeError::CellOutOfBounds { index: 1, count: 1 })
        ));
    }

    #[test]
    fn empty_internal_node_keeps_right_child() {
        let page = InternalPageBuilder::new().right_child(7).build().unwrap();
        let node = InternalNode::new(&page).unwrap();
        assert_eq!(node.num_keys(), 0);
        assert_eq!(node.right_child(), 7);
        assert_eq!(node.children().count(), 0);
        assert!(node.cells().unwrap().is_empty());
        assert!(node.cell(0).is_err());
    }

    #[test]
    fn bulk_decode_agrees_with_indexed_access() {
        let mut builder = InternalPageBuilder::new().right_child(1000);
        for i in 0..INTERNAL_NODE_MAX_CELLS as u32 {
            builder = builder.cell(i + 1, i * 3);
        }
        let page = builder.build().unwrap();
        let node = InternalNode::new(&page).unwrap();

        let cells = node.cells().unwrap();
        assert_eq!(cells.len(), INTERNAL_NODE_MAX_CELLS);
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(*cell, node.cell(i).unwrap());
        }
        assert_eq!(
            cells.last().unwrap().key,
            read_u32(&page.data, internal_cell_offset(INTERNAL_NODE_MAX_CELLS - 1) + 4)
        );
        assert!(internal_cell_offset(INTERNAL_NODE_MAX_CELLS - 1) + INTERNAL_NODE_CELL_SIZE <= PAGE_SIZE);
    }

    #[test]
    fn builder_rejects_too_many_cells() {
        let mut builder = InternalPageBuilder::new();
        for i in 0..=INTERNAL_NODE_MAX_CELLS as u32 {
            builder = builder.cell(i, i);
        }
        assert!(matches!(
            builder.build(),
            Err(TreeError::CellCountOverflow { count: 511, max: 510 })
        ));
    }

    #[test]
    fn oversized_num_keys_fails_decode() {
        let mut page = InternalPageBuilder::new().build().unwrap();
        set_internal_num_keys(&mut page.data, 511);
        assert!(matches!(
            InternalNode::new(&page),
            Err(TreeError::CellCountOverflow { count: 511, .. })
        ));
    }

    #[test]
    fn codecs_check_node_kind() {
        let leaf_page = LeafPageBuilder::new().build();
        assert!(matches!(
            InternalNode::new(&leaf_page),
            Err(TreeError::WrongNodeKind { expected: "internal", found: "leaf" })
        ));

        let mut bad = Page::new();
        set_node_type(&mut bad.data, 9);
        assert!(matches!(LeafNode::new(&bad), Err(TreeError::UnknownNodeKind(9))));
        assert!(matches!(Node::decode(&bad), Err(TreeError::UnknownNodeKind(9))));
    }

    #[test]
    fn out_of_range_children_include_right_child() {
        let page = InternalPageBuilder::new()
            .right_child(8)
            .cell(1, 10)
            .cell(6, 20)
            .build()
            .unwrap();
        let node = InternalNode::new(&page).unwrap();
        assert_eq!(node.out_of_range_children(4), vec![6, 8]);
        assert!(node.out_of_range_children(9).is_empty());
    }

    #[test]
    fn node_decode_dispatches_on_kind() {
        let page = LeafPageBuilder::new().parent(2).num_cells(1).build();
        match Node::decode(&page).unwrap() {
            Node::Leaf(leaf) => assert_eq!(leaf.num_cells(), 1),
            Node::Internal(_) => panic!("expected leaf"),
        }
        assert_eq!(Node::decode(&page).unwrap().header().parent, Some(2));
    }
}
