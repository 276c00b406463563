pub mod node;
pub mod page;
pub mod pager;
