pub mod paging;

pub use paging::Paging;
