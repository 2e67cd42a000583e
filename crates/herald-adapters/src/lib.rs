pub mod chat;
pub mod paging;
pub mod persistence;
