pub mod checklist;
pub mod collection;
pub mod pick;
