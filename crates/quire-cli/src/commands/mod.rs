pub mod add;
pub mod changes;
pub mod common;
pub mod completions;
pub mod conflicts;
pub mod delete;
pub mod edit;
pub mod list;
pub mod remote;
pub mod sync;
