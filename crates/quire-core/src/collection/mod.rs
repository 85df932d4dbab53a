//! Local collection state: the item store, the change log, and the editing
//! layer that keeps the two in step.

mod change_log;
mod file;
mod store;
mod workspace;

pub use change_log::ChangeLog;
pub use file::{WorkspaceFile, WORKSPACE_FILE_NAME};
pub use store::Collection;
pub use workspace::Workspace;
