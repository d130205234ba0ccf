//! Session-scoped state
//!
//! One `Session` per assistant process. The read ledger and the todo list live
//! here and are shared with every tool call and every sub-agent spawned from
//! the session.

use std::path::PathBuf;
use std::sync::Arc;

use crate::tools::ledger::ReadLedger;
use crate::tools::todos::TodoStore;
use crate::tools::ToolContext;

#[derive(Debug, Clone)]
pub struct Session {
    pub working_dir: PathBuf,
    pub ledger: Arc<ReadLedger>,
    pub todos: Arc<TodoStore>,
}

impl Session {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ledger: Arc::new(ReadLedger::new()),
            todos: Arc::new(TodoStore::new()),
        }
    }

    /// Tool context bound to this session's state
    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            working_dir: self.working_dir.clone(),
            ledger: Arc::clone(&self.ledger),
            todos: Arc::clone(&self.todos),
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::SystemTime;

    #[test]
    fn test_contexts_share_ledger() {
        let session = Session::new(PathBuf::from("/work"));
        let a = session.tool_context();
        let b = session.tool_context();

        a.ledger.record(Path::new("/work/a.txt"), SystemTime::UNIX_EPOCH);
        assert!(b.ledger.contains(Path::new("/work/a.txt")));
        assert_eq!(b.working_dir, PathBuf::from("/work"));
    }
}
