//! # recall-core
//!
//! Core library for Recall, the session lifecycle layer that gives Claude
//! Code a memory across sessions. The hook binary is a thin shell around
//! this crate; everything observable lives here.
//!
//! ## Design Principles
//!
//! - **Synchronous**: Hooks are short-lived processes; no async runtime.
//! - **Graceful degradation**: A missing or broken backend means a session
//!   is not tracked, never a failed hook. Runtime paths warn and carry on.
//! - **One backend call per operation**: Every store method is a single
//!   bounded subprocess invocation, so hook latency stays predictable.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recall_core::{locate_backend, SessionLifecycleManager, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let store = locate_backend(&storage).expect("no backend installed");
//! let manager = SessionLifecycleManager::new(storage, store.as_ref());
//! let outcome = manager.start("my-project", "/work/my-project")?;
//! ```

// Public modules
pub mod error;
pub mod feature;
pub mod format;
pub mod lifecycle;
pub mod pointer;
pub mod recorder;
pub mod settings;
pub mod storage;
pub mod store;

// Re-export commonly used items at crate root
pub use error::{RecallError, Result};
pub use feature::{detect_active_feature, feature_root, ActiveFeature};
pub use format::{format_context_message, format_duration, format_time_ago};
pub use lifecycle::{EndOutcome, EndReport, SessionLifecycleManager, SessionStats, StartOutcome};
pub use pointer::{SessionHandle, SessionPointer, REUSE_WINDOW_MS};
pub use recorder::{classify_tool_event, detect_agent, ToolAction, ToolEvent, ToolEventRecorder};
pub use settings::{ConfigSynchronizer, RegistrationState};
pub use storage::StorageConfig;
pub use store::{
    locate_backend, BinaryStore, FileChangeKind, LastSession, MemoryStore, ScriptStore,
    StepRecord, StoreError,
};
