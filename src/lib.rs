//! content-lifecycle - Workflow-gated document lifecycle coordination
//!
//! Drives documents in a hierarchical, versioned content repository through
//! their lifecycle: create, edit, commit, publish, take offline, delete,
//! copy and translate. Every step is performed by the repository's own
//! workflows and only after the repository reports the step as available.
//! Binary assets (images, files) are imported into gallery folders.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`engine`] - Coordinators: Resolve → Gate → Invoke, errors and rollback
//! - [`binding`] - Source records, binding filters and the field binder
//! - [`store`] - Single gateway for all repository reads, writes and workflows
//! - [`core`] - Domain types, node snapshots, document state and configuration
//!
//! # Correctness Invariants
//!
//! 1. No workflow action runs without a hint check made just before it
//! 2. At most one draft exists per document, held by one user
//! 3. Repository-owned properties are never overwritten by binding
//! 4. Failures roll back pending session changes and keep their cause
//!
//! # Example
//!
//! ```
//! use content_lifecycle::engine::{DocumentManager, ErrorKind};
//! use content_lifecycle::store::memory::MemoryStore;
//!
//! let mut store = MemoryStore::new();
//! store.seed_folder("/content/documents", None).unwrap();
//! let mut manager = DocumentManager::new(store);
//!
//! let news = manager
//!     .create_document("/content/documents", "myapp:article", "news", "en", "News")
//!     .unwrap();
//! manager.obtain_editable_document(news.as_str()).unwrap();
//!
//! let err = manager.obtain_editable_document(news.as_str()).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::IllegalState);
//! ```

pub mod binding;
pub mod core;
pub mod engine;
pub mod store;
