//! Filesystem adapters for entity outputs and the consolidated document.
//!
//! All access goes through `cap_std` directory handles rooted at the
//! configured locations, and every write is an atomic replace.

mod atomic_io;
mod document_writer;
mod entity_store;

pub use document_writer::FilesystemDocumentWriter;
pub use entity_store::FilesystemEntityStore;
