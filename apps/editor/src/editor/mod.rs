// Editing sessions: autosave state machine, session wrapper, consumer-facing
// section editor, and the HTTP surface over them.
// Mutators never await; the only suspension point is the store's save call.

pub mod autosave;
pub mod handlers;
pub mod registry;
pub mod section_editor;
pub mod session;

pub use registry::SessionRegistry;
pub use section_editor::EditorSettings;
