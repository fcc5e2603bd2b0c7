//! Body views and editors on top of `micro-body`.
//!
//! [`BodyView`] renders a read-only body through the pending / decoded / failed
//! projection, keeping the user's choice of interpretation between updates.
//! [`EditableBody`] sits between a host-owned byte buffer and a text editor.

mod editable;
mod format;
mod selection;
mod view;

pub mod watch;

pub use editable::EditableBody;
pub use editable::EditorContent;
pub use format::BodyFormatter;
pub use format::FormatError;
pub use format::Formatter;
pub use selection::EditableContentTypeBinding;
pub use selection::EditableSelection;
pub use selection::SelectionBinding;
pub use view::BodyView;
pub use view::BodyViewBuilder;
pub use view::BodyViewState;
pub use view::EncodedInspection;
