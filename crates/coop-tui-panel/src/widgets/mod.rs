//! Building blocks shared by the viewlets.

pub mod form;
pub mod input;
pub mod list;
pub mod picker;

pub use form::{Field, FieldKind, Form};
pub use input::TextInput;
pub use picker::{Picker, PickerOutcome};
