//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: program text with syntax highlighting and the current line
//! - [`variables`]: bindings of the current record, changes highlighted
//! - [`output`]: cumulative program output and error text
//! - [`status`]: status bar with keybindings and session state
//!
//! Each pane module exports a `render_*` function that draws one frame from
//! borrowed record data plus its own scroll state.

pub mod output;
pub mod source;
pub mod status;
pub mod variables;

pub use output::render_output_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use variables::render_variables_pane;
