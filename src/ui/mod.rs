//! Terminal step viewer built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: session state, keyboard event loop, pane focus, auto-play
//! - **[`panes`]**: render functions for each visible pane (source, variables,
//!   output, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with a
//! [`TraceSequencer`] whose session has begun and call [`App::run`] to start
//! the event loop.
//!
//! [`TraceSequencer`]: crate::sequencer::TraceSequencer
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
