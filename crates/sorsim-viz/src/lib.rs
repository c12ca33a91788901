//! `sorsim-viz` — live terminal renderer for the simulation log.
//!
//! A thin collaborator of the kernel: it tails the log file on an interval,
//! folds each record into a [`ViewState`] and draws a single dashboard with
//! ratatui. It never talks to the kernel directly; the log file is the only
//! interface.

pub mod app;
pub mod tail;
pub mod view;

pub use app::run;
pub use tail::LogTail;
pub use view::ViewState;
