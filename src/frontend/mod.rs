//! Frontend glue for UI shells
//!
//! Nothing in here draws. A shell (web, native or terminal) owns an
//! [`EditorSession`], feeds it the [`EditorAction`]s its views emit, drains
//! the [`NotificationCenter`] once per frame and renders each page through a
//! [`PageBoundary`].
//!
//! # Submodules
//!
//! - [`state`] - Action enum and the session that dispatches it
//! - [`notify`] - Notification channel (crossbeam)
//! - [`boundary`] - Panic boundary for page rendering

pub mod boundary;
pub mod notify;
pub mod state;

pub use boundary::{PageBoundary, PageFailure};
pub use notify::{Notice, NoticeLevel, NotificationCenter, Notifier};
pub use state::{Dispatch, EditorAction, EditorSession};
