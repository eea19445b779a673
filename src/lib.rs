//! Live minimap thumbnails for a host's open document views.
//!
//! The host owns the documents and their rendered surfaces. This crate keeps
//! a scaled copy of each surface in an isolated thumbnail frame, tracks the
//! viewport with a draggable slider, and follows resizes, mode switches and
//! edits as the host reports them.
//!
//! Everything runs on the host's UI thread. Timed waits are modelled as
//! deferred tasks on a caller-driven millisecond clock: the host calls
//! [`engine::Engine::tick`] from its event loop.

pub mod color;
pub mod coords;
pub mod engine;
pub mod host;
pub mod instance;
pub mod markup;
pub mod mirror;
pub mod observe;
pub mod schedule;
pub mod settings;
pub mod shadow;
pub mod watch;
