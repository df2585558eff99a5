//! Acquisition of the remote surface for each display mode.
//!
//! - [`popup`]: centered top-level window, watched by a close poll
//! - [`frame`]: frame mounted into a caller-owned host element
//! - [`redirect`]: full navigation; nothing to watch or release

pub mod frame;
pub mod popup;
pub mod redirect;

pub use frame::resolve_attributes;
pub use popup::PopupGeometry;
