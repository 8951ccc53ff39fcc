//! Keyboard and screen-reader support: modal focus trap, tab-list arrow
//! navigation and the filter-change live region.

pub mod announce;
pub mod modal;
pub mod tabs;

pub use announce::Announcer;
pub use modal::{FOCUSABLE_SELECTOR, FocusTrap, ModalState};
pub use tabs::navigate_tabs;
