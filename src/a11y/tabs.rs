//! Arrow-key navigation within a tab list.

use tracing::trace;

use crate::config::RuntimeConfig;
use crate::events::Key;
use crate::host::Host;

/// Move focus between sibling tabs. Returns true when the key was consumed
/// and the browser default must be suppressed.
///
/// Right/Down step forward and Left/Up step back, wrapping at either end;
/// Home and End jump to the first and last tab. The new tab is focused and
/// clicked so the page's own tab switching runs.
pub fn navigate_tabs<H: Host>(
    target: &H::Handle,
    key: Key,
    host: &mut H,
    config: &RuntimeConfig,
) -> bool {
    if !matches!(
        key,
        Key::ArrowRight | Key::ArrowDown | Key::ArrowLeft | Key::ArrowUp | Key::Home | Key::End
    ) {
        return false;
    }
    let Some(tabs) = host.tab_group(target, config) else {
        return false;
    };
    if tabs.len() < 2 {
        return false;
    }
    let Some(current) = tabs.iter().position(|t| t == target) else {
        return false;
    };
    let last = tabs.len() - 1;
    let next = match key {
        Key::ArrowRight | Key::ArrowDown => (current + 1) % tabs.len(),
        Key::ArrowLeft | Key::ArrowUp => current.checked_sub(1).unwrap_or(last),
        Key::Home => 0,
        Key::End => last,
        _ => current,
    };
    trace!(from = current, to = next, "Tab navigation");
    let tab = &tabs[next];
    host.focus(tab);
    host.click(tab);
    true
}
