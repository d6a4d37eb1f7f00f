//! Built-in node kinds.
//!
//! These exist to exercise the plugin contract end to end; presentation is
//! limited to a default tag mapping.

mod embed;
mod list;
mod paragraph;
mod root;
mod text;

pub use embed::{Embed, HardBreak};
pub use list::{List, ListItem, ListItemContent};
pub use paragraph::Paragraph;
pub use root::Root;
pub use text::Text;

use crate::plugin::PluginRegistry;

/// Register every built-in kind, in parse-priority order
pub fn register_defaults(registry: &mut PluginRegistry) {
    registry
        .register(Root)
        .register(Paragraph)
        .register(List)
        .register(ListItem)
        .register(ListItemContent)
        .register(Embed)
        .register(HardBreak)
        .register(Text);
}
