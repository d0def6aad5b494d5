//! Parse contexts and render flags.

use bitflags::bitflags;

/// Where a piece of text is being parsed.
///
/// Type parsers use the context to decide whether literal parsing is
/// allowed at all; an entity, for example, may only be typed literally in a
/// command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParseContext {
    /// A line of a script file.
    #[default]
    Script,
    /// An effect command typed in chat or a console.
    Command,
    /// Text handed to an explicit "parse as" operation.
    Parse,
    /// A configuration value.
    Config,
    /// An event pattern.
    Event,
}

bitflags! {
    /// Flags controlling how values are rendered to text.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        /// Include internal detail for debugging.
        const DEBUG = 1 << 0;
        /// Render for use inside a variable name.
        const VARIABLE_NAME = 1 << 1;
        /// Quote textual values.
        const QUOTED = 1 << 2;
    }
}
