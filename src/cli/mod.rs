pub mod ascii_preview;

pub use ascii_preview::{clear_screen, map_key, AsciiRenderer, KeyboardInput, TerminalView};
