use ratatui::style::Color;

pub const ACCENT: Color = Color::Rgb(76, 154, 207);
pub const SUCCESS: Color = Color::Green;
pub const RUNNING: Color = Color::Yellow;
pub const FAILURE: Color = Color::Red;
pub const DIM: Color = Color::DarkGray;
pub const TREE: Color = Color::Gray;

/// Node colours in the catalog tree
pub const CATEGORY: Color = Color::Rgb(76, 154, 207);
pub const TOOL: Color = Color::White;
pub const COMMAND: Color = Color::Gray;

/// Echo lines for dispatched commands in the output pane
pub const ECHO: Color = Color::Rgb(76, 154, 207);

pub const TOOLBAR_BG: Color = Color::Rgb(76, 154, 207);
pub const TOOLBAR_KEY_BG: Color = Color::Rgb(40, 40, 40);
pub const TOOLBAR_KEY_FG: Color = Color::Rgb(76, 154, 207);
pub const TOOLBAR_DESC: Color = Color::Black;

pub const DIALOG_BORDER: Color = Color::Rgb(76, 154, 207);
pub const DIALOG_FIELD_BG: Color = Color::Rgb(40, 40, 40);

/// Raw RGB tuple for use with anstyle (CLI messages)
pub const ACCENT_RGB: (u8, u8, u8) = (76, 154, 207);
