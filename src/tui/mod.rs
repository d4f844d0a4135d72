pub mod app;
pub mod dialog;
pub mod event;
pub mod key_handler;
pub mod log_state;
pub mod output_state;
pub mod render;
pub mod toolbar;
pub mod tree_state;
pub mod tree_widget;
