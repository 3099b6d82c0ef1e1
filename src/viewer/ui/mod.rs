//! UI rendering module

mod channels;
mod layout;
mod widgets;

pub use layout::render;
