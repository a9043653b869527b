pub mod chat_area;
pub mod input_bar;
pub mod message_view;
pub mod sidebar;
pub mod welcome;
