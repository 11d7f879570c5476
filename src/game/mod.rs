pub mod collision;
pub mod food;
pub mod grid;
pub mod r#loop;
pub mod math;
pub mod sim;
pub mod snake;
pub mod timers;
pub mod types;
