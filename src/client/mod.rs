pub mod bot;
pub mod input;
pub mod master_api;
pub mod net;
pub mod profile;
pub mod ui;
