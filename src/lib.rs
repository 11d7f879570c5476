pub mod client;
pub mod config;
pub mod game;
pub mod master;
pub mod net;
pub mod session;
pub mod state;
