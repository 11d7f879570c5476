pub mod codec;
pub mod dispatcher;
pub mod memory;
pub mod messages;
pub mod session;
pub mod store;
pub mod sync;
pub mod ws;
