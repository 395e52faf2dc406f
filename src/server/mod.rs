// Server module entry
// Listener setup, per-connection serving, the accept loop and shutdown signals

pub mod activity;
pub mod connection;
pub mod listener;
pub mod port_file;
pub mod signal;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::bind_listener;
pub use port_file::publish_port;
pub use server_loop::start_server_loop;
pub use signal::{start_signal_handler, SignalHandler};
