//! File bridge: two small HTTP services over the local filesystem
//!
//! - content service: `POST /process` reads a file as UTF-8 text and returns it as JSON
//! - browser service: `GET /list/<path>` lists a directory, `GET /file/<path>` serves bytes

pub mod config;
pub mod files;
pub mod http;
pub mod logger;
pub mod server;
pub mod service;
