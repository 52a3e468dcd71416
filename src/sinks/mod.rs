pub mod file_sink;
pub mod manager;
pub mod sink_http;
