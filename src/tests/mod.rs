pub mod common;

mod authenticator_flow;
mod refresh_agent;
