#![doc = include_str!("../README.md")]

pub mod client;
pub mod connection;
pub mod convert;
pub mod gateway;

pub use client::ThriftClient;
pub use connection::Connection;
pub use gateway::GatewayHandler;
