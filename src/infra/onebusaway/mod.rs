mod client;

pub use client::ObaClient;
