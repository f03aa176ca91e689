//! # Guessing Game Client Library
//!
//! A line-based terminal client for the guess-the-number server. It has two
//! concurrent halves:
//!
//! - a receiver task printing every server line as `Servidor: ...`, stopping
//!   when the server echoes the disconnect sentinel or closes the connection
//! - the main task forwarding each line typed by the user, stopping once the
//!   user types the sentinel
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("localhost:12345").await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
