//! This crate exposes the internal functionality of the frontprobe scanner.
//!
//! frontprobe looks for addresses that currently behave like a TLS frontend
//! for a given service. Each candidate must accept a TCP connection on port
//! 443, complete a TLS handshake for the frontend's virtual host and answer a
//! pair of pipelined HTTP/1.1 requests with status `200` and a known `Server`
//! signature.
//!
//! ## Architecture Overview
//!
//! 1. **Range parsing**: [`address::parse_ranges`] expands CIDR blocks,
//!    octet ranges and domain names into candidate addresses
//! 2. **Pool**: the candidates are held in an [`pool::AddressPool`]
//! 3. **Dispatch**: a [`dispatcher::Dispatcher`] draws candidates according to
//!    a [`dispatcher::SelectionPolicy`] and runs one probe task per candidate
//! 4. **Probing**: a [`prober::Prober`] retries a [`prober::Connector`]
//!    attempt until it succeeds or runs out of tries
//!
//! ## Basic Usage Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use frontprobe::address::{get_resolver, parse_ranges};
//! use frontprobe::dispatcher::{Dispatcher, SelectionPolicy};
//! use frontprobe::pool::AddressPool;
//! use frontprobe::prober::{FrontendConnector, Prober};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = get_resolver(&None).await;
//!     let ips = parse_ranges("142.250.0-1.1-20", &resolver).await?;
//!
//!     let connector = FrontendConnector::new(Duration::from_millis(1500))?;
//!     let dispatcher = Dispatcher::new(Prober::new(connector, 3), 100, false, false);
//!
//!     let state = dispatcher
//!         .run(AddressPool::from(ips), SelectionPolicy::RandomSample { target: 5 })
//!         .await;
//!     println!("Found {} good addresses", state.good.len());
//!     Ok(())
//! }
//! ```
#![allow(clippy::needless_doctest_main)]

pub mod tui;

pub mod input;

pub mod address;

pub mod pool;

pub mod prober;

pub mod dispatcher;

pub mod ranges;
