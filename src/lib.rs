//! # Page Extractor
//!
//! A web-content extraction service: fetch a page with the cheapest strategy
//! that yields usable content, then strip it down and pull out its metadata.
//!
//! ## Architecture
//!
//! ```text
//! HTTP / CLI → FetchEscalator → FetchBackend (request | browser | stealth) → clean → meta
//! ```
//!
//! - [`fetcher`]: escalation policies and the lightweight HTTP backend
//! - [`scraper`]: browser backends over a pool of Chromium instances
//! - [`extract`]: HTML cleaning, metadata parsing, content quality checks
//! - [`server`]: axum HTTP API
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the service on 0.0.0.0:8000
//! page-extractor serve
//!
//! # One-off extraction, escalating to a browser if needed
//! page-extractor extract https://example.com -a request -a browser
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context, logging and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Requests, outcomes and strategy identifiers

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires every backend into one
/// [`FetchEscalator`](fetcher::FetchEscalator).
pub mod app;

/// Command-line interface using clap.
///
/// - `serve` - Run the HTTP service
/// - `extract <url>` - Extract one page and print it as JSON
pub mod cli;

/// Service configuration.
///
/// Loads from `~/.config/page-extractor/config.toml`, with per-strategy
/// browser pool settings.
pub mod config;

/// Core domain models.
///
/// - [`FetchRequest`](domain::FetchRequest): URL, strategies, XHR hint, cleaning options
/// - [`FetchOutcome`](domain::FetchOutcome): Extracted content or failure reason
/// - [`StrategyId`](domain::StrategyId): `request`, `browser`, `stealth`
pub mod domain;

/// HTML post-processing shared by every strategy.
pub mod extract;

/// Fetch strategies and escalation.
///
/// - [`FetchBackend`](fetcher::FetchBackend): Async trait every strategy implements
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`FetchEscalator`](fetcher::FetchEscalator): Sequential or racing escalation
pub mod fetcher;

/// Headless browser fetching via chromiumoxide.
///
/// - [`BrowserPool`](scraper::BrowserPool): Fixed-size, self-healing pool of instances
/// - [`BrowserBackend`](scraper::BrowserBackend): Strategy on top of a pool
pub mod scraper;

/// HTTP API built with axum.
pub mod server;
