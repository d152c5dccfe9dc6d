//! Client-side runtime for quire reading pages.
//!
//! This crate provides the HTTP fetch pipeline, keyboard navigation between
//! pages and the offline worker cache, shared by the reader server.

pub mod fetch;
pub mod keynav;
pub mod offline;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};
pub use keynav::{HtmlPage, Key, KeyEvent, KeyNav, KeyUpListeners, NavLink, PendingNavigation, Subscription};
pub use offline::{HostCapabilities, LocalWorkerContainer, ResponseSource, RouteResponse, ServiceWorker, register_on_load};
