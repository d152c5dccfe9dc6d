//! Offline caching for reading pages.
//!
//! A page registers a worker script on load; the worker then intercepts
//! requests under its scope and resolves each through the strategy bound to
//! the first matching route.

pub mod register;
pub mod routing;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use register::{
    HostCapabilities, LocalWorkerContainer, ServiceWorkerContainer, WorkerHost, WorkerRegistration, register_on_load,
};
pub use routing::{Route, Router};
pub use strategy::{
    CacheFirst, CachingStrategy, NetworkFirst, ResponseSource, RouteResponse, StaleWhileRevalidate, StrategyContext,
    StrategyOutcome, strategy_for,
};
pub use worker::{ServiceWorker, cache_name_for};
