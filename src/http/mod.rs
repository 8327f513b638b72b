// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP transport
//!
//! Probe client and the deduplicated external-script cache. All timeout,
//! redirect and proxy behavior is configured here; the analysis core is
//! transport-free.

mod client;
mod script_cache;

pub use client::{HttpClient, HttpClientConfig, ProbeResponse, DEFAULT_USER_AGENT};
pub use script_cache::{ScriptCache, ScriptCacheStats, DEFAULT_FETCH_CONCURRENCY};
