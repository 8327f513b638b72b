// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Security posture analysis
//!
//! CSP parsing and bypass detection, WAF vendor hints and the
//! exploitability judge that combines them with the reflection context.

mod csp;
mod posture;
mod waf;

pub use csp::{extract_csp_from_html, CspAnalysis, CspAnalyzer, CspBypass};
pub use posture::{ExploitabilityJudge, SecurityPosture};
pub use waf::WafVendor;
