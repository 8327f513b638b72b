// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! WAF vendor table
//!
//! Header-hint lookup for common web application firewalls, plus the
//! strictness flag the posture judge consumes. Signature matching stays
//! intentionally shallow: a `server` header or a vendor cookie is enough.

use serde::{Deserialize, Serialize};

/// Known WAF vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WafVendor {
    Cloudflare,
    Akamai,
    Imperva,
    AwsWaf,
    ModSecurity,
    Sucuri,
    Generic,
}

impl WafVendor {
    /// Vendors whose default rulesets reliably catch markup payloads
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            WafVendor::Cloudflare | WafVendor::Akamai | WafVendor::Imperva
        )
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            WafVendor::Cloudflare => "Cloudflare",
            WafVendor::Akamai => "Akamai",
            WafVendor::Imperva => "Imperva",
            WafVendor::AwsWaf => "AWS WAF",
            WafVendor::ModSecurity => "ModSecurity",
            WafVendor::Sucuri => "Sucuri",
            WafVendor::Generic => "Unknown WAF",
        }
    }

    /// Detect a WAF from response headers (name, value pairs)
    pub fn from_headers(headers: &[(String, String)]) -> Option<WafVendor> {
        for (name, value) in headers {
            let name = name.to_ascii_lowercase();
            let value = value.to_ascii_lowercase();

            match name.as_str() {
                "cf-ray" | "cf-cache-status" => return Some(WafVendor::Cloudflare),
                "x-akamai-transformed" | "akamai-grn" => return Some(WafVendor::Akamai),
                "x-iinfo" => return Some(WafVendor::Imperva),
                "x-cdn" if value.contains("incapsula") => return Some(WafVendor::Imperva),
                "x-amzn-requestid" | "x-amz-cf-id" => return Some(WafVendor::AwsWaf),
                "x-sucuri-id" | "x-sucuri-cache" => return Some(WafVendor::Sucuri),
                "server" => {
                    if value.contains("cloudflare") {
                        return Some(WafVendor::Cloudflare);
                    }
                    if value.contains("akamai") {
                        return Some(WafVendor::Akamai);
                    }
                    if value.contains("mod_security") || value.contains("modsecurity") {
                        return Some(WafVendor::ModSecurity);
                    }
                    if value.contains("sucuri") {
                        return Some(WafVendor::Sucuri);
                    }
                }
                "set-cookie" => {
                    if value.contains("__cfduid") || value.contains("cf_clearance") {
                        return Some(WafVendor::Cloudflare);
                    }
                    if value.contains("incap_ses") || value.contains("visid_incap") {
                        return Some(WafVendor::Imperva);
                    }
                    if value.contains("awsalb") {
                        return Some(WafVendor::AwsWaf);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

impl std::fmt::Display for WafVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
