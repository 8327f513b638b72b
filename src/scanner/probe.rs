// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Probe construction and URL parameter injection

use url::Url;

/// Build the injected probe value: marker followed by the
/// special-character alphabet in a fixed order.
pub fn build_probe(marker: &str, alphabet: &[char]) -> String {
    let mut probe = String::with_capacity(marker.len() + alphabet.len());
    probe.push_str(marker);
    probe.extend(alphabet.iter());
    probe
}

/// Extract query parameters from a URL
pub fn extract_parameters(url: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Ok(parsed) = Url::parse(url) {
        for (key, value) in parsed.query_pairs() {
            params.push((key.to_string(), value.to_string()));
        }
    }
    params
}

/// Replace one parameter's value, keeping every other pair intact
pub fn inject_parameter(base_url: &str, param: &str, value: &str) -> String {
    if let Ok(mut parsed) = Url::parse(base_url) {
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| {
                if k == param {
                    (k.to_string(), value.to_string())
                } else {
                    (k.to_string(), v.to_string())
                }
            })
            .collect();

        parsed.set_query(None);
        for (k, v) in pairs {
            parsed.query_pairs_mut().append_pair(&k, &v);
        }
        parsed.to_string()
    } else {
        base_url.to_string()
    }
}
