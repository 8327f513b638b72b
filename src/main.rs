// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Seitti CLI - Context-Aware XSS Prober

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use seitti::{ScanConfig, ScanPatterns, Scanner};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("seitti=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "scan" => {
            if args.len() < 3 {
                eprintln!("Usage: seitti scan <url>... [--deep] [--blind <url>] [--concurrency <n>] [--json]");
                return ExitCode::from(1);
            }
            scan_targets(&args[2..]).await
        }
        "dom" => {
            if args.len() < 3 {
                eprintln!("Usage: seitti dom <url>");
                return ExitCode::from(1);
            }
            scan_dom(&args[2]).await
        }
        "js" => {
            if args.len() < 3 {
                eprintln!("Usage: seitti js <file>");
                return ExitCode::from(1);
            }
            analyze_js_file(&args[2])
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("seitti {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Seitti - Context-Aware XSS Prober

USAGE:
    seitti <COMMAND> [OPTIONS]

COMMANDS:
    scan <url>...   Probe URL parameters for reflected XSS
    dom <url>       Static DOM XSS analysis of a page
    js <file>       Taint-analyze a JavaScript file
    help            Show this help message
    version         Show version information

SCAN OPTIONS:
    --deep              Fetch and analyze external scripts
    --blind <url>       Deliver blind-XSS payloads calling back to <url>
    --concurrency <n>   Concurrent URL workers (default 10)
    --json              Emit the full report as JSON

EXAMPLES:
    seitti scan "https://example.com/search?q=test"
    seitti scan --deep --json "https://example.com/?page=1"
    seitti dom https://example.com
    seitti js ./bundle.js

For more information, see: https://github.com/bountyyfi/seitti
"#
    );
}

async fn scan_targets(rest: &[String]) -> ExitCode {
    let mut config = ScanConfig::default();
    let mut urls = Vec::new();
    let mut json = false;

    let mut iter = rest.iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--deep" => config.deep = true,
            "--json" => json = true,
            "--blind" => match iter.next() {
                Some(url) => config.blind_url = Some(url.clone()),
                None => {
                    eprintln!("--blind requires a callback URL");
                    return ExitCode::from(1);
                }
            },
            "--concurrency" => match iter.next().and_then(|n| n.parse().ok()) {
                Some(n) => config.concurrency = n,
                None => {
                    eprintln!("--concurrency requires a number");
                    return ExitCode::from(1);
                }
            },
            other if other.starts_with("--") => {
                eprintln!("Unknown option: {}", other);
                return ExitCode::from(1);
            }
            url => urls.push(url.to_string()),
        }
    }

    if urls.is_empty() {
        eprintln!("No target URLs given");
        return ExitCode::from(1);
    }

    let scanner = match Scanner::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to build scanner: {}", e);
            return ExitCode::from(1);
        }
    };

    let results = scanner.scan_urls(&urls).await;

    if json {
        match serde_json::to_string_pretty(&results) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                return ExitCode::from(1);
            }
        }
        let vulnerable = results
            .iter()
            .any(|r| r.parameters.iter().any(|p| p.exploitable));
        return if vulnerable {
            ExitCode::from(2)
        } else {
            ExitCode::SUCCESS
        };
    }

    let mut exploitable_total = 0usize;
    for result in &results {
        println!("\n=== {} ===", result.url);

        if let Some(waf) = result.posture.waf {
            println!("WAF: {}", waf);
        }
        if result.posture.csp.is_some() {
            println!("CSP: present");
        }

        for finding in &result.parameters {
            let verdict = if finding.exploitable {
                exploitable_total += 1;
                "[VULNERABLE]"
            } else {
                "[reflected]"
            };
            println!(
                "{} parameter '{}' in {} context (survived: {})",
                verdict, finding.parameter, finding.context, finding.unfiltered
            );
            if let Some(ref payload) = finding.suggested_payload {
                println!("    payload: {}", payload);
            }
        }

        for finding in &result.dom_findings {
            println!("[DOM] {}", finding);
        }

        for error in &result.errors {
            println!("[error] {}", error);
        }

        if result.parameters.is_empty() && result.dom_findings.is_empty() {
            println!("No reflections or DOM findings");
        }
    }

    if exploitable_total > 0 {
        println!("\n[!] {} exploitable reflection(s) found", exploitable_total);
        ExitCode::from(2)
    } else {
        println!("\n[OK] Nothing exploitable found");
        ExitCode::SUCCESS
    }
}

async fn scan_dom(url: &str) -> ExitCode {
    let patterns = match ScanPatterns::new() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to build pattern tables: {}", e);
            return ExitCode::from(1);
        }
    };

    let client = match seitti::HttpClient::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {}", e);
            return ExitCode::from(1);
        }
    };

    let response = match client.get(url).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to fetch URL: {}", e);
            return ExitCode::from(1);
        }
    };

    let result = seitti::scan_document(&response.body, &patterns);

    if result.findings.is_empty() {
        println!("[OK] No DOM XSS findings");
        if !result.external_scripts.is_empty() {
            println!(
                "{} external script(s) not analyzed (use scan --deep)",
                result.external_scripts.len()
            );
        }
        ExitCode::SUCCESS
    } else {
        println!("[!] DOM findings:");
        for finding in &result.findings {
            println!("  {}", finding);
            if !finding.evidence.is_empty() {
                println!("    evidence: {}", finding.evidence);
            }
        }
        ExitCode::from(2)
    }
}

fn analyze_js_file(path: &str) -> ExitCode {
    let code = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            return ExitCode::from(1);
        }
    };

    let patterns = match ScanPatterns::new() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to build pattern tables: {}", e);
            return ExitCode::from(1);
        }
    };

    let analysis = seitti::analyze_js(&code, &patterns);

    if analysis.findings.is_empty() {
        println!("[OK] No taint flows found");
        ExitCode::SUCCESS
    } else {
        println!("[!] Taint flows:");
        for finding in &analysis.findings {
            println!("  {}", finding);
            if !finding.evidence.is_empty() {
                println!("    evidence: {}", finding.evidence);
            }
        }
        ExitCode::from(2)
    }
}
