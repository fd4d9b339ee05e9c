// ABOUTME: Regression harness running fixed prompts against the live backend.
// ABOUTME: Each case checks the response for expected keywords; exits nonzero on failure.

use std::sync::Arc;

use anyhow::Result;
use laws_agent::{stream, AgentConfig, BackendRegistry, QueryOptions};

struct TestCase {
    prompt: &'static str,
    expect_contains: &'static [&'static str],
}

const CASES: &[TestCase] = &[
    TestCase {
        prompt: "Jaký je název zákona č. 283/2021 Sb.?",
        expect_contains: &["stavební"],
    },
    TestCase {
        prompt: "Existuje v workspace složka laws?",
        expect_contains: &["laws"],
    },
];

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(AgentConfig::resolve()?);
    let registry = BackendRegistry::new(config);

    let mut passed = 0;
    let mut failed = 0;

    for (i, case) in CASES.iter().enumerate() {
        println!("\n[{}/{}] {}", i + 1, CASES.len(), case.prompt);

        let deltas = stream::text_stream(&registry, QueryOptions::new(case.prompt));
        let result = match deltas.collect_text().await {
            Ok(text) => text,
            Err(e) => {
                println!("  ✗ FAIL: {e}");
                failed += 1;
                continue;
            }
        };

        let lower = result.to_lowercase();
        let missing: Vec<&str> = case
            .expect_contains
            .iter()
            .copied()
            .filter(|kw| !lower.contains(&kw.to_lowercase()))
            .collect();

        if missing.is_empty() {
            println!("  ✓ PASS");
            passed += 1;
        } else {
            println!("  ✗ FAIL: missing {}", missing.join(", "));
            let preview: String = result.chars().take(200).collect();
            println!("  Response (first 200 chars): {preview}");
            failed += 1;
        }
    }

    println!("\n--- Results: {passed} passed, {failed} failed ---");
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
