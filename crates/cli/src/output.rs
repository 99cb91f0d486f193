//! Terminal rendering of search outcomes.

use std::fmt::Write;

use hivemind_core::{ResultEntry, SearchOutcome};

/// Render an outcome as a numbered list, or as the error and its details.
pub fn render(outcome: &SearchOutcome, verbose: bool) -> String {
    let mut out = String::new();

    let entries = outcome.to_entries();
    if let Some(ResultEntry::Error(error)) = entries.first() {
        let _ = writeln!(out, "Error: {}", error.error);
        if let Some(details) = &error.details {
            let _ = writeln!(out, "Details: {}", details);
        }
        return out;
    }

    let resources = outcome.resources();
    let _ = writeln!(out, "Found {} relevant resources:\n", resources.len());

    for (i, resource) in resources.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, resource.title);
        let _ = writeln!(out, "   URL: {}", resource.url);
        if verbose {
            let _ = writeln!(out, "   Type: {}", resource.resource_type);
            let _ = writeln!(out, "   Course: {}", resource.course);
            let _ = writeln!(out, "   Module: {}", resource.module);
            let _ = writeln!(out, "   Relevance Score: {:.2}", resource.relevance_score);
        }
        out.push('\n');
    }

    if !verbose {
        out.push_str("\nTo get more details, run with the --verbose flag.\n");
    }
    out
}
