pub mod table;
pub mod json;

use crate::watch::WatchOutcome;

/// Print the outcome of a watch run.
pub fn print_outcome(outcome: &WatchOutcome, json_output: bool, verbose: bool) {
    if json_output {
        println!("{}", json::render_delta(&outcome.delta));
        return;
    }

    if outcome.delta.is_empty() {
        println!("No changes detected.");
    } else {
        print!("{}", table::render_delta(&outcome.delta));
    }

    if let Some(id) = outcome.snapshot_id {
        println!("\nsnapshot: #{id}");
    } else {
        println!("\ndry run: nothing persisted");
    }

    print_diagnostics(&outcome.diagnostics, verbose);
}

pub fn print_diagnostics(diagnostics: &[String], verbose: bool) {
    if diagnostics.is_empty() {
        return;
    }

    if verbose {
        println!("\nDiagnostics:");
        println!("{}", "-".repeat(40));
        for diagnostic in diagnostics {
            println!("  {diagnostic}");
        }
    } else {
        for diagnostic in diagnostics {
            println!("[diagnostic] {diagnostic}");
        }
    }
}
