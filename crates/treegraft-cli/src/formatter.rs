//! Run summaries.

use comfy_table::{Cell, Table};
use treegraft_core::{IdentityMap, RunReport};

/// Format a run report as a table, one row per type.
pub fn format_report(report: &RunReport, committed: bool) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Type", "Created", "Reused"]);

    let mut types: Vec<&String> = report.created.keys().chain(report.reused.keys()).collect();
    types.sort();
    types.dedup();
    for type_name in types {
        table.add_row(vec![
            Cell::new(type_name),
            Cell::new(report.created.get(type_name).copied().unwrap_or(0)),
            Cell::new(report.reused.get(type_name).copied().unwrap_or(0)),
        ]);
    }

    let mut output = table.to_string();
    output.push_str(&format!(
        "\n{} created, {} reused, {} patched, {} rewritten, {} unreferenced",
        report.total_created(),
        report.total_reused(),
        report.deferred_patched,
        report.many_rewritten,
        report.unreferenced.len()
    ));
    if !committed {
        output.push_str("\ndry run: nothing committed");
    }
    output
}

/// Format cross-linked records as a table.
pub fn format_shared(shared: &IdentityMap) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Type", "Identities"]);

    for (type_name, identities) in shared {
        let ids: Vec<String> = identities.iter().map(ToString::to_string).collect();
        table.add_row(vec![type_name.clone(), ids.join(", ")]);
    }

    table.to_string()
}
