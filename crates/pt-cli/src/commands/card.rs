use std::fs;
use std::path::Path;

use comfy_table::{ContentArrangement, Table};

use pt_dicecore::{Card, CardOps};

pub fn run(file: &Path) -> Result<(), String> {
    let json = fs::read_to_string(file).map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let card = Card::from_json(&json).map_err(|e| format!("invalid card {}: {e}", file.display()))?;

    let summary = card.summary();
    let mut lines = summary.lines();
    if let Some(title) = lines.next() {
        println!("  {title}");
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Group", "Entry", "Value"]);
    let mut rows = 0;
    for line in lines {
        let (group, values) = line.split_once(": ").unwrap_or(("", line));
        for item in values.split_whitespace() {
            let (key, value) = item.split_once(':').unwrap_or((item, ""));
            table.add_row(vec![group, key, value]);
            rows += 1;
        }
    }

    if rows == 0 {
        println!("  No entries.");
    } else {
        println!("{table}");
    }
    Ok(())
}
