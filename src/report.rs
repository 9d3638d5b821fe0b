use crate::types::FileMetadataRecord;
use chrono::Local;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color, Table};
use std::path::Path;

#[must_use]
pub fn metadata_table(records: &[FileMetadataRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_HORIZONTAL_ONLY);
    table.set_header(vec!["Filename", "Size", "Bytes", "Last Modified"]);

    let now = Local::now();
    for r in records {
        // Files touched in the last minute may still be mid-write
        let fresh = now.signed_duration_since(r.modified_at).num_minutes() < 1;

        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(human_bytes::human_bytes(r.size_bytes as f64)),
            Cell::new(r.size_bytes).fg(if r.size_bytes == 0 {
                Color::Yellow
            } else {
                Color::White
            }),
            Cell::new(r.modified_at.format("%Y-%m-%d %H:%M:%S")).fg(if fresh {
                Color::Green
            } else {
                Color::White
            }),
        ]);
    }

    let total: u64 = records.iter().map(|r| r.size_bytes).sum();
    table.add_row(vec![
        Cell::new(format!("TOTAL ({} files)", records.len())).add_attribute(Attribute::Bold),
        Cell::new(human_bytes::human_bytes(total as f64)).add_attribute(Attribute::Bold),
        Cell::new(total).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    table
}

pub fn print_metadata(data_dir: &Path, records: &[FileMetadataRecord]) {
    println!(
        "{}",
        format!("=== Excel Metadata: {} ===", data_dir.display()).cyan()
    );
    if records.is_empty() {
        println!("{}", "No Excel files found.".yellow());
        return;
    }
    println!("{}", metadata_table(records));
}

pub fn print_file_list(data_dir: &Path, files: &[String]) {
    println!(
        "{}",
        format!("=== Excel Files: {} ===", data_dir.display()).cyan()
    );
    if files.is_empty() {
        println!("{}", "No Excel files found.".yellow());
        return;
    }
    for f in files {
        println!("  - {}", f.green());
    }
    println!("{} file(s).", files.len());
}
