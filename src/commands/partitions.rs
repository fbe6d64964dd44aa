//! `partitions` command: show the table behind a scheme

use inoflash_core::{PartitionChoice, PartitionTable, PartitionTables};
use inoflash_tools::{Result, ToolError};

use super::format_size;

/// Resolve a scheme name or alias and print its table
pub fn cmd_show(tables: &PartitionTables, scheme: &str) -> Result<()> {
    let choice = PartitionChoice::parse(scheme);
    let name = choice.scheme_name().ok_or(ToolError::AutoScheme)?;

    let (path, table) = tables.table(name).ok_or_else(|| ToolError::NoPartitionTable {
        scheme: name.to_string(),
        dir: tables.dir().to_path_buf(),
    })?;

    println!("Partition Table");
    println!("===============");
    println!("Scheme: {}", name);
    println!("File:   {}", path.display());
    print_table(&table);
    Ok(())
}

/// Print the rows of a table
pub fn print_table(table: &PartitionTable) {
    println!("\nEntries ({}):", table.len());
    println!(
        "{:<12} {:<6} {:<10} {:>10} {:>10} {:>10} {:>6}",
        "Name", "Type", "SubType", "Offset", "Size", "", "FS"
    );
    println!("{:-<70}", "");

    for entry in &table.entries {
        let size = entry
            .region()
            .map(|region| format_size(region.size))
            .unwrap_or_default();
        println!(
            "{:<12} {:<6} {:<10} {:>10} {:>10} {:>10} {:>6}",
            entry.name,
            entry.kind,
            entry.subtype,
            entry.offset,
            entry.size,
            size,
            if entry.is_filesystem() { "yes" } else { "-" }
        );
    }

    match table.filesystem_region() {
        Some(region) => println!(
            "\nFilesystem region: 0x{:X} ({} bytes)",
            region.offset, region.size
        ),
        None => println!("\nNo filesystem region"),
    }
}
