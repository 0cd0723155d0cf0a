use crate::error::Result;
use crate::models::{cell_text, Table};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single delimited row to any writer.
pub fn write_row<W: Write>(w: &mut W, row: &[String], sep: char) -> std::io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Write `table` as CSV with a leading, unnamed index column
pub fn write_table<W: Write>(w: &mut W, table: &Table) -> std::io::Result<()> {
    let header: Vec<String> = std::iter::once(String::new())
        .chain(table.columns().iter().cloned())
        .collect();
    write_row(w, &header, ',')?;

    for (i, row) in table.rows().iter().enumerate() {
        let line: Vec<String> = std::iter::once(i.to_string())
            .chain(
                table
                    .columns()
                    .iter()
                    .map(|c| row.get(c).map(cell_text).unwrap_or_default()),
            )
            .collect();
        write_row(w, &line, ',')?;
    }
    Ok(())
}

pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_table(&mut w, table)?;
    w.flush()?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}
