use std::io::Write;

use anyhow::{Context, Result};

use crate::data::columns;
use crate::data::model::ResultBundle;

/// Write the selected stars as CSV: `index,ID,` then every selection column.
///
/// Rows follow `bundle.indices`, so the output is in source order.
pub fn write_selected_csv<W: Write>(bundle: &ResultBundle, writer: W) -> Result<()> {
    let names = columns::columns();
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["index", "ID"];
    header.extend(names.iter().copied());
    out.write_record(&header).context("writing CSV header")?;

    for &row in &bundle.indices {
        let id = bundle
            .ids
            .get(row)
            .with_context(|| format!("no ID for star {row}"))?;
        let mut record = vec![row.to_string(), id.to_string()];
        for name in &names {
            let cell = bundle
                .column(name)
                .and_then(|col| col.value(row))
                .with_context(|| format!("column '{name}' has no row {row}"))?;
            record.push(cell.to_string());
        }
        out.write_record(&record)
            .with_context(|| format!("writing star {row}"))?;
    }

    out.flush().context("flushing CSV")?;
    Ok(())
}
