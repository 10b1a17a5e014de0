//! CSV export of the aggregate capacity series.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::capacity::CapacityRow;

/// Schema v1 column header for capacity CSV export.
const HEADER: &str = "timestamp,fleet,fleet_soc,rent,rent_soc,\
                      charging,charging_soc,vpp,vpp_soc,vpp_capacity_kw";

/// Exports the capacity series to a CSV file at the given path.
///
/// Writes a header row followed by one row per tick. Deterministic for
/// identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(rows: &[CapacityRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(rows, buf)
}

/// Writes the capacity series as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(rows: &[CapacityRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in rows {
        wtr.write_record(&[
            r.timestamp.to_string(),
            r.fleet.to_string(),
            format!("{:.4}", r.fleet_soc),
            r.rent.to_string(),
            format!("{:.4}", r.rent_soc),
            r.charging.to_string(),
            format!("{:.4}", r.charging_soc),
            r.vpp.to_string(),
            format!("{:.4}", r.vpp_soc),
            format!("{:.4}", r.vpp_capacity_kw),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
