use crate::results::CaptureRecord;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes the ordered capture records as a pretty-printed JSON array.
///
/// Called once after the crawl loop; nothing is written incrementally.
pub fn write_manifest(path: &Path, records: &[CaptureRecord]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, records)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Reads a manifest back, mainly for tooling and tests
pub fn read_manifest(path: &Path) -> io::Result<Vec<CaptureRecord>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(io::BufReader::new(file))?)
}
