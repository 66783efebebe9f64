//! Class-name table loading (`coco.names` format, one name per line).

use std::fs;
use std::path::Path;

use crate::Result;

/// Read a label file into an index → name table.
///
/// Line order is the class id, so lines are kept as-is apart from
/// trailing whitespace.
pub fn load_class_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(|l| l.trim_end().to_string()).collect())
}
