//! Safety checks ahead of the warehouse's drop-and-recreate load.
//!
//! The loader destroys whatever database sits at the output path, so the
//! path is validated against the staging source before anything is dropped.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that a warehouse output path is safe to recreate.
///
/// The output filename must contain the required pattern (e.g.
/// "warehouse") and must not be any of the source paths feeding the run.
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_warehouse_path() {
        let output = PathBuf::from("/tmp/grammy-warehouse.sqlite3");
        let source = PathBuf::from("/data/staging.sqlite3");
        assert!(validate_output_path(&output, "warehouse", &[&source]).is_ok());
    }

    #[test]
    fn test_missing_pattern() {
        let output = PathBuf::from("/tmp/output.sqlite3");
        let source = PathBuf::from("/data/staging.sqlite3");
        let result = validate_output_path(&output, "warehouse", &[&source]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must contain 'warehouse'"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/grammy-warehouse.sqlite3");
        let result = validate_output_path(&path, "warehouse", &[&path]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }
}
