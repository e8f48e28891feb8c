//! Converting many SWFs at once.
//!
//! Every input gets its own `BatchItem`; a failing file never stops the rest.
//! With the `parallel` feature the inputs are spread over the rayon pool.

use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{info, warn};

use crate::archive::Archive;
use crate::convert::{base_name, convert_file, encode_png};
use crate::error::NitroResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub name: String,
    pub archive: PathBuf,
    /// Catalogue icon, when the furniture has one.
    pub icon: Option<PathBuf>,
}

#[derive(Debug)]
pub struct BatchItem {
    pub input: PathBuf,
    pub outcome: NitroResult<BatchOutput>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input, in input order.
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    pub fn error_count(&self) -> usize {
        self.items.len() - self.success_count()
    }

    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }
}

/// Convert every input into `<out_dir>/<name>.nitro`, plus `<name>_icon.png`
/// when an icon frame exists.
pub fn convert_batch(inputs: &[PathBuf], out_dir: &Path, default_depth: f64) -> BatchReport {
    #[cfg(feature = "parallel")]
    let items: Vec<BatchItem> = inputs
        .par_iter()
        .map(|input| convert_one(input, out_dir, default_depth))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let items: Vec<BatchItem> = inputs
        .iter()
        .map(|input| convert_one(input, out_dir, default_depth))
        .collect();

    let report = BatchReport { items };
    info!(
        succeeded = report.success_count(),
        failed = report.error_count(),
        "batch finished"
    );
    report
}

fn convert_one(input: &Path, out_dir: &Path, default_depth: f64) -> BatchItem {
    let outcome = write_outputs(input, out_dir, default_depth);
    if let Err(e) = &outcome {
        warn!(input = %input.display(), error = %e, "conversion failed");
    }
    BatchItem {
        input: input.to_path_buf(),
        outcome,
    }
}

fn write_outputs(input: &Path, out_dir: &Path, default_depth: f64) -> NitroResult<BatchOutput> {
    let conversion = convert_file(input, default_depth)?;
    let name = base_name(&input.to_string_lossy());
    let archive = conversion.into_archive()?;

    fs::create_dir_all(out_dir)?;
    let archive_path = out_dir.join(format!("{name}.nitro"));
    archive.write(&archive_path)?;

    let icon_path = out_dir.join(format!("{name}_icon.png"));
    let icon = match write_icon(&archive, &icon_path) {
        Ok(()) => Some(icon_path),
        Err(e) => {
            warn!(furniture = %name, error = %e, "no icon written");
            None
        }
    };

    Ok(BatchOutput {
        name,
        archive: archive_path,
        icon,
    })
}

fn write_icon(archive: &Archive, path: &Path) -> NitroResult<()> {
    let (_, icon) = archive.extract_icon()?;
    fs::write(path, encode_png(&icon)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::NitroError;

    fn item(ok: bool) -> BatchItem {
        BatchItem {
            input: PathBuf::from("x.swf"),
            outcome: if ok {
                Ok(BatchOutput {
                    name: "x".into(),
                    archive: PathBuf::from("x.nitro"),
                    icon: None,
                })
            } else {
                Err(NitroError::MissingDocument)
            },
        }
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            items: vec![item(true), item(false), item(true)],
        };
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_success());

        assert!(BatchReport::default().is_success());
    }

    #[test]
    fn test_missing_inputs_are_reported_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![dir.path().join("a.swf"), dir.path().join("b.swf")];

        let report = convert_batch(&inputs, &dir.path().join("out"), 1.0);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].input, inputs[0]);
        assert_eq!(report.items[1].input, inputs[1]);
        assert_eq!(report.error_count(), 2);
        assert!(report.items.iter().all(|item| matches!(
            &item.outcome,
            Err(NitroError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound
        )));
    }
}
