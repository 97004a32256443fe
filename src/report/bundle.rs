//! Output file naming and zip packaging of a suite's results

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Paths of every file a suite run writes into the output directory
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteArtifacts {
    pub comparison_csv: PathBuf,
    pub details_json: PathBuf,
    pub bundle_zip: PathBuf,
}

impl SuiteArtifacts {
    pub fn for_suite(output_dir: &Path, suite: &str) -> Self {
        Self {
            comparison_csv: output_dir.join(format!("{}_comparison.csv", suite)),
            details_json: output_dir.join(format!("{}_details.json", suite)),
            bundle_zip: output_dir.join(format!("{}_results.zip", suite)),
        }
    }

    /// Files that already exist and would be overwritten by a new run
    pub fn existing(&self, include_bundle: bool) -> Vec<&Path> {
        let mut paths = vec![self.comparison_csv.as_path(), self.details_json.as_path()];
        if include_bundle {
            paths.push(self.bundle_zip.as_path());
        }
        paths.into_iter().filter(|p| p.exists()).collect()
    }
}

/// File name of the dataset profile written by `describe`
pub const PROFILE_FILE: &str = "dataset_profile.json";

/// Package the comparison CSV and details JSON into a zip archive.
///
/// The individual files are left in place next to the archive.
pub fn package_results(artifacts: &SuiteArtifacts) -> Result<()> {
    use std::io::{Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let zip_path = &artifacts.bundle_zip;
    let zip_file = std::fs::File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (path, default_name) in [
        (&artifacts.comparison_csv, "comparison.csv"),
        (&artifacts.details_json, "details.json"),
    ] {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(default_name);
        zip.start_file(filename, options)
            .with_context(|| format!("Failed to add {} to zip", filename))?;
        let mut content = Vec::new();
        std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize zip file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_artifact_names() {
        let a = SuiteArtifacts::for_suite(Path::new("out"), "network");
        assert_eq!(a.comparison_csv, Path::new("out/network_comparison.csv"));
        assert_eq!(a.details_json, Path::new("out/network_details.json"));
        assert_eq!(a.bundle_zip, Path::new("out/network_results.zip"));
    }

    #[test]
    fn test_package_contains_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = SuiteArtifacts::for_suite(dir.path(), "features");
        std::fs::write(&a.comparison_csv, "experiment,f1\nBaseline,0.5\n").unwrap();
        std::fs::write(&a.details_json, "{}").unwrap();

        assert_eq!(a.existing(true).len(), 2);
        package_results(&a).unwrap();
        assert!(a.comparison_csv.exists());

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&a.bundle_zip).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut csv = String::new();
        archive
            .by_name("features_comparison.csv")
            .unwrap()
            .read_to_string(&mut csv)
            .unwrap();
        assert!(csv.contains("Baseline"));
    }
}
