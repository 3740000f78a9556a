//! Minimal single-spectrum MGF input for peak list searches

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// File name of the query spectrum inside a task directory
pub const INPUT_SPECTRA_FILE: &str = "input_spectra.mgf";

static PEAK_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\t ]+").expect("peak separator pattern is valid"));

/// Normalize a pasted peak list to one "mz intensity" line per peak.
///
/// Commas, tabs and repeated spaces all become a single space. Blank lines
/// are dropped so a trailing newline does not produce an empty peak.
pub fn normalize_peaks(peaks: &str) -> Vec<String> {
    peaks
        .lines()
        .map(|line| PEAK_SEPARATORS.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Render the MGF record. Charge is always written as 1.
pub fn render(precursor_mz: &str, peaks: &str) -> String {
    let mut mgf = String::from("BEGIN IONS\n");
    mgf.push_str(&format!("PEPMASS={}\n", precursor_mz.trim()));
    mgf.push_str("MSLEVEL=2\n");
    mgf.push_str("CHARGE=1\n");
    for peak in normalize_peaks(peaks) {
        mgf.push_str(&peak);
        mgf.push('\n');
    }
    mgf.push_str("END IONS\n");
    mgf
}

/// Write the MGF record into `task_dir` and return its path
pub async fn write_input_spectrum(
    task_dir: &Path,
    precursor_mz: &str,
    peaks: &str,
) -> std::io::Result<PathBuf> {
    let path = task_dir.join(INPUT_SPECTRA_FILE);
    let contents = render(precursor_mz, peaks);
    debug!(path = %path.display(), bytes = contents.len(), "Writing input spectrum");
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        let peaks = "100.1,20\n150.2\t35\n 170.3   40 \r\n\n";
        assert_eq!(
            normalize_peaks(peaks),
            vec!["100.1 20", "150.2 35", "170.3 40"]
        );
    }

    #[test]
    fn test_render_two_peaks() {
        let mgf = render("150.1", "100.0\t5\n120.0, 10\n");
        assert_eq!(
            mgf,
            "BEGIN IONS\nPEPMASS=150.1\nMSLEVEL=2\nCHARGE=1\n100.0 5\n120.0 10\nEND IONS\n"
        );
    }

    #[test]
    fn test_render_empty_peaks() {
        let mgf = render("", "");
        assert_eq!(mgf, "BEGIN IONS\nPEPMASS=\nMSLEVEL=2\nCHARGE=1\nEND IONS\n");
    }

    #[tokio::test]
    async fn test_write_input_spectrum() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input_spectrum(dir.path(), "150.1", "1 2\n3 4")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join(INPUT_SPECTRA_FILE));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("PEPMASS=150.1\n"));
        assert!(written.ends_with("1 2\n3 4\nEND IONS\n"));
    }
}
