use std::fs;
use std::path::{Path, PathBuf};

use crate::predict::elements::OrbitalElements;
use crate::predict::error::PredictError;

/// Looks up element sets by catalog number in a TLE file.
pub struct TleLoader {
    path: PathBuf,
}

impl TleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and return the element set for `norad_id`.
    pub fn find(&self, norad_id: u64) -> Result<OrbitalElements, PredictError> {
        let content = fs::read_to_string(&self.path)?;
        let filename = self
            .path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        find_in_str(&content, norad_id, &filename)
    }
}

/// Find `norad_id` among the element sets in `content`. Entries for other
/// satellites are not validated.
pub fn find_in_str(
    content: &str,
    norad_id: u64,
    filename: &str,
) -> Result<OrbitalElements, PredictError> {
    for (name, line1, line2) in parse_multi_tle(content) {
        if catalog_number(&line1) != Some(norad_id) {
            continue;
        }

        let elements = OrbitalElements::from_tle(name, &line1, &line2).map_err(|e| {
            PredictError::InvalidTle {
                file: filename.to_string(),
                message: e.to_string(),
            }
        })?;

        log::info!("Satellite {} found.", elements.display_name());
        return Ok(elements);
    }

    Err(PredictError::SatelliteNotFound {
        norad_id,
        file: filename.to_string(),
    })
}

fn catalog_number(line1: &str) -> Option<u64> {
    line1.get(2..7)?.trim().parse().ok()
}

/// Parse multi-satellite TLE content
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            let name = lines[i].trim().trim_start_matches("0 ").to_string();
            result.push((Some(name), lines[i + 1].to_string(), lines[i + 2].to_string()));
            i += 3;
        } else {
            i += 1; // Skip unknown line
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::fixtures::*;

    fn three_line_file() -> String {
        format!(
            "ISS (ZARYA)\n{}\n{}\nEQUATORIAL TEST\n{}\n{}\n",
            ISS_LINE1, ISS_LINE2, EQUATORIAL_LINE1, EQUATORIAL_LINE2
        )
    }

    #[test]
    fn finds_named_entry() {
        let elements = find_in_str(&three_line_file(), 90001, "test.tle").unwrap();
        assert_eq!(elements.norad_id(), 90001);
        assert_eq!(elements.name(), Some("EQUATORIAL TEST"));
    }

    #[test]
    fn finds_two_line_entry() {
        let content = format!("{}\r\n{}\r\n", ISS_LINE1, ISS_LINE2);
        let elements = find_in_str(&content, 25544, "iss.txt").unwrap();
        assert_eq!(elements.norad_id(), 25544);
        assert_eq!(elements.name(), None);
    }

    #[test]
    fn celestrak_name_prefix_is_stripped() {
        let content = format!("0 ISS (ZARYA)\n{}\n{}\n", ISS_LINE1, ISS_LINE2);
        let elements = find_in_str(&content, 25544, "iss.txt").unwrap();
        assert_eq!(elements.name(), Some("ISS (ZARYA)"));
    }

    #[test]
    fn missing_satellite() {
        let err = find_in_str(&three_line_file(), 12345, "test.tle").unwrap_err();
        assert!(matches!(
            err,
            PredictError::SatelliteNotFound { norad_id: 12345, .. }
        ));
    }

    #[test]
    fn broken_entry_for_requested_satellite() {
        let content = format!("BROKEN\n{}\n{}\n", ISS_LINE1, &ISS_LINE2[..50]);
        let err = find_in_str(&content, 25544, "broken.tle").unwrap_err();
        assert!(matches!(err, PredictError::InvalidTle { .. }));
    }

    #[test]
    fn broken_entry_for_other_satellite_is_ignored() {
        let content = format!(
            "BROKEN\n{}\n{}\nISS (ZARYA)\n{}\n{}\n",
            EQUATORIAL_LINE1,
            &EQUATORIAL_LINE2[..50],
            ISS_LINE1,
            ISS_LINE2
        );
        assert!(find_in_str(&content, 25544, "mixed.tle").is_ok());
    }

    #[test]
    fn unreadable_file() {
        let loader = TleLoader::new("/nonexistent/path/to.tle");
        assert!(matches!(loader.find(25544), Err(PredictError::FileRead(_))));
    }
}
