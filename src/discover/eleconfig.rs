use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use regex::Regex;

use crate::discover::{file_name, list_files, unique, DiscoverError};

/// File names recognised as an electronic configuration, compared case-insensitively
static USUAL_NAMES: [&str; 9] = [
    "eleconfiguration.txt",
    "eleconfig.txt",
    "elconfig.txt",
    "eleconf.txt",
    "econf.txt",
    "elconf.txt",
    "ele.config",
    "electronic.conf",
    "ccjob_elconfig.txt",
];

/// Find the single electronic configuration file in `dir`
pub fn find_eleconfig(dir: &Path) -> Result<PathBuf, DiscoverError> {
    let candidates: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|path| USUAL_NAMES.contains(&file_name(path).to_lowercase().as_str()))
        .collect();

    unique(candidates, "electronic configuration file".to_string(), dir)
}

/// Read charges and multiplicities
///
/// Lines look like `charge_tot = 0` or `multiplicity_B = 2`. Fragment `tot` is the whole system,
/// `A`/`a`/`1` and `B`/`b`/`2` are the two fragments. Keys follow the template placeholders, e.g.
/// `charge_a` or `multiplicity_tot`. A missing file yields an empty map.
pub fn read_eleconfig(path: &Path) -> Result<BTreeMap<String, i64>, DiscoverError> {
    let mut config = BTreeMap::new();
    if !path.exists() {
        warn!(
            "No electronic configuration at {}, templates keep their defaults (c=0, m=1)",
            path.display()
        );
        return Ok(config);
    }

    let text = fs::read_to_string(path).map_err(|source| DiscoverError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let patterns = [("charge", charge_pattern()?), ("multiplicity", multiplicity_pattern()?)];
    for line in text.lines() {
        for (kind, pattern) in &patterns {
            let Some(caps) = pattern.captures(line) else { continue };
            let Some(suffix) = fragment_suffix(&caps["frag"]) else { continue };
            if let Ok(value) = caps["value"].parse::<i64>() {
                config.insert(format!("{kind}_{suffix}"), value);
            }
        }
    }

    info!("Obtained electronic configuration from {}", path.display());
    Ok(config)
}

fn fragment_suffix(fragment: &str) -> Option<&'static str> {
    match fragment {
        "tot" => Some("tot"),
        "A" | "a" | "1" => Some("a"),
        "B" | "b" | "2" => Some("b"),
        _ => None,
    }
}

fn charge_pattern() -> Result<Regex, regex::Error> {
    Regex::new(r"charge_(?P<frag>[A-Za-z0-9]+)\s*=\s*(?P<value>[-+]?\d+)")
}

fn multiplicity_pattern() -> Result<Regex, regex::Error> {
    Regex::new(r"multiplicity_(?P<frag>[A-Za-z0-9]+)\s*=\s*(?P<value>\d+)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_usual_name_case_insensitively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("EleConfig.txt"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(find_eleconfig(dir.path()).unwrap(), dir.path().join("EleConfig.txt"));
    }

    #[test]
    fn two_configurations_are_ambiguous() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("eleconfig.txt"), "").unwrap();
        fs::write(dir.path().join("ele.config"), "").unwrap();
        assert!(matches!(
            find_eleconfig(dir.path()),
            Err(DiscoverError::NotUnique { found: 2, .. })
        ));
    }

    #[test]
    fn reads_total_and_fragment_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eleconfig.txt");
        fs::write(
            &path,
            "charge_tot = -1\nmultiplicity_tot = 2\ncharge_A=0\nmultiplicity_1 = 1\ncharge_b = -1\nmultiplicity_B = 2\ncharge_c = 5\n",
        )
        .unwrap();

        let config = read_eleconfig(&path).unwrap();
        assert_eq!(config["charge_tot"], -1);
        assert_eq!(config["multiplicity_tot"], 2);
        assert_eq!(config["charge_a"], 0);
        assert_eq!(config["multiplicity_a"], 1);
        assert_eq!(config["charge_b"], -1);
        assert_eq!(config["multiplicity_b"], 2);
        assert_eq!(config.len(), 6);
    }

    #[test]
    fn patterns_compile_and_reject_negative_multiplicity() {
        let charge = charge_pattern().unwrap();
        let multiplicity = multiplicity_pattern().unwrap();
        assert_eq!(&charge.captures("charge_tot = +2").unwrap()["value"], "+2");
        assert!(multiplicity.captures("multiplicity_tot = -1").is_none());
    }

    #[test]
    fn bad_pattern_is_a_discover_error() {
        let err: DiscoverError = Regex::new("charge_(").unwrap_err().into();
        assert!(matches!(err, DiscoverError::Pattern(_)));
    }

    #[test]
    fn missing_file_gives_empty_configuration() {
        let config = read_eleconfig(Path::new("/nonexistent/eleconfig.txt")).unwrap();
        assert!(config.is_empty());
    }
}
