use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Marker Q-Chem prints at the end of a normal run
pub const DEFAULT_SUCCESS_STRING: &str = "Have a nice day.";

/// Decides whether an output file belongs to a successful run
///
/// Output formats aren't parsed here. Either a marker line is searched for, or the decision is
/// handed to a caller-supplied predicate.
pub enum SuccessCheck {
    /// Success if any line of the output contains the string
    Contains(String),
    Predicate(Box<dyn Fn(&Path) -> bool>),
}

impl SuccessCheck {
    pub fn contains(marker: impl Into<String>) -> SuccessCheck {
        SuccessCheck::Contains(marker.into())
    }

    pub fn predicate<F>(f: F) -> SuccessCheck
    where
        F: Fn(&Path) -> bool + 'static,
    {
        SuccessCheck::Predicate(Box::new(f))
    }

    pub fn is_success(&self, output: &Path) -> io::Result<bool> {
        match self {
            SuccessCheck::Contains(marker) => {
                let bytes = fs::read(output)?;
                let text = String::from_utf8_lossy(&bytes);
                Ok(text.lines().any(|line| line.contains(marker.as_str())))
            }
            SuccessCheck::Predicate(f) => Ok(f(output)),
        }
    }
}

impl Default for SuccessCheck {
    fn default() -> Self {
        SuccessCheck::contains(DEFAULT_SUCCESS_STRING)
    }
}

impl fmt::Debug for SuccessCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SuccessCheck::Contains(marker) => write!(f, "Contains({marker:?})"),
            SuccessCheck::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_marker_matches_qchem_footer() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("job.out");
        fs::write(&out, "Total job time: 1.2s\n        *  Thank you very much for using Q-Chem.  Have a nice day.  *\n").unwrap();
        assert!(SuccessCheck::default().is_success(&out).unwrap());

        fs::write(&out, "SCF failed to converge\n").unwrap();
        assert!(!SuccessCheck::default().is_success(&out).unwrap());
    }

    #[test]
    fn custom_marker_and_predicate() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("job.out");
        fs::write(&out, "Yay, I finished!\n").unwrap();

        assert!(SuccessCheck::contains("I finished").is_success(&out).unwrap());
        let check = SuccessCheck::predicate(|path| path.extension().is_some_and(|e| e == "out"));
        assert!(check.is_success(&out).unwrap());
    }

    #[test]
    fn unreadable_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(SuccessCheck::default().is_success(&dir.path().join("missing.out")).is_err());
    }
}
