use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::discover::DiscoverError;

/// One atom per entry: element symbol followed by its coordinates
type Atoms = Vec<Vec<String>>;

/// Coordinates of a two-fragment system
///
/// A file without a separator is a single fragment and only provides `AB`. Otherwise the atoms
/// before the separator are `A`, those after it `B`, and the ghost variants mark the other
/// fragment's atoms with `@` for counterpoise-style calculations.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragments {
    fragments: BTreeMap<String, Atoms>,
}

impl Fragments {
    pub fn get(&self, name: &str) -> Option<&Atoms> {
        self.fragments.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(|k| k.as_str())
    }

    /// Render a fragment as template text, fields joined by four spaces and atoms by newlines
    pub fn render(&self, name: &str) -> Option<String> {
        self.get(name).map(|atoms| {
            atoms
                .iter()
                .map(|atom| atom.join("    "))
                .collect::<Vec<String>>()
                .join("\n")
        })
    }

    /// All fragments rendered, keyed by name
    pub fn rendered(&self) -> BTreeMap<String, String> {
        self.names()
            .filter_map(|name| self.render(name).map(|text| (name.to_string(), text)))
            .collect()
    }
}

pub fn read_fragments(path: &Path, separator: &str) -> Result<Fragments, DiscoverError> {
    let text = fs::read_to_string(path).map_err(|source| DiscoverError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_fragments(&text, separator))
}

fn parse_fragments(text: &str, separator: &str) -> Fragments {
    let lines: Vec<&str> = text.lines().collect();
    let split_at = lines
        .iter()
        .rposition(|line| line.contains(separator))
        .filter(|&i| i > 0);

    let mut fragments: BTreeMap<String, Atoms> = BTreeMap::new();
    match split_at {
        None => {
            fragments.insert("AB".to_string(), atoms(&lines));
        }
        Some(i) => {
            let a = atoms(&lines[..i]);
            let b = atoms(&lines[i + 1..]);
            let ab_ghost: Atoms = a.iter().cloned().chain(ghost(&b)).collect();
            let ba_ghost: Atoms = ghost(&a).chain(b.iter().cloned()).collect();
            let ab: Atoms = a.iter().chain(b.iter()).cloned().collect();
            fragments.insert("A".to_string(), a);
            fragments.insert("B".to_string(), b);
            fragments.insert("AB".to_string(), ab);
            fragments.insert("AB_ghost".to_string(), ab_ghost);
            fragments.insert("BA_ghost".to_string(), ba_ghost);
        }
    }
    Fragments { fragments }
}

fn atoms(lines: &[&str]) -> Atoms {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().map(|f| f.to_string()).collect())
        .collect()
}

fn ghost(atoms: &Atoms) -> impl Iterator<Item = Vec<String>> + '_ {
    atoms.iter().map(|atom| {
        let mut atom = atom.clone();
        if let Some(symbol) = atom.first_mut() {
            symbol.insert(0, '@');
        }
        atom
    })
}
