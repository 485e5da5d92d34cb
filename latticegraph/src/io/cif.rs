//! Reader for the subset of the Crystallographic Information File (CIF)
//! format needed to build a unit cell: cell parameters, atomic sites in
//! fractional coordinates and space group symmetry operations.
use std::path::Path;

use log::{debug, warn};

use crate::{CrystalParameters, Error};

const CELL_KEYS: [&str; 6] = [
    "_cell_length_a", "_cell_length_b", "_cell_length_c",
    "_cell_angle_alpha", "_cell_angle_beta", "_cell_angle_gamma",
];

const SYMMETRY_KEYS: [&str; 2] = ["_space_group_symop_operation_xyz", "_symmetry_equiv_pos_as_xyz"];

/// A single atomic site from a CIF file
#[derive(Debug, Clone, PartialEq)]
pub struct CifSite {
    /// Label of the site (`_atom_site_label`)
    pub label: String,
    /// Chemical type of the site (`_atom_site_type_symbol`), defaults to the
    /// label
    pub type_symbol: String,
    /// Fractional coordinates of the site
    pub fract: [f64; 3],
}

/// Crystal data read from a CIF file
#[derive(Debug, Clone, PartialEq)]
pub struct CifData {
    /// Lengths `[a, b, c]` of the cell
    pub cell_lengths: [f64; 3],
    /// Angles `[alpha, beta, gamma]` of the cell, in degrees
    pub cell_angles: [f64; 3],
    /// Atomic sites in the asymmetric unit
    pub sites: Vec<CifSite>,
    /// Symmetry operations, as `x, y, z` triplets
    pub symmetry_operations: Vec<String>,
}

/// A `loop_` construct, with its header tags and data rows
struct CifLoop {
    tags: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }
}

impl CifData {
    /// Read CIF data from the file at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<CifData, Error> {
        let path = path.as_ref();
        debug!("reading CIF data from {}", path.display());
        return std::fs::read_to_string(path)?.parse();
    }

    /// Get the crystal parameters corresponding to this data, using all
    /// sites. Remove sites from `self.sites` first to only use some of them.
    pub fn to_crystal_parameters(&self) -> CrystalParameters {
        CrystalParameters {
            cell_lengths: self.cell_lengths,
            cell_angles: self.cell_angles,
            sites: self.sites.iter().map(|site| site.fract).collect(),
            symmetry_operations: self.symmetry_operations.clone(),
            assign_different_types: true,
        }
    }
}

impl std::str::FromStr for CifData {
    type Err = Error;

    fn from_str(text: &str) -> Result<CifData, Error> {
        let text = text.replace('\r', "");

        let mut cell = [None; 6];
        for line in text.lines() {
            let mut words = line.split_whitespace();
            let key = match words.next() {
                Some(key) => key,
                None => continue,
            };

            if let Some(i) = CELL_KEYS.iter().position(|&k| k == key) {
                let value = words.last().ok_or_else(|| Error::Cif(format!("missing value for {}", key)))?;
                cell[i] = Some(parse_number(value).ok_or_else(|| Error::Cif(format!(
                    "invalid value '{}' for {}", value, key
                )))?);
            }
        }

        let mut values = [0.0; 6];
        for (i, value) in cell.iter().enumerate() {
            values[i] = value.ok_or_else(|| Error::Cif(format!("missing {} in CIF data", CELL_KEYS[i])))?;
        }

        let all_loops = blocks(&text).flat_map(|block| loops(&block)).collect::<Vec<_>>();

        let sites = all_loops.iter()
            .find(|l| l.column("_atom_site_fract_x").is_some())
            .map(sites)
            .ok_or_else(|| Error::Cif("missing _atom_site_fract_x loop in CIF data".into()))?;

        let symmetry_operations = all_loops.iter()
            .find_map(|l| SYMMETRY_KEYS.iter().find_map(|key| l.column(key)).map(|column| (l, column)))
            .map(|(l, column)| l.rows.iter().map(|row| row[column].clone()).collect::<Vec<_>>());

        let symmetry_operations = match symmetry_operations {
            Some(operations) if !operations.is_empty() => operations,
            _ => {
                warn!("no symmetry operations in CIF data, using the identity");
                vec!["x, y, z".into()]
            }
        };

        return Ok(CifData {
            cell_lengths: [values[0], values[1], values[2]],
            cell_angles: [values[3], values[4], values[5]],
            sites: sites,
            symmetry_operations: symmetry_operations,
        });
    }
}

/// Parse a number, ignoring the standard uncertainty in parenthesis, as in
/// `1.234(5)`
fn parse_number(value: &str) -> Option<f64> {
    let value = value.split('(').next().unwrap_or(value);
    value.parse().ok()
}

/// Split the text in blocks separated by blank lines, ignoring comments
fn blocks(text: &str) -> impl Iterator<Item = Vec<&str>> + '_ {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else if !line.starts_with('#') {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    return blocks.into_iter();
}

/// Extract all `loop_` from a block
fn loops(block: &[&str]) -> Vec<CifLoop> {
    let mut loops = Vec::new();
    let mut lines = block.iter().peekable();
    while let Some(line) = lines.next() {
        if *line != "loop_" {
            continue;
        }

        let mut tags = Vec::new();
        while let Some(tag) = lines.next_if(|line| line.starts_with('_')) {
            tags.push(tag.split_whitespace().next().unwrap_or_default().to_owned());
        }

        let mut rows = Vec::new();
        while let Some(row) = lines.next_if(|line| **line != "loop_" && !line.starts_with('_')) {
            let words = split_words(row);
            if words.len() == tags.len() {
                rows.push(words);
            } else {
                warn!(
                    "skipping CIF row '{}': expected {} values, got {}",
                    row, tags.len(), words.len()
                );
            }
        }

        loops.push(CifLoop { tags, rows });
    }
    return loops;
}

/// Split a line on whitespace, keeping quoted strings as a single word
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => {
                words.push(std::mem::take(&mut current));
                quote = None;
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                quote = Some(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    return words;
}

fn sites(sites_loop: &CifLoop) -> Vec<CifSite> {
    let label = sites_loop.column("_atom_site_label");
    let type_symbol = sites_loop.column("_atom_site_type_symbol");
    let fract = [
        sites_loop.column("_atom_site_fract_x"),
        sites_loop.column("_atom_site_fract_y"),
        sites_loop.column("_atom_site_fract_z"),
    ];

    let mut sites = Vec::new();
    'rows: for row in &sites_loop.rows {
        let mut coords = [0.0; 3];
        for (i, column) in fract.iter().enumerate() {
            match column.and_then(|column| parse_number(&row[column])) {
                Some(value) => coords[i] = value,
                None => {
                    warn!("skipping CIF site '{}': invalid fractional coordinates", row.join(" "));
                    continue 'rows;
                }
            }
        }

        let label = label.map_or_else(|| format!("site{}", sites.len() + 1), |column| row[column].clone());
        let type_symbol = type_symbol.map_or_else(|| label.clone(), |column| row[column].clone());
        sites.push(CifSite {
            label: label,
            type_symbol: type_symbol,
            fract: coords,
        });
    }
    return sites;
}
