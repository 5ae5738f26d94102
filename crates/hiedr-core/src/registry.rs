use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::consts::CHANNELS_PER_CCD;
use crate::error::{MosaicError, Result};

static RE_RAW_CCD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?RED(\d)").expect("valid CCD regex"));

/// A set of per-CCD files sharing a filename prefix.
///
/// The CCD id of every file is the single digit immediately following the
/// shared prefix. A registry is built from one stage's outputs and replaced,
/// never mutated, when the pipeline advances.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitRegistry {
    prefix: String,
    units: BTreeMap<u32, PathBuf>,
    reference_id: u32,
}

impl UnitRegistry {
    /// Group `files` by CCD id, with `reference_id` as the placement reference.
    ///
    /// The reference is not required to be present here; it is checked by
    /// [`UnitRegistry::reference_filename`] when it is needed. An empty file
    /// list gives an empty registry.
    ///
    /// For a single file the common prefix is the whole name, so taken
    /// literally no character follows it and the name would be malformed.
    /// Instead the prefix is shortened until a digit follows it, which makes
    /// `X_RED5.noproj.cub` unit 5 with prefix `X_RED`.
    pub fn build<P: AsRef<Path>>(files: &[P], reference_id: u32) -> Result<Self> {
        if files.is_empty() {
            return Ok(Self {
                prefix: String::new(),
                units: BTreeMap::new(),
                reference_id,
            });
        }
        let names: Vec<String> = files
            .iter()
            .map(|f| f.as_ref().to_string_lossy().into_owned())
            .collect();

        let prefix = anchored_prefix(&names, |rest| {
            rest.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .ok_or_else(|| {
            let offender = first_unanchored(&names, common_prefix(&names).len());
            MosaicError::MalformedFilename(offender)
        })?;

        let mut units = BTreeMap::new();
        for (name, file) in names.iter().zip(files) {
            let id = name[prefix.len()..]
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| MosaicError::MalformedFilename(name.clone()))?;
            let path = file.as_ref().to_path_buf();
            if let Some(first) = units.insert(id, path.clone()) {
                return Err(MosaicError::DuplicateUnit {
                    id,
                    first,
                    second: path,
                });
            }
        }

        Ok(Self {
            prefix,
            units,
            reference_id,
        })
    }

    /// Shared filename prefix, used to name this registry's derived outputs.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn reference_id(&self) -> u32 {
        self.reference_id
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.units.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&Path> {
        self.units.get(&id).map(PathBuf::as_path)
    }

    /// Units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Path)> {
        self.units.iter().map(|(id, p)| (*id, p.as_path()))
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.units.keys().copied()
    }

    pub fn min_id(&self) -> Result<u32> {
        self.units
            .keys()
            .next()
            .copied()
            .ok_or(MosaicError::EmptyRegistry)
    }

    pub fn max_id(&self) -> Result<u32> {
        self.units
            .keys()
            .next_back()
            .copied()
            .ok_or(MosaicError::EmptyRegistry)
    }

    pub fn reference_filename(&self) -> Result<&Path> {
        self.get(self.reference_id)
            .ok_or(MosaicError::MissingReferenceUnit(self.reference_id))
    }

    /// Adjacent pairs `(i, i + 1)` where both units are present.
    pub fn adjacent_pairs(&self) -> Vec<(u32, u32)> {
        self.units
            .keys()
            .filter(|&&i| self.units.contains_key(&(i + 1)))
            .map(|&i| (i, i + 1))
            .collect()
    }
}

/// Longest common prefix of `names`, measured in bytes on a char boundary.
pub fn common_prefix<S: AsRef<str>>(names: &[S]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };
    let first = first.as_ref();
    let mut end = first.len();
    for name in &names[1..] {
        let name = name.as_ref();
        end = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(end);
    }
    first[..end].to_string()
}

/// The longest prefix of the common prefix after which every name satisfies
/// `accept`.
///
/// Usually this is the common prefix itself. It is shorter when the common
/// prefix runs into the identifier, which happens for a single-file set.
pub(crate) fn anchored_prefix<S, F>(names: &[S], accept: F) -> Option<String>
where
    S: AsRef<str>,
    F: Fn(&str) -> bool,
{
    if names.is_empty() {
        return None;
    }
    let mut prefix = common_prefix(names);
    loop {
        if names.iter().all(|n| accept(&n.as_ref()[prefix.len()..])) {
            return Some(prefix);
        }
        prefix.pop()?;
    }
}

fn first_unanchored(names: &[String], prefix_len: usize) -> String {
    names
        .iter()
        .find(|n| {
            !n[prefix_len..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .or(names.first())
        .cloned()
        .unwrap_or_default()
}

/// CCD number of a raw channel file, e.g. 5 for `ESP_023957_1755_RED5_1.IMG`.
pub fn ccd_number(path: &Path) -> Result<u32> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    RE_RAW_CCD
        .captures(&filename)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| MosaicError::MalformedFilename(path.display().to_string()))
}

/// Require both channel files of the reference CCD among the raw inputs.
pub fn check_reference_channels<P: AsRef<Path>>(files: &[P], reference_ccd: u32) -> Result<()> {
    let mut found = 0;
    for file in files {
        if ccd_number(file.as_ref())? == reference_ccd {
            found += 1;
        }
    }
    if found != CHANNELS_PER_CCD {
        return Err(MosaicError::ReferenceChannelCount {
            ccd: reference_ccd,
            found,
        });
    }
    Ok(())
}
