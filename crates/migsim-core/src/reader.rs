use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::model::{Subset, Tier, WorkItem};

/// Validate that `directory` looks like a migration directory: it exists,
/// is a directory, is readable, and directly contains `metadata/subsets`.
pub fn validate_directory_structure(directory: &Path) -> Result<()> {
    if !directory.exists() {
        return Err(Error::NotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(Error::NotADirectory(directory.to_path_buf()));
    }
    match std::fs::read_dir(directory) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Error::Permission(directory.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    }

    let metadata_path = directory.join("metadata");
    if !metadata_path.is_dir() {
        return Err(Error::Structure(directory.to_path_buf()));
    }
    let subsets_path = metadata_path.join("subsets");
    if !subsets_path.is_dir() {
        return Err(Error::Structure(directory.to_path_buf()));
    }
    Ok(())
}

/// Recursively find every file named `subset-*` under `directory`.
pub fn find_subset_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(directory).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with("subset-") {
                    found.push(entry.into_path());
                }
            }
        }
    }
    found.sort();
    Ok(found)
}

struct PathInfo {
    migration_id: String,
    label: String,
    subset_id: String,
    tier: Tier,
    num_sstables: u64,
    data_size: i64,
}

/// Parse a subset file's path against the tiered or simple (universal)
/// layout contract. Both share a common tail (`label/subsetId/.../subset-X`)
/// that differs only in whether a tier segment is present.
fn parse_subset_path(path: &Path) -> Result<PathInfo> {
    let bad = |reason: &str| Error::PathFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let components: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let n = components.len();

    let filename = components.get(n.wrapping_sub(1)).ok_or_else(|| bad("path too short"))?;
    if !filename.starts_with("subset-") {
        return Err(bad("file name must start with 'subset-'"));
    }
    let filename_subset_id = &filename["subset-".len()..];

    let parse_u64 = |s: &str, what: &str| -> Result<u64> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad(&format!("{what} must be a non-negative integer, got {s:?}")));
        }
        s.parse::<u64>().map_err(|_| bad(&format!("{what} out of range: {s}")))
    };

    // Tail layout, indexed from the end: [..., migId, metadata, subsets,
    // label, subsetId, tier, numSSTables, dataSize, subset-<subsetId>].
    if n >= 9 {
        let tier_candidate = &components[n - 4];
        if let Ok(tier) = tier_candidate.parse::<Tier>() {
            let subset_id = &components[n - 5];
            let label = &components[n - 6];
            let subsets_dir = &components[n - 7];
            let metadata_dir = &components[n - 8];
            if subsets_dir == "subsets" && metadata_dir == "metadata" && subset_id == filename_subset_id {
                let num_sstables = parse_u64(&components[n - 3], "numSSTables")?;
                let data_size = parse_u64(&components[n - 2], "dataSize")? as i64;
                let migration_id = components
                    .get(n - 9)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                return Ok(PathInfo {
                    migration_id,
                    label: label.clone(),
                    subset_id: subset_id.clone(),
                    tier,
                    num_sstables,
                    data_size,
                });
            }
        }
    }

    // Simple layout, one segment shorter: [..., migId, metadata, subsets,
    // label, subsetId, numSSTables, dataSize, subset-<subsetId>].
    if n >= 8 {
        let subset_id = &components[n - 4];
        let label = &components[n - 5];
        let subsets_dir = &components[n - 6];
        let metadata_dir = &components[n - 7];
        if subsets_dir == "subsets" && metadata_dir == "metadata" && subset_id == filename_subset_id {
            let num_sstables = parse_u64(&components[n - 3], "numSSTables")?;
            let data_size = parse_u64(&components[n - 2], "dataSize")? as i64;
            let migration_id = components
                .get(n - 8)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            return Ok(PathInfo {
                migration_id,
                label: label.clone(),
                subset_id: subset_id.clone(),
                tier: Tier::Universal,
                num_sstables,
                data_size,
            });
        }
    }

    Err(bad(
        "expected <migId>/metadata/subsets/<label>/<subsetId>/[<tier>/]<numSSTables>/<dataSize>/subset-<subsetId>",
    ))
}

/// Parse a subset file's item lines. Blank lines and `#` comments are
/// skipped; each remaining line is `key,size` or `key size`.
fn parse_item_lines(path: &Path, content: &str) -> Result<Vec<WorkItem>> {
    let mut items = Vec::new();
    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, size_str) = if let Some((k, s)) = line.split_once(',') {
            (k.trim(), s.trim())
        } else if let Some((k, s)) = line.split_once(' ') {
            (k.trim(), s.trim())
        } else {
            return Err(Error::LineParse {
                path: path.to_path_buf(),
                line: raw_line.to_string(),
            });
        };
        let size = size_str.parse::<i64>().map_err(|_| Error::LineParse {
            path: path.to_path_buf(),
            line: raw_line.to_string(),
        })?;
        items.push(WorkItem::new(key, size));
    }
    Ok(items)
}

/// Parse a single subset file into a `Subset`, including its item lines.
pub fn parse_subset_file(path: &Path) -> Result<Subset> {
    let info = parse_subset_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let items = parse_item_lines(path, &content)?;
    Ok(Subset {
        migration_id: info.migration_id,
        label: info.label,
        subset_id: info.subset_id,
        tier: info.tier,
        num_sstables: info.num_sstables,
        data_size: info.data_size,
        path: path.to_path_buf(),
        items,
    })
}

/// A subset that failed to parse, retained so the caller can report it as a warning.
pub struct SubsetWarning {
    pub path: PathBuf,
    pub error: Error,
}

/// Scan `directory` for subset files and parse them into an ordered,
/// deduplicated `Subset` list, collecting per-file warnings rather than
/// aborting the whole read.
pub fn read_subsets(directory: &Path) -> Result<(Vec<Subset>, Vec<SubsetWarning>)> {
    validate_directory_structure(directory)?;
    let files = find_subset_files(directory)?;

    let mut subsets = Vec::with_capacity(files.len());
    let mut warnings = Vec::new();
    for file in files {
        match parse_subset_file(&file) {
            Ok(subset) => subsets.push(subset),
            Err(error) => {
                tracing::warn!(path = %file.display(), %error, "failed to parse subset file");
                warnings.push(SubsetWarning { path: file, error });
            }
        }
    }

    if subsets.is_empty() && !warnings.is_empty() {
        return Err(Error::Other(anyhow::anyhow!(
            "no valid subset files found in {}: all {} candidate files failed to parse",
            directory.display(),
            warnings.len()
        )));
    }

    crate::model::sort_subsets(&mut subsets);
    Ok((subsets, warnings))
}
