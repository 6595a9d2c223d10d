//! Workload catalog
//!
//! Workloads live under `<root>/<size>/<file>`. Every directory directly
//! below the root is one size class and must be named by an unsigned
//! integer; every regular file inside it is one workload instance whose
//! first line holds its integer id.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One concrete workload file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadInstance {
    /// Id read from the first line of the file
    pub id: i64,
    /// Size class the instance belongs to
    pub size_class: u32,
    /// Path of the workload file
    pub path: PathBuf,
}

impl WorkloadInstance {
    /// File name, used to name the instance's logs
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Instances sharing one nominal problem size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeClass {
    /// Numeric size
    pub size: u32,
    /// Directory name, kept verbatim for the log tree
    pub dir_name: String,
    /// Instances sorted by ascending id
    pub instances: Vec<WorkloadInstance>,
}

/// All size classes found under the workload root, sorted by size
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    classes: Vec<SizeClass>,
}

impl Catalog {
    /// Discover the workload tree below `root`
    pub fn discover(root: &Path) -> Result<Self> {
        let mut classes = Vec::new();

        for entry in fs::read_dir(root).map_err(|e| Error::io(root, e))? {
            let entry = entry.map_err(|e| Error::io(root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            classes.push(load_size_class(&path)?);
        }

        Ok(Self::from_classes(classes))
    }

    /// Build a catalog from already-loaded size classes
    pub fn from_classes(mut classes: Vec<SizeClass>) -> Self {
        classes.sort_by_key(|c| c.size);
        for class in &mut classes {
            class.instances.sort_by_key(|i| i.id);
        }
        Self { classes }
    }

    /// Size classes in ascending size order
    pub fn classes(&self) -> &[SizeClass] {
        &self.classes
    }

    /// Total number of workload instances
    pub fn instance_count(&self) -> usize {
        self.classes.iter().map(|c| c.instances.len()).sum()
    }

    /// Whether no workload was found
    pub fn is_empty(&self) -> bool {
        self.instance_count() == 0
    }
}

fn load_size_class(dir: &Path) -> Result<SizeClass> {
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size: u32 = dir_name
        .trim()
        .parse()
        .map_err(|_| Error::workload(dir, "size directory name is not an unsigned integer"))?;

    let mut instances = Vec::new();
    let mut seen = HashSet::new();

    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let id = read_instance_id(&path)?;
        if !seen.insert(id) {
            return Err(Error::workload(
                &path,
                format!("duplicate instance id {id} in size class {size}"),
            ));
        }
        instances.push(WorkloadInstance {
            id,
            size_class: size,
            path,
        });
    }

    tracing::debug!(size, instances = instances.len(), "Loaded size class");

    Ok(SizeClass {
        size,
        dir_name,
        instances,
    })
}

/// Read the instance id from the first line of a workload file
pub fn read_instance_id(path: &Path) -> Result<i64> {
    let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|e| Error::io(path, e))?;

    let header = first.trim();
    if header.is_empty() {
        return Err(Error::workload(path, "missing id header line"));
    }
    header
        .parse()
        .map_err(|_| Error::workload(path, format!("id header {header:?} is not an integer")))
}
