use std::fs;
use std::path::Path;

use crate::{Config, Engine};

/// Default config with no lock-wait, suitable for scratch directories.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::new(dir);
    config.open_timeout_secs = 0;
    config
}

pub fn open_engine(dir: &Path) -> Engine {
    Engine::open(test_config(dir)).unwrap()
}

pub fn count_files_with_ext(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|x| x == ext)
                .unwrap_or(false)
        })
        .count()
}

/// Path of the single `.bsm` file in `dir`; panics unless exactly one exists.
pub fn only_data_file(dir: &Path) -> std::path::PathBuf {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "bsm").unwrap_or(false))
        .collect();
    assert_eq!(files.len(), 1, "expected exactly one data file");
    files.pop().unwrap()
}
