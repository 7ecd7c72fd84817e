use directories::ProjectDirs;
use std::path::PathBuf;

pub fn data_root() -> PathBuf {
    if let Some(pd) = ProjectDirs::from("com", "shadowdeck", "ShadowDeck") {
        pd.data_dir().to_path_buf()
    } else {
        // Fallback: current dir
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Collection directory and its backups directory under `root`.
pub fn store_dirs(root: &std::path::Path) -> (PathBuf, PathBuf) {
    let dir = root.join("srs");
    let backups = root.join("backups");
    (dir, backups)
}
