use std::path::{Path, PathBuf};

const IMAGE_EXTS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Every image file below `root`, sorted by path. Unreadable directories are skipped.
pub fn scan_images(root: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(cur) = stack.pop() {
        let entries = match cur.read_dir() {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Cannot read {}: {}", cur.display(), e);
                continue;
            }
        };
        for e in entries.flatten() {
            let p = e.path();
            match e.file_type() {
                Ok(ft) if ft.is_dir() => stack.push(p),
                Ok(ft) if ft.is_file() && is_image(&p) => images.push(p),
                _ => {}
            }
        }
    }
    images.sort();
    log::debug!("Found {} images under {}", images.len(), root.display());
    images
}
