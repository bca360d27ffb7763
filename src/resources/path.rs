//! Mapping between documents and their resource folders

use regex_lite::Regex;

use crate::core::vault;

pub const DEFAULT_RESOURCE_ROOT: &str = "resources";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Where resource folders live and how document paths map onto them
#[derive(Debug, Clone)]
pub struct ResourceLayout {
    root: String,
    stem: Regex,
}

impl Default for ResourceLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_ROOT)
    }
}

impl ResourceLayout {
    pub fn new(root: &str) -> Self {
        let root = match vault::normalize(root) {
            r if r.is_empty() => DEFAULT_RESOURCE_ROOT.to_string(),
            r => r,
        };
        let pattern = format!(
            r"(?i)^(.+?)(?:\.(?:{}))?(?:\.(?:{}))?$",
            IMAGE_EXTENSIONS.join("|"),
            DOCUMENT_EXTENSIONS.join("|")
        );
        let stem = Regex::new(&pattern).expect("extension pattern is valid");
        Self { root, stem }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Resource folder of the document at `path`
    pub fn resource_path_by(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match self.stem.captures(path).and_then(|c| c.get(1)) {
            Some(stem) => format!("{}/{}", self.root, stem.as_str().trim()),
            None => {
                tracing::debug!("No stem in {:?}, using it verbatim", path);
                format!("{}/{}", self.root, path)
            }
        }
    }

    /// Whether `path` is inside the resource root. Paths with `.` or `..`
    /// segments are never inside it.
    pub fn is_inside_root(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        if vault::has_dot_segments(path) {
            return false;
        }
        path == self.root
            || path
                .strip_prefix(self.root.as_str())
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
    }

    /// Documents this layout tracks: markdown files outside the resource root
    pub fn is_document(&self, path: &str) -> bool {
        has_extension(path, DOCUMENT_EXTENSIONS) && !self.is_inside_root(path)
    }

    pub fn is_image(&self, path: &str) -> bool {
        has_extension(path, IMAGE_EXTENSIONS)
    }

    /// Markdown paths that would own `folder` as their resource folder
    pub fn owner_documents(&self, folder: &str) -> Vec<String> {
        let Some(stem) = folder
            .trim_start_matches('/')
            .strip_prefix(self.root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Vec::new();
        };
        DOCUMENT_EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", stem, ext))
            .collect()
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    vault::extension(path)
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
