//! Product image URL resolution.
//!
//! Resolution order, first hit wins:
//! 1. an uploaded file, served from the media URL
//! 2. the legacy `image_code` (external URL, static path, or a code expanded
//!    through the resize-cache template)
//! 3. a photo in the product image directory whose file name matches the
//!    normalized product title, exactly or fuzzily
//! 4. an inline 1×1 transparent PNG, so pages never render broken images
//!
//! Matching runs against an [`ImageDirectory`] listing, so it can be tested
//! without touching the filesystem.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::entities::product;

/// Inert 1×1 transparent PNG.
pub const PLACEHOLDER_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Image codes containing this marker point at the old site's stock placeholder.
pub const PLACEHOLDER_SENTINEL: &str = "product-placeholder.png";

const EXACT_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];
const SCAN_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".jpeg"];
const MIN_FUZZY_LEN: usize = 3;
const MIN_FUZZY_RATIO: f64 = 0.7;

static NON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-/]").unwrap());

/// File names available in the product image directory.
#[derive(Debug, Clone, Default)]
pub struct ImageDirectory {
    names: HashSet<String>,
    /// Scan order for fuzzy matching: `.jpg`, then `.png`, then `.jpeg`, each sorted
    scan_order: Vec<String>,
}

impl ImageDirectory {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();

        let mut scan_order = Vec::new();
        for ext in SCAN_EXTENSIONS {
            let mut with_ext: Vec<&String> = names.iter().filter(|n| n.ends_with(ext)).collect();
            with_ext.sort();
            scan_order.extend(with_ext.into_iter().cloned());
        }

        Self { names, scan_order }
    }

    /// Lists regular files in `dir`. A missing directory yields an empty listing.
    pub fn scan(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            info!(dir = %dir.display(), "Product image directory not found; title matching disabled");
            return Ok(Self::default());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        info!(dir = %dir.display(), files = names.len(), "Indexed product images");
        Ok(Self::from_names(names))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub media_url: String,
    pub image_code_url_template: String,
    pub directory_url_prefix: String,
}

impl From<&AppConfig> for ImageSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            media_url: cfg.media_url.clone(),
            image_code_url_template: cfg.image_code_url_template.clone(),
            directory_url_prefix: cfg.product_image_url_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageResolver {
    settings: ImageSettings,
    directory: ImageDirectory,
}

impl ImageResolver {
    pub fn new(settings: ImageSettings, directory: ImageDirectory) -> Self {
        Self {
            settings,
            directory,
        }
    }

    pub fn for_product(&self, product: &product::Model) -> String {
        self.resolve(product.image.as_deref(), &product.image_code, &product.title)
    }

    pub fn resolve(&self, uploaded: Option<&str>, image_code: &str, title: &str) -> String {
        if let Some(path) = uploaded.map(str::trim).filter(|p| !p.is_empty()) {
            return join_url(&self.settings.media_url, path);
        }

        let code = image_code.trim();
        if !code.is_empty() && !code.contains(PLACEHOLDER_SENTINEL) {
            if code.starts_with("http") || code.starts_with("/static/") {
                return code.to_string();
            }
            return self.settings.image_code_url_template.replace("{code}", code);
        }

        if let Some(file) = self.match_title(title) {
            return join_url(&self.settings.directory_url_prefix, &file);
        }

        PLACEHOLDER_DATA_URI.to_string()
    }

    /// Finds the directory file named after `title`.
    pub fn match_title(&self, title: &str) -> Option<String> {
        let clean = normalize_name(title);
        if clean.is_empty() || self.directory.is_empty() {
            return None;
        }

        let stems = [
            clean.clone(),
            clean.replace('/', "_"),
            clean.replace('-', "_"),
        ];
        for ext in EXACT_EXTENSIONS {
            for stem in &stems {
                let candidate = format!("{stem}{ext}");
                if self.directory.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }

        let wanted = unify_separators(&clean);
        for file in &self.directory.scan_order {
            let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
            let have = unify_separators(&normalize_name(stem));
            if have == wanted || is_close_match(&wanted, &have) {
                debug!(title, file = %file, "Matched product image by file name");
                return Some(file.clone());
            }
        }
        None
    }
}

/// Uppercases and strips everything but word characters, `-` and `/`.
pub fn normalize_name(raw: &str) -> String {
    NON_NAME_CHARS
        .replace_all(&raw.trim().to_uppercase(), "")
        .into_owned()
}

fn unify_separators(name: &str) -> String {
    name.replace(|c: char| c == '/' || c == '-', "_")
}

/// One name contains the other and covers at least 70% of its length.
fn is_close_match(a: &str, b: &str) -> bool {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    if a_len < MIN_FUZZY_LEN || b_len < MIN_FUZZY_LEN {
        return false;
    }
    let (shorter, longer, short_len, long_len) = if a_len <= b_len {
        (a, b, a_len, b_len)
    } else {
        (b, a, b_len, a_len)
    };
    longer.contains(shorter) && short_len as f64 / long_len as f64 >= MIN_FUZZY_RATIO
}

fn join_url(prefix: &str, path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(files: &[&str]) -> ImageResolver {
        ImageResolver::new(
            ImageSettings {
                media_url: "/media/".into(),
                image_code_url_template:
                    "/upload/resize_cache/iblock/{code}/310_310_2/{code}.png".into(),
                directory_url_prefix: "/static/img/elektrotehnicheskij-zavod-kvt".into(),
            },
            ImageDirectory::from_names(files.iter().copied()),
        )
    }

    #[test]
    fn uploaded_image_wins() {
        let r = resolver(&["SHT-1.jpg"]);
        assert_eq!(
            r.resolve(Some("products/sht.jpg"), "abc", "SHT-1"),
            "/media/products/sht.jpg"
        );
    }

    #[test]
    fn image_codes_are_used_or_expanded() {
        let r = resolver(&[]);
        assert_eq!(
            r.resolve(None, "https://cdn.example.com/a.png", "x"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            r.resolve(None, "/static/img/a.png", "x"),
            "/static/img/a.png"
        );
        assert_eq!(
            r.resolve(None, "a1b2", "x"),
            "/upload/resize_cache/iblock/a1b2/310_310_2/a1b2.png"
        );
    }

    #[test]
    fn placeholder_codes_fall_through_to_title_matching() {
        let r = resolver(&["ГИЛЬЗА_10.jpg"]);
        assert_eq!(
            r.resolve(None, "/static/img/product-placeholder.png", "Гильза-10"),
            "/static/img/elektrotehnicheskij-zavod-kvt/ГИЛЬЗА_10.jpg"
        );
    }

    #[test]
    fn exact_names_prefer_jpg_and_separator_variants() {
        let r = resolver(&["TML_16-6.png", "TML16.jpeg", "TML_16_6.jpg"]);
        assert_eq!(r.match_title("tml_16-6").as_deref(), Some("TML_16_6.jpg"));
        assert_eq!(r.match_title("TML16").as_deref(), Some("TML16.jpeg"));
        // no exact name; "TML16" covers 5 of the 7 characters of "TML16_6"
        assert_eq!(r.match_title("tml 16-6").as_deref(), Some("TML16.jpeg"));
    }

    #[test]
    fn fuzzy_match_requires_seventy_percent_overlap() {
        let r = resolver(&["KVT-SHTIR-10.jpg"]);
        // "KVT_SHTIR" covers 9 of 12 characters
        assert_eq!(
            r.match_title("kvt/shtir").as_deref(),
            Some("KVT-SHTIR-10.jpg")
        );
        // "SHTIR" covers 5 of 12 characters
        assert_eq!(r.match_title("shtir"), None);
    }

    #[test]
    fn short_names_never_match_fuzzily() {
        let r = resolver(&["AB.jpg"]);
        assert_eq!(r.match_title("A"), None);
    }

    #[test]
    fn unmatched_products_get_the_inline_placeholder() {
        let r = resolver(&["OTHER.jpg"]);
        assert_eq!(r.resolve(None, "", "Nothing like it"), PLACEHOLDER_DATA_URI);
        assert_eq!(r.resolve(None, "  ", ""), PLACEHOLDER_DATA_URI);
    }

    #[test]
    fn scan_reads_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ABC-1.jpg"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let listing = ImageDirectory::scan(dir.path()).unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing.contains("ABC-1.jpg"));

        let missing = ImageDirectory::scan(dir.path().join("absent")).unwrap();
        assert!(missing.is_empty());
    }
}
