//! Format identifier → MIME type lookup and MIME capability sets
//!
//! ImageMagick reports a format identifier (`%m`, e.g. `JPEG`, `PNG32`) but
//! no MIME type, so the mapping is handcrafted. Tables are plain immutable
//! data: build one, wrap it in an `Arc` and hand it to as many handlers as
//! needed.

use std::collections::{HashMap, HashSet};

/// Reference mapping between ImageMagick identifiers and MIME types.
const IMAGEMAGICK_FORMATS: &[(&str, &str)] = &[
    ("bmp", "image/bmp"),
    ("bmp2", "image/bmp"),
    ("bmp3", "image/bmp"),
    ("cur", "image/x-win-bitmap"),
    ("dcx", "image/dcx"),
    ("epdf", "application/pdf"),
    ("epi", "application/postscript"),
    ("eps", "application/postscript"),
    ("eps2", "application/postscript"),
    ("eps3", "application/postscript"),
    ("epsf", "application/postscript"),
    ("epsi", "application/postscript"),
    ("ept", "application/postscript"),
    ("ept2", "application/postscript"),
    ("ept3", "application/postscript"),
    ("fax", "image/g3fax"),
    ("fits", "image/x-fits"),
    ("g3", "image/g3fax"),
    ("gif", "image/gif"),
    ("gif87", "image/gif"),
    ("icb", "application/x-icb"),
    ("ico", "image/x-win-bitmap"),
    ("icon", "image/x-win-bitmap"),
    ("jng", "image/jng"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("m2v", "video/mpeg2"),
    ("miff", "application/x-mif"),
    ("mng", "video/mng"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("otb", "image/x-otb"),
    ("p7", "image/x-xv"),
    ("palm", "image/x-palm"),
    ("pbm", "image/pbm"),
    ("pcd", "image/pcd"),
    ("pcds", "image/pcd"),
    ("pcl", "application/pcl"),
    ("pct", "image/pict"),
    ("pcx", "image/x-pcx"),
    ("pdb", "application/vnd.palm"),
    ("pdf", "application/pdf"),
    ("pgm", "image/x-pgm"),
    ("picon", "image/xpm"),
    ("pict", "image/pict"),
    ("pjpeg", "image/pjpeg"),
    ("png", "image/png"),
    ("png24", "image/png"),
    ("png32", "image/png"),
    ("png8", "image/png"),
    ("pnm", "image/pbm"),
    ("ppm", "image/x-ppm"),
    ("ps", "application/postscript"),
    ("psd", "image/x-photoshop"),
    ("ptif", "image/x-ptiff"),
    ("ras", "image/ras"),
    ("sgi", "image/sgi"),
    ("sun", "image/ras"),
    ("svg", "image/svg+xml"),
    ("svgz", "image/svg"),
    ("text", "text/plain"),
    ("tga", "image/tga"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("txt", "text/plain"),
    ("vda", "image/vda"),
    ("viff", "image/x-viff"),
    ("vst", "image/vst"),
    ("wbmp", "image/vnd.wap.wbmp"),
    ("webp", "image/webp"),
    ("xbm", "image/x-xbitmap"),
    ("xpm", "image/x-xbitmap"),
    ("xv", "image/x-viff"),
    ("xwd", "image/xwd"),
];

/// MIME types the ImageMagick backend is able to analyze.
const IMAGEMAGICK_READABLE: &[&str] = &[
    "application/pcl",
    "application/pdf",
    "application/postscript",
    "application/vnd.palm",
    "application/x-icb",
    "application/x-mif",
    "image/bmp",
    "image/dcx",
    "image/g3fax",
    "image/gif",
    "image/jng",
    "image/jpeg",
    "image/pbm",
    "image/pcd",
    "image/pict",
    "image/pjpeg",
    "image/png",
    "image/ras",
    "image/sgi",
    "image/svg",
    "image/svg+xml",
    "image/tga",
    "image/tiff",
    "image/vda",
    "image/vnd.wap.wbmp",
    "image/vst",
    "image/webp",
    "image/x-fits",
    "image/x-ms-bmp",
    "image/x-otb",
    "image/x-palm",
    "image/x-pcx",
    "image/x-pgm",
    "image/x-photoshop",
    "image/x-ppm",
    "image/x-ptiff",
    "image/x-viff",
    "image/x-win-bitmap",
    "image/x-xbitmap",
    "image/x-xv",
    "image/xpm",
    "image/xwd",
    "text/plain",
    "video/mng",
    "video/mpeg",
    "video/mpeg2",
];

/// MIME types that carry EXIF tags worth dumping.
pub const TAG_CAPABLE_TYPES: &[&str] = &["image/jpeg", "image/tiff"];

/// Case-insensitive format identifier → MIME type table.
#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    map: HashMap<String, String>,
}

impl MimeTable {
    /// Empty table; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// The handcrafted ImageMagick identifier table.
    pub fn imagemagick() -> Self {
        Self::from_entries(IMAGEMAGICK_FORMATS.iter().copied())
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = Self::new();
        for (format, mime) in entries {
            table.insert(format.as_ref(), mime.as_ref());
        }
        table
    }

    pub fn insert(&mut self, format: &str, mime: &str) {
        self.map.insert(format.to_lowercase(), mime.to_lowercase());
    }

    /// Look up a format identifier as printed by the tool (any case).
    pub fn lookup(&self, format: &str) -> Option<&str> {
        self.map.get(&format.to_lowercase()).map(String::as_str)
    }

    /// Whether `mime` is the target of at least one identifier.
    pub fn contains_mime(&self, mime: &str) -> bool {
        let mime = mime.to_lowercase();
        self.map.values().any(|m| *m == mime)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Case-insensitive set of MIME types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeSet {
    types: HashSet<String>,
}

impl MimeSet {
    /// Types the ImageMagick backend can read.
    pub fn imagemagick_readable() -> Self {
        IMAGEMAGICK_READABLE.iter().collect()
    }

    /// Types the tag normalizer runs for.
    pub fn tag_capable() -> Self {
        TAG_CAPABLE_TYPES.iter().collect()
    }

    pub fn insert(&mut self, mime: &str) {
        self.types.insert(mime.to_lowercase());
    }

    pub fn contains(&self, mime: &str) -> bool {
        self.types.contains(&mime.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for MimeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = MimeSet::default();
        for mime in iter {
            set.insert(mime.as_ref());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = MimeTable::imagemagick();
        assert_eq!(table.lookup("JPEG"), Some("image/jpeg"));
        assert_eq!(table.lookup("Png32"), Some("image/png"));
        assert_eq!(table.lookup("gif"), Some("image/gif"));
        assert_eq!(table.lookup("XYZ"), None);
    }

    #[test]
    fn test_custom_entries_are_lowercased() {
        let table = MimeTable::from_entries([("HEIC", "Image/HEIC")]);
        assert_eq!(table.lookup("heic"), Some("image/heic"));
        assert!(table.contains_mime("IMAGE/HEIC"));
        assert!(MimeTable::new().lookup("png").is_none());
    }

    #[test]
    fn test_every_mapped_image_type_is_readable() {
        let table = MimeTable::imagemagick();
        let readable = MimeSet::imagemagick_readable();
        for (format, _) in IMAGEMAGICK_FORMATS {
            let mime = table.lookup(format).unwrap();
            assert!(readable.contains(mime), "{} -> {} not readable", format, mime);
        }
    }

    #[test]
    fn test_tag_capable_defaults() {
        let set = MimeSet::tag_capable();
        assert_eq!(set.len(), 2);
        assert!(set.contains("image/jpeg"));
        assert!(set.contains("IMAGE/TIFF"));
        assert!(!set.contains("image/png"));
    }
}
