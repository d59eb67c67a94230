//! Fixed manifest of shell assets pre-cached at install time, and the
//! naming scheme for versioned cache partitions.

/// Prefix shared by every cache partition this app owns. Partitions under
/// the same root that do not carry the prefix belong to someone else and
/// are never touched.
pub const APP_PREFIX: &str = "platecache";

/// Bumped whenever the static shell changes; old static partitions are
/// deleted on activation.
pub const CACHE_VERSION: u32 = 3;

/// Application shell files cached at install time.
pub const SHELL_ASSETS: &[&str] = &[
    "/",
    "/main.css",
    "/main.js",
    "/restaurant.html",
    "/restaurant_info.css",
    "/restaurant_info.js",
];

/// Placeholder image variants: every width/format combination the
/// responsive markup can request.
pub const PLACEHOLDER_SIZES: [&str; 3] = ["400w", "600w", "800w"];
pub const PLACEHOLDER_FORMATS: [&str; 2] = ["jpg", "webp"];

pub fn static_cache_name() -> String {
    format!("{}-static-v{}", APP_PREFIX, CACHE_VERSION)
}

pub fn images_cache_name() -> String {
    format!("{}-img", APP_PREFIX)
}

/// Partitions the current version keeps; everything else with the app
/// prefix is removed on activation.
pub fn allowed_caches() -> [String; 2] {
    [static_cache_name(), images_cache_name()]
}

/// Path of the placeholder matching a requested image size and format.
pub fn placeholder_path(size: &str, format: &str) -> String {
    format!("/assets/placeholder-image.{}.{}", size, format)
}

/// The complete install-time manifest: shell files plus all placeholder
/// variants.
pub fn install_manifest() -> Vec<String> {
    let mut manifest: Vec<String> = SHELL_ASSETS.iter().map(|s| s.to_string()).collect();
    for size in PLACEHOLDER_SIZES {
        for format in PLACEHOLDER_FORMATS {
            manifest.push(placeholder_path(size, format));
        }
    }
    manifest
}
