/// Final `/`-delimited segment of the prefix with spaces replaced by `_`.
///
/// Trailing slashes are ignored, so `NFL/shoot42/` and `NFL/shoot42` name the
/// same project. Returns an empty string when no segment remains.
pub fn project_name_from_prefix(prefix: &str) -> String {
    prefix
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .replace(' ', "_")
}

pub fn batch_label(project_name: &str) -> String {
    format!("batch-{project_name}")
}

/// Store prefix under which the frame images of one base path live.
pub fn frames_prefix(base_prefix: &str, frame_folder: &str) -> String {
    let trimmed = base_prefix.trim_end_matches('/');
    format!("{trimmed}/{frame_folder}")
}
