/// Strips registry host, tag and digest from an image reference.
///
/// `registry.local:5000/team/app:1.2` becomes `team/app`; `redis:7` becomes `redis`.
pub fn normalize_image(name: &str) -> String {
    let name = name.trim();
    let name = name.split_once('@').map_or(name, |(repo, _)| repo);

    let name = match name.rfind(':') {
        Some(colon) if !name[colon..].contains('/') => &name[..colon],
        _ => name,
    };

    match name.split_once('/') {
        Some((first, rest)) if is_registry(first) => rest.to_string(),
        _ => name.to_string(),
    }
}

/// True for an image ID (`sha256:<hex>` or bare hex) rather than a name.
///
/// Docker lists a container's image by ID once the tag it was created from is gone.
pub fn is_image_id(name: &str) -> bool {
    let hex = name.trim().strip_prefix("sha256:").unwrap_or(name.trim());
    hex.len() >= 12 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_registry(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}
