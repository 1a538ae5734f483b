//! Stable node names
//!
//! Repeated loads of the same logical item must derive the same name; the
//! materializer's dedup check keys on it.

use super::AssetKind;

/// Number of trailing id characters kept in a node name
pub const ID_SUFFIX_LEN: usize = 8;

/// Last [`ID_SUFFIX_LEN`] characters of an id
pub fn id_suffix(id: &str) -> &str {
    let count = id.chars().count();
    if count <= ID_SUFFIX_LEN {
        return id;
    }
    let start = id
        .char_indices()
        .nth(count - ID_SUFFIX_LEN)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &id[start..]
}

/// Collapse a display string into something safe to embed in a name
pub fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '.' => Some(c),
            c if c.is_whitespace() || c == '_' => Some('_'),
            _ => None,
        })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Short label for a collection: the last `::` segment of its id
pub fn group_label(collection_id: &str) -> &str {
    collection_id.rsplit("::").next().unwrap_or(collection_id)
}

/// Derive the node name for an asset
///
/// Items with an id get `{group}_{name}_{suffix}`, where `group` falls back to
/// the asset kind. Ungrouped raw assets get `{kind}_{suffix}` of their source.
pub fn node_name(
    group: Option<&str>,
    kind: AssetKind,
    display_name: &str,
    object_id: Option<&str>,
    source_key: &str,
) -> String {
    match object_id {
        Some(id) => format!(
            "{}_{}_{}",
            sanitize(group.unwrap_or(kind.as_str())),
            sanitize(display_name),
            id_suffix(id)
        ),
        None => format!("{}_{}", kind.as_str(), id_suffix(source_key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_suffix() {
        assert_eq!(id_suffix("0x1234567890abcdef"), "90abcdef");
        assert_eq!(id_suffix("short"), "short");
        assert_eq!(id_suffix("ééééééééé"), "éééééééé");
    }

    #[test]
    fn test_node_name_with_group() {
        let name = node_name(
            Some("Sculpture"),
            AssetKind::Model,
            "The Thinker",
            Some("0xaaaabbbbccccdddd"),
            "blob",
        );
        assert_eq!(name, "Sculpture_The_Thinker_ccccdddd");
    }

    #[test]
    fn test_node_name_falls_back_to_kind() {
        let name = node_name(None, AssetKind::Image, "Poster!", Some("0x01"), "http://x");
        assert_eq!(name, "image_Poster_0x01");

        let raw = node_name(None, AssetKind::Model, "", None, "blob-abcdefghijkl");
        assert_eq!(raw, "model_efghijkl");
    }

    #[test]
    fn test_group_label() {
        assert_eq!(group_label("0x2::gallery::Sculpture"), "Sculpture");
        assert_eq!(group_label("plain"), "plain");
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize("  !!  "), "untitled");
    }
}
