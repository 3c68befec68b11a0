//! Naming conventions shared by the adapters
//!
//! Group names in HDF5 files are `<kind><id zero-padded to 8>`,
//! e.g. `lattice00000007`, so ids survive without a separate index
//! attribute. Tree tags are snake_case model field names; legacy camelCase
//! tags (`boundingBox`, `threeDVolume`) map onto them through `tag_for`.

use sffrw_core::Id;

/// Digits in a zero-padded group id
pub const GROUP_ID_WIDTH: usize = 8;

/// Group name for an entity
pub fn group_name(kind: &str, id: Id) -> String {
    format!("{}{:0width$}", kind, id, width = GROUP_ID_WIDTH)
}

/// Parse a group name produced by `group_name` for `kind`
pub fn parse_group_name(kind: &str, name: &str) -> Option<Id> {
    let digits = name.strip_prefix(kind)?;
    if digits.len() < GROUP_ID_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Tag for a field name: camelCase becomes snake_case, snake_case is unchanged
pub fn tag_for(field: &str) -> String {
    let mut tag = String::with_capacity(field.len() + 4);
    for (i, ch) in field.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !tag.ends_with('_') {
                tag.push('_');
            }
            tag.push(ch.to_ascii_lowercase());
        } else {
            tag.push(ch);
        }
    }
    tag
}
