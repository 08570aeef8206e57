pub mod collection;
pub mod item;
pub mod user;

/// Next `<prefix><n>` id: one past the highest numeric suffix in use.
///
/// Ids that do not carry the prefix or a numeric suffix are ignored, so a
/// table of `u1, u2, u7` yields `u8` and an empty table yields `u1`.
pub fn next_prefixed_id<'a, I>(prefix: char, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prefixed_id() {
        assert_eq!(next_prefixed_id('u', []), "u1");
        assert_eq!(next_prefixed_id('c', ["c1", "c2", "c3"]), "c4");
        assert_eq!(next_prefixed_id('i', ["i1", "i7", "x9", "ifoo"]), "i8");
    }

    #[test]
    fn test_next_prefixed_id_never_reuses_after_gap() {
        // c1 deleted: table size + 1 would collide with c3
        assert_eq!(next_prefixed_id('c', ["c2", "c3"]), "c4");
    }
}
