//! Positional index rules for ordered collections.
//!
//! Negative indices count from the end, but insertion and lookup count
//! differently:
//!
//! ```text
//! len = 3                 [a, b, c]
//! insert  -1 -> 3 (append)   -2 -> 2   -4 -> 0   -9 -> 0 (clamped)
//! lookup  -1 -> 2 (c)        -3 -> 0   -4 -> out of range
//! ```

/// Resolve an insertion position. `None` appends. The result is always in
/// `0..=len`.
pub fn resolve_insert_index(index: Option<isize>, len: usize) -> usize {
    let Some(index) = index else {
        return len;
    };
    let resolved = if index < 0 {
        len as isize + index + 1
    } else {
        index
    };
    resolved.clamp(0, len as isize) as usize
}

/// Resolve a lookup position. Anything outside `0..len` is `None`.
pub fn resolve_lookup_index(index: isize, len: usize) -> Option<usize> {
    let resolved = if index < 0 { len as isize + index } else { index };
    (0..len as isize).contains(&resolved).then_some(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_index() {
        assert_eq!(resolve_insert_index(None, 3), 3);
        assert_eq!(resolve_insert_index(Some(0), 3), 0);
        assert_eq!(resolve_insert_index(Some(2), 3), 2);
        assert_eq!(resolve_insert_index(Some(7), 3), 3);
        assert_eq!(resolve_insert_index(Some(-1), 3), 3);
        assert_eq!(resolve_insert_index(Some(-2), 3), 2);
        assert_eq!(resolve_insert_index(Some(-4), 3), 0);
        assert_eq!(resolve_insert_index(Some(-9), 3), 0);
        assert_eq!(resolve_insert_index(Some(2), 0), 0);
        assert_eq!(resolve_insert_index(Some(-1), 0), 0);
    }

    #[test]
    fn test_lookup_index() {
        assert_eq!(resolve_lookup_index(0, 3), Some(0));
        assert_eq!(resolve_lookup_index(2, 3), Some(2));
        assert_eq!(resolve_lookup_index(3, 3), None);
        assert_eq!(resolve_lookup_index(-1, 3), Some(2));
        assert_eq!(resolve_lookup_index(-3, 3), Some(0));
        assert_eq!(resolve_lookup_index(-4, 3), None);
        assert_eq!(resolve_lookup_index(0, 0), None);
        assert_eq!(resolve_lookup_index(-1, 0), None);
    }
}
