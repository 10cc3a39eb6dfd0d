use crate::types::SegmentId;

/// Whether `needle` appears in `haystack` in order, not necessarily
/// contiguously. An empty needle is a subsequence of anything.
pub fn is_subsequence(needle: &[SegmentId], haystack: &[SegmentId]) -> bool {
    let mut remaining = needle.iter().peekable();
    for item in haystack {
        match remaining.peek() {
            Some(&&wanted) if wanted == *item => {
                remaining.next();
            }
            Some(_) => {}
            None => return true,
        }
    }
    remaining.peek().is_none()
}
