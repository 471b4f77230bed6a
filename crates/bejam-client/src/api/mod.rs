//! API endpoint implementations.

mod follow;
mod tracks;
mod users;

pub use follow::FollowApi;
pub use tracks::TracksApi;
pub use users::UsersApi;

/// Most ids the provider accepts in a single request.
pub(crate) const MAX_IDS_PER_REQUEST: usize = 50;

/// Largest `limit` the provider accepts for paged endpoints.
pub(crate) const MAX_LIMIT: u32 = 50;

pub(crate) fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIMIT)
}

/// Comma-joined id batches of at most [`MAX_IDS_PER_REQUEST`].
pub(crate) fn id_batches(ids: &[&str]) -> Vec<String> {
    ids.chunks(MAX_IDS_PER_REQUEST)
        .map(|chunk| chunk.join(","))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(500), 50);
    }

    #[test]
    fn test_id_batches() {
        let ids: Vec<String> = (0..120).map(|i| format!("id{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let batches = id_batches(&refs);
        assert_eq!(batches.len(), 3);
        assert!(batches[0].starts_with("id0,id1,"));
        assert_eq!(batches[2].split(',').count(), 20);
        assert!(id_batches(&[]).is_empty());
    }
}
