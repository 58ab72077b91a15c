//! Build a UserContext from the DataIndex.

use crate::types::{CandidateCounts, UserContext};
use data_loader::{DataIndex, Rating, UserId};

/// Gather the user's watch history once, so filters get O(1) lookups
/// instead of querying the index per candidate.
///
/// A user without ratings gets an empty context; whether they can be served
/// at all is decided by the model.
pub fn build_user_context(data_index: &DataIndex, user_id: UserId) -> UserContext {
    let mut context = UserContext::new(user_id);
    context.watched_movies = data_index
        .get_user_ratings(user_id)
        .iter()
        .map(|r| r.movie_id)
        .collect();
    context
}

/// The user's ratings, highest first, ties broken by movie id
pub fn watched_by_rating(data_index: &DataIndex, user_id: UserId) -> Vec<Rating> {
    let mut ratings = data_index.get_user_ratings(user_id).to_vec();
    ratings.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then(a.movie_id.cmp(&b.movie_id))
    });
    ratings
}

/// Catalog size, the user's unwatched count and the number of movies with
/// fewer than `min_rating_count` ratings
pub fn candidate_counts(
    data_index: &DataIndex,
    user_id: UserId,
    min_rating_count: Option<u32>,
) -> CandidateCounts {
    let context = build_user_context(data_index, user_id);
    let movie_ids = data_index.get_all_movie_ids();
    CandidateCounts {
        catalog: movie_ids.len(),
        unwatched: movie_ids
            .iter()
            .filter(|id| !context.watched_movies.contains(id))
            .count(),
        below_floor: min_rating_count.map(|floor| {
            movie_ids
                .iter()
                .filter(|&&id| data_index.rating_count(id) < floor)
                .count()
        }),
    }
}
