//! Engagement mutations: likes and comments.
//!
//! Each mutation is applied optimistically to the local engagement view,
//! then persisted. A store failure (or the mutation future being dropped
//! before the store answers) reverts the optimistic change, so the local
//! counters never drift from the edge set on a failed mutation.
//!
//! Like mutations are serialized per (post, user): a second request for a
//! pair that is still in flight is rejected with `MutationInFlight`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use lenz_common::{Comment, FeedError, Post, StoreError};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::traits::PostStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeIntent {
    Like,
    Unlike,
}

/// Result of a settled like mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub intent: LikeIntent,
    pub liked: bool,
    pub like_count: u32,
}

/// Local, optimistic engagement view of one post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostEngagement {
    pub like_count: u32,
    pub comment_count: u32,
    pub likers: HashSet<Uuid>,
}

struct MutatorState {
    posts: HashMap<Uuid, PostEngagement>,
    /// Optimistic deltas not yet settled by the store, per post.
    pending: HashMap<Uuid, PendingDelta>,
    in_flight: HashSet<(Uuid, Uuid)>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PendingDelta {
    likes: i64,
    comments: i64,
}

impl MutatorState {
    fn settle(&mut self, post_id: Uuid, likes: i64, comments: i64) {
        if let Some(pending) = self.pending.get_mut(&post_id) {
            pending.likes -= likes;
            pending.comments -= comments;
            if pending.likes == 0 && pending.comments == 0 {
                self.pending.remove(&post_id);
            }
        }
    }
}

/// Apply a signed delta to a counter, clamped to the `u32` range.
fn shift(count: u32, delta: i64) -> u32 {
    (i64::from(count) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

pub struct EngagementMutator {
    store: Arc<dyn PostStore>,
    state: Mutex<MutatorState>,
}

impl EngagementMutator {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self {
            store,
            state: Mutex::new(MutatorState {
                posts: HashMap::new(),
                pending: HashMap::new(),
                in_flight: HashSet::new(),
            }),
        }
    }

    // --- Local view ---

    /// Start (or refresh) tracking a post's counters. Known likers survive
    /// a refresh, and deltas of mutations still in flight are re-applied
    /// on top of the store's counts.
    pub fn track(&self, post: &Post) {
        let mut state = self.lock();
        let pending = state.pending.get(&post.id).copied().unwrap_or_default();
        let entry = state.posts.entry(post.id).or_default();
        entry.like_count = shift(post.like_count, pending.likes);
        entry.comment_count = shift(post.comment_count, pending.comments);
    }

    pub fn track_all<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) {
        for post in posts {
            self.track(post);
        }
    }

    /// Record an existing like edge. Counts are left alone; the edge is
    /// already part of the store's `likes_count`. Returns false for
    /// untracked posts.
    pub fn track_like(&self, post_id: Uuid, user_id: Uuid) -> bool {
        match self.lock().posts.get_mut(&post_id) {
            Some(engagement) => {
                engagement.likers.insert(user_id);
                true
            }
            None => false,
        }
    }

    pub fn engagement(&self, post_id: Uuid) -> Option<PostEngagement> {
        self.lock().posts.get(&post_id).cloned()
    }

    pub fn is_liked(&self, post_id: Uuid, user_id: Uuid) -> bool {
        self.lock()
            .posts
            .get(&post_id)
            .is_some_and(|e| e.likers.contains(&user_id))
    }

    pub fn is_in_flight(&self, post_id: Uuid, user_id: Uuid) -> bool {
        self.lock().in_flight.contains(&(post_id, user_id))
    }

    // --- Likes ---

    pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome, FeedError> {
        self.mutate_like(post_id, user_id, Some(LikeIntent::Like)).await
    }

    pub async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome, FeedError> {
        self.mutate_like(post_id, user_id, Some(LikeIntent::Unlike)).await
    }

    /// Like if not yet liked, otherwise unlike.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome, FeedError> {
        self.mutate_like(post_id, user_id, None).await
    }

    /// The store's edge set decides `AlreadyLiked` / `NotLiked`; the local
    /// likers only pick the toggle direction and short-circuit a repeat like.
    async fn mutate_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        requested: Option<LikeIntent>,
    ) -> Result<LikeOutcome, FeedError> {
        let guard = self.begin_like(post_id, user_id, requested)?;
        let intent = guard.intent;

        match intent {
            LikeIntent::Like => match self.store.insert_like_edge(post_id, user_id).await {
                Ok(()) => Ok(guard.finish(true, 1)),
                Err(StoreError::Constraint(reason)) => {
                    debug!(%post_id, %user_id, %reason, "Like edge already present");
                    // Already counted by the store.
                    guard.finish(true, 0);
                    Err(FeedError::AlreadyLiked { post_id, user_id })
                }
                Err(e) => Err(guard.fail(e)),
            },
            LikeIntent::Unlike => match self.store.delete_like_edge(post_id, user_id).await {
                Ok(true) => Ok(guard.finish(false, -1)),
                Ok(false) => {
                    // No edge: whatever the view counted for this user was stale.
                    let stale = if guard.was_liked { -1 } else { 0 };
                    guard.finish(false, stale);
                    Err(FeedError::NotLiked { post_id, user_id })
                }
                Err(e) => Err(guard.fail(e)),
            },
        }
    }

    fn begin_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        requested: Option<LikeIntent>,
    ) -> Result<LikeGuard<'_>, FeedError> {
        let mut state = self.lock();
        if state.in_flight.contains(&(post_id, user_id)) {
            debug!(%post_id, %user_id, "Like mutation already in flight");
            return Err(FeedError::MutationInFlight { post_id, user_id });
        }

        let engagement = state
            .posts
            .get_mut(&post_id)
            .ok_or(FeedError::UnknownPost(post_id))?;
        let was_liked = engagement.likers.contains(&user_id);
        let intent = requested.unwrap_or(if was_liked {
            LikeIntent::Unlike
        } else {
            LikeIntent::Like
        });

        let before = engagement.like_count;
        match intent {
            LikeIntent::Like => {
                if was_liked {
                    return Err(FeedError::AlreadyLiked { post_id, user_id });
                }
                engagement.likers.insert(user_id);
                engagement.like_count = shift(before, 1);
            }
            // An unseeded view may still have the edge in the store; the
            // delete decides, and the count only moves once it has.
            LikeIntent::Unlike if was_liked => {
                engagement.likers.remove(&user_id);
                engagement.like_count = shift(before, -1);
            }
            LikeIntent::Unlike => {}
        }
        let delta = i64::from(engagement.like_count) - i64::from(before);

        state.pending.entry(post_id).or_default().likes += delta;
        state.in_flight.insert((post_id, user_id));
        Ok(LikeGuard {
            mutator: self,
            post_id,
            user_id,
            intent,
            was_liked,
            delta,
            committed: false,
        })
    }

    // --- Comments ---

    /// Persist a comment, bumping the local comment count optimistically.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedError::EmptyComment);
        }

        let delta = {
            let mut state = self.lock();
            let engagement = state
                .posts
                .get_mut(&post_id)
                .ok_or(FeedError::UnknownPost(post_id))?;
            let before = engagement.comment_count;
            engagement.comment_count = shift(before, 1);
            let delta = i64::from(engagement.comment_count) - i64::from(before);
            state.pending.entry(post_id).or_default().comments += delta;
            delta
        };
        let mut guard = CommentGuard {
            mutator: self,
            post_id,
            delta,
            committed: false,
        };

        match self.store.insert_comment(post_id, user_id, text).await {
            Ok(comment) => {
                guard.committed = true;
                Ok(comment)
            }
            Err(e) => {
                warn!(%post_id, %user_id, error = %e, "Comment failed; rolling back");
                Err(FeedError::Store(e))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, MutatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Rollback guards
// ---------------------------------------------------------------------------

/// Holds a (post, user) pair in flight and its optimistic count delta.
/// Reverts the optimistic change on drop unless settled.
struct LikeGuard<'a> {
    mutator: &'a EngagementMutator,
    post_id: Uuid,
    user_id: Uuid,
    intent: LikeIntent,
    was_liked: bool,
    delta: i64,
    committed: bool,
}

impl LikeGuard<'_> {
    /// Settle the view on what the store reported: the user's like state and
    /// the net change to the count relative to before the mutation.
    fn finish(mut self, liked: bool, net: i64) -> LikeOutcome {
        self.committed = true;
        let like_count = {
            let mut state = self.mutator.lock();
            match state.posts.get_mut(&self.post_id) {
                Some(engagement) => {
                    if liked {
                        engagement.likers.insert(self.user_id);
                    } else {
                        engagement.likers.remove(&self.user_id);
                    }
                    engagement.like_count = shift(engagement.like_count, net - self.delta);
                    engagement.like_count
                }
                None => 0,
            }
        };
        LikeOutcome {
            post_id: self.post_id,
            user_id: self.user_id,
            intent: self.intent,
            liked,
            like_count,
        }
    }

    fn fail(self, error: StoreError) -> FeedError {
        warn!(
            post_id = %self.post_id,
            user_id = %self.user_id,
            intent = ?self.intent,
            error = %error,
            "Like mutation failed; rolling back"
        );
        // Dropping the guard reverts the optimistic change.
        FeedError::Store(error)
    }
}

impl Drop for LikeGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.mutator.lock();
        state.in_flight.remove(&(self.post_id, self.user_id));
        state.settle(self.post_id, self.delta, 0);
        if self.committed {
            return;
        }
        if let Some(engagement) = state.posts.get_mut(&self.post_id) {
            engagement.like_count = shift(engagement.like_count, -self.delta);
            match self.intent {
                LikeIntent::Like => {
                    engagement.likers.remove(&self.user_id);
                }
                LikeIntent::Unlike if self.was_liked => {
                    engagement.likers.insert(self.user_id);
                }
                LikeIntent::Unlike => {}
            }
        }
    }
}

struct CommentGuard<'a> {
    mutator: &'a EngagementMutator,
    post_id: Uuid,
    delta: i64,
    committed: bool,
}

impl Drop for CommentGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.mutator.lock();
        state.settle(self.post_id, 0, self.delta);
        if self.committed {
            return;
        }
        if let Some(engagement) = state.posts.get_mut(&self.post_id) {
            engagement.comment_count = shift(engagement.comment_count, -self.delta);
        }
    }
}
