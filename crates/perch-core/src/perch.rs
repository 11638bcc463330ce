use crate::comments::CommentRepository;
use crate::config::Config;
use crate::error::{CommentError, PerchError, PullError, ReviewError};
use crate::events::EventRepository;
use crate::mentions;
use crate::pulls::PullRepository;
use crate::reviews::ReviewRepository;
use crate::store::Store;
use crate::types::event::EventBody;
use crate::types::{
    Comment, CommentFilter, CommentKind, CreateCodeCommentInput, CreateCommentInput,
    CreateSubmittedReviewInput, CreateUserInput, DismissReviewInput, FinalizeReviewInput, Pull,
    PullId, RegisterPullInput, Review, ReviewFilter, ReviewId, ReviewKind, SubmitReviewInput,
    User, UserId,
};
use crate::users::UserRepository;
use chrono::Utc;
use perch_events::bus::EventBus;
use perch_events::types::{EventRecord, EventSource};
use perch_git::{DiffContext, GitError};
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub source: EventSource,
    pub correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new(source: EventSource, correlation_id: Option<String>) -> Self {
        Self {
            source,
            correlation_id,
        }
    }
}

/// Where an incoming code comment lands. Classified once up front, then
/// matched exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    /// A standalone reply under an already-submitted review at the same
    /// file and line. No review lifecycle changes.
    Reply { review_id: ReviewId },
    /// Part of the actor's pending review, created on demand. `auto_submit`
    /// turns a lone comment into an immediately submitted Comment review.
    ReviewComment { auto_submit: bool },
}

pub struct Perch<S: Store> {
    store: S,
    event_bus: EventBus,
    diff: Box<dyn DiffContext>,
    config: Config,
}

impl<S: Store> Perch<S> {
    pub fn new(store: S, event_bus: EventBus, diff: Box<dyn DiffContext>, config: Config) -> Self {
        Self {
            store,
            event_bus,
            diff,
            config,
        }
    }

    pub fn pulls(&self) -> PullsApi<'_, S> {
        PullsApi { core: self }
    }

    pub fn users(&self) -> UsersApi<'_, S> {
        UsersApi { core: self }
    }

    pub fn comments(&self) -> CommentsApi<'_, S> {
        CommentsApi { core: self }
    }

    pub fn reviews(&self) -> ReviewsApi<'_, S> {
        ReviewsApi { core: self }
    }

    pub fn events(&self) -> EventsApi<'_, S> {
        EventsApi { core: self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` in one transaction, append the events it buffered to the
    /// event log inside that same transaction, and publish them to the bus
    /// only after commit.
    fn with_events<T, F>(&self, ctx: &RequestContext, f: F) -> Result<T, PerchError>
    where
        F: FnOnce(&S) -> Result<(T, Vec<EventBody>), PerchError>,
    {
        let (value, records) = self.store.with_tx(|store| {
            let (value, bodies) = f(store)?;
            let mut records = Vec::new();
            for body in bodies {
                let record = build_event_record(ctx, body)?;
                let record = store.events().append(record)?;
                records.push(record);
            }
            Ok((value, records))
        })?;
        for record in records {
            let _ = self.event_bus.publish(record);
        }
        Ok(value)
    }
}

pub struct PullsApi<'a, S: Store> {
    core: &'a Perch<S>,
}

impl<'a, S: Store> PullsApi<'a, S> {
    pub fn register(
        &self,
        ctx: &RequestContext,
        input: RegisterPullInput,
    ) -> Result<Pull, PerchError> {
        let merge_base = self.core.diff.merge_base(&input.base_ref, &input.head_ref)?;
        self.core.with_events(ctx, |store| {
            let now = Utc::now();
            let pull = store.pulls().create(Pull {
                id: PullId::generate(),
                repo_id: input.repo_id.clone(),
                index: input.index,
                author: input.author.clone(),
                title: input.title.clone(),
                base_ref: input.base_ref.clone(),
                head_ref: input.head_ref.clone(),
                merge_base: merge_base.clone(),
                created_at: now,
                updated_at: now,
            })?;
            Ok((pull.clone(), vec![EventBody::PullRegistered { pull }]))
        })
    }

    pub fn get(&self, id: &PullId) -> Result<Option<Pull>, PerchError> {
        self.core.store.pulls().get(id).map_err(PerchError::from)
    }

    pub fn list(&self) -> Result<Vec<Pull>, PerchError> {
        self.core.store.pulls().list().map_err(PerchError::from)
    }
}

pub struct UsersApi<'a, S: Store> {
    core: &'a Perch<S>,
}

impl<'a, S: Store> UsersApi<'a, S> {
    pub fn create(&self, ctx: &RequestContext, input: CreateUserInput) -> Result<User, PerchError> {
        self.core.with_events(ctx, |store| {
            let user = store.users().create(input)?;
            Ok((user.clone(), vec![EventBody::UserCreated { user }]))
        })
    }

    pub fn get(&self, id: &UserId) -> Result<Option<User>, PerchError> {
        self.core.store.users().get(id).map_err(PerchError::from)
    }

    pub fn get_by_handle(&self, handle: &str) -> Result<Option<User>, PerchError> {
        self.core
            .store
            .users()
            .get_by_handle(handle)
            .map_err(PerchError::from)
    }
}

pub struct CommentsApi<'a, S: Store> {
    core: &'a Perch<S>,
}

impl<'a, S: Store> CommentsApi<'a, S> {
    /// Create a code comment, deciding whether it becomes a standalone
    /// reply, joins the actor's pending review, or additionally submits that
    /// review on the spot.
    pub fn create(
        &self,
        ctx: &RequestContext,
        input: CreateCodeCommentInput,
    ) -> Result<Comment, PerchError> {
        let diff = self.core.diff.as_ref();
        let config = &self.core.config;
        self.core.with_events(ctx, |store| {
            let pull = store
                .pulls()
                .get(&input.pull_id)?
                .ok_or(PullError::PullNotFound)?;
            let placement = classify_placement(store, &input)?;
            match placement {
                Placement::Reply { review_id } => {
                    let review = store
                        .reviews()
                        .get(&review_id)?
                        .ok_or(ReviewError::ReviewNotFound)?;
                    let comment = create_code_comment(
                        store,
                        diff,
                        config,
                        &pull,
                        &review,
                        &input.actor,
                        &input.tree_path,
                        input.line,
                        input.content.clone(),
                    )?;
                    let mentions = mentions::resolve(&store.users(), &input.actor, &comment.content)?;
                    let events = vec![EventBody::CommentCreated {
                        comment: comment.clone(),
                        mentions,
                    }];
                    Ok((comment, events))
                }
                Placement::ReviewComment { auto_submit } => {
                    let review = store.reviews().get_or_create_pending(
                        &input.pull_id,
                        &input.actor,
                        &input.latest_commit_id,
                    )?;
                    let comment = create_code_comment(
                        store,
                        diff,
                        config,
                        &pull,
                        &review,
                        &input.actor,
                        &input.tree_path,
                        input.line,
                        input.content.clone(),
                    )?;
                    if auto_submit {
                        let (_, events) = submit_review(
                            store,
                            diff,
                            SubmitReviewInput {
                                actor: input.actor.clone(),
                                pull_id: input.pull_id.clone(),
                                kind: ReviewKind::Comment,
                                content: String::new(),
                                commit_id: input.latest_commit_id.clone(),
                                official: false,
                                attachments: Vec::new(),
                                review_id: Some(review.id.clone()),
                            },
                        )?;
                        Ok((comment, events))
                    } else {
                        // Batched comments stay silent until submission.
                        Ok((comment, Vec::new()))
                    }
                }
            }
        })
    }

    pub fn list_for_pull(&self, pull_id: &PullId) -> Result<Vec<Comment>, PerchError> {
        self.core
            .store
            .comments()
            .list(CommentFilter {
                pull_id: Some(pull_id.clone()),
                ..CommentFilter::default()
            })
            .map_err(PerchError::from)
    }

    pub fn list(&self, filter: CommentFilter) -> Result<Vec<Comment>, PerchError> {
        self.core
            .store
            .comments()
            .list(filter)
            .map_err(PerchError::from)
    }
}

pub struct ReviewsApi<'a, S: Store> {
    core: &'a Perch<S>,
}

impl<'a, S: Store> ReviewsApi<'a, S> {
    /// Finalize the actor's pending review into a terminal kind, or create
    /// the review directly when no pending one exists.
    pub fn submit(
        &self,
        ctx: &RequestContext,
        input: SubmitReviewInput,
    ) -> Result<(Review, Comment), PerchError> {
        let diff = self.core.diff.as_ref();
        self.core
            .with_events(ctx, |store| submit_review(store, diff, input))
    }

    /// Flip a verdict review's dismissed flag, optionally cascading to the
    /// reviewer's other outstanding reviews on the pull. Dismissing records
    /// an audit comment; un-dismissing is a bare flag flip.
    pub fn dismiss(
        &self,
        ctx: &RequestContext,
        input: DismissReviewInput,
    ) -> Result<Option<Comment>, PerchError> {
        self.core.with_events(ctx, |store| {
            let review = store
                .reviews()
                .get(&input.review_id)?
                .ok_or(ReviewError::ReviewNotFound)?;
            if !review.kind.is_verdict() {
                return Err(ReviewError::InvalidReviewKind { kind: review.kind }.into());
            }
            let pull = store
                .pulls()
                .get(&review.pull_id)?
                .ok_or(PullError::PullNotFound)?;
            if pull.repo_id != input.expected_repo_id {
                return Err(ReviewError::RepositoryMismatch.into());
            }

            let review = store.reviews().set_dismissed(&review.id, input.dismiss)?;
            if input.dismiss && input.cascade_priors {
                // Cascaded dismissals skip the verdict check on purpose.
                let others = store.reviews().list(ReviewFilter {
                    pull_id: Some(pull.id.clone()),
                    reviewer: Some(review.reviewer.clone()),
                    kind: None,
                    dismissed: Some(false),
                })?;
                for other in others {
                    if other.id == review.id {
                        continue;
                    }
                    debug!(review = %other.id, "cascading dismissal");
                    store.reviews().set_dismissed(&other.id, true)?;
                }
            }

            if !input.dismiss {
                return Ok((None, Vec::new()));
            }

            let comment = store.comments().create(CreateCommentInput {
                pull_id: pull.id.clone(),
                author: input.actor.clone(),
                kind: CommentKind::DismissReview,
                tree_path: String::new(),
                line: 0,
                commit_sha: String::new(),
                patch: String::new(),
                invalidated: false,
                review_id: Some(review.id.clone()),
                content: input.message.clone(),
                attachments: Vec::new(),
            })?;
            let events = vec![EventBody::ReviewDismissed {
                actor: input.actor.clone(),
                review,
                comment: comment.clone(),
            }];
            Ok((Some(comment), events))
        })
    }

    pub fn get(&self, id: &ReviewId) -> Result<Option<Review>, PerchError> {
        self.core.store.reviews().get(id).map_err(PerchError::from)
    }

    pub fn list(&self, filter: ReviewFilter) -> Result<Vec<Review>, PerchError> {
        self.core
            .store
            .reviews()
            .list(filter)
            .map_err(PerchError::from)
    }
}

pub struct EventsApi<'a, S: Store> {
    core: &'a Perch<S>,
}

impl<'a, S: Store> EventsApi<'a, S> {
    pub fn list(
        &self,
        after: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<EventRecord>, PerchError> {
        self.core.store.events().list(after, limit)
    }
}

fn classify_placement<S: Store>(
    store: &S,
    input: &CreateCodeCommentInput,
) -> Result<Placement, PerchError> {
    if !input.part_of_batch {
        if let Some(review_id) = &input.reply_to {
            let exists = store.comments().exists_on_submitted_review(
                &input.pull_id,
                &input.tree_path,
                input.line,
            )?;
            if exists {
                return Ok(Placement::Reply {
                    review_id: review_id.clone(),
                });
            }
        }
    }
    Ok(Placement::ReviewComment {
        auto_submit: !input.part_of_batch,
    })
}

/// Create one code comment attached to `review`, deriving its commit/patch
/// anchor. Earlier comments at the same (review, path, line) donate their
/// anchor verbatim so the spot renders consistently.
#[allow(clippy::too_many_arguments)]
fn create_code_comment<S: Store>(
    store: &S,
    diff: &dyn DiffContext,
    config: &Config,
    pull: &Pull,
    review: &Review,
    actor: &UserId,
    tree_path: &str,
    line: i64,
    content: String,
) -> Result<Comment, PerchError> {
    let mut commit_sha = String::new();
    let mut patch = String::new();
    let mut invalidated = false;

    if line != 0 {
        if let Some(first) = store
            .comments()
            .first_at_anchor(&review.id, tree_path, line)?
        {
            commit_sha = first.commit_sha;
            patch = first.patch;
            invalidated = first.invalidated;
        } else {
            let unsigned = u32::try_from(line.unsigned_abs()).map_err(|_| {
                CommentError::InvalidInput {
                    message: format!("line out of range: {line}"),
                }
            })?;
            // Comments inside a review anchor to the commit the reviewer is
            // looking at; fall back to the live head ref.
            let blame_rev = if review.commit_id.is_empty() {
                pull.head_ref.clone()
            } else {
                review.commit_id.clone()
            };
            match diff.line_owner(&blame_rev, tree_path, unsigned) {
                Ok(sha) => commit_sha = sha,
                Err(err @ (GitError::PathNotFound { .. } | GitError::InsufficientLines { .. })) => {
                    debug!(path = tree_path, line, %err, "blame degraded, anchoring without owner commit");
                }
                Err(err) => return Err(err.into()),
            }
            // A degraded blame does not suppress the patch; the snippet is
            // still cut against the current tip.
            let tip = diff.ref_tip(&pull.head_ref)?;
            if commit_sha.is_empty() {
                commit_sha = tip.clone();
            }
            patch = diff
                .patch_around_line(
                    &pull.merge_base,
                    &tip,
                    tree_path,
                    unsigned,
                    line < 0,
                    config.code_comment_context_lines,
                )
                .map_err(|err| {
                    error!(path = tree_path, line, %err, "patch extraction failed");
                    err
                })?;
        }
    }

    store
        .comments()
        .create(CreateCommentInput {
            pull_id: pull.id.clone(),
            author: actor.clone(),
            kind: CommentKind::Code,
            tree_path: tree_path.to_string(),
            line,
            commit_sha,
            patch,
            invalidated,
            review_id: Some(review.id.clone()),
            content,
            attachments: Vec::new(),
        })
        .map_err(PerchError::from)
}

fn submit_review<S: Store>(
    store: &S,
    diff: &dyn DiffContext,
    input: SubmitReviewInput,
) -> Result<((Review, Comment), Vec<EventBody>), PerchError> {
    if !input.kind.is_terminal() {
        return Err(ReviewError::InvalidInput {
            message: "cannot submit a review as Pending".to_string(),
        }
        .into());
    }
    let pull = store
        .pulls()
        .get(&input.pull_id)?
        .ok_or(PullError::PullNotFound)?;

    let pending = match &input.review_id {
        Some(id) => {
            let review = store.reviews().get(id)?.ok_or(ReviewError::ReviewNotFound)?;
            if review.kind.is_terminal() {
                return Err(ReviewError::AlreadyTerminal.into());
            }
            if review.pull_id != input.pull_id || review.reviewer != input.actor {
                return Err(ReviewError::InvalidInput {
                    message: "review belongs to another pull or reviewer".to_string(),
                }
                .into());
            }
            Some(review)
        }
        None => store.reviews().get_pending(&input.pull_id, &input.actor)?,
    };

    let code_comments = match &pending {
        Some(review) => store.comments().list(CommentFilter {
            review_id: Some(review.id.clone()),
            kind: Some(CommentKind::Code),
            ..CommentFilter::default()
        })?,
        None => Vec::new(),
    };

    if matches!(input.kind, ReviewKind::Comment | ReviewKind::RequestChanges)
        && input.content.trim().is_empty()
        && code_comments.is_empty()
    {
        return Err(ReviewError::ContentEmpty.into());
    }

    let anchor = if input.commit_id.is_empty() {
        pending
            .as_ref()
            .map(|review| review.commit_id.clone())
            .unwrap_or_default()
    } else {
        input.commit_id.clone()
    };

    // Only verdicts can be stale, and only when the tip moved with an actual
    // content change; a no-op rebase keeps the review fresh.
    let mut stale = false;
    if input.kind.is_verdict() && !anchor.is_empty() {
        let tip = diff.ref_tip(&pull.head_ref)?;
        if anchor != tip {
            stale = diff.content_changed(&pull.base_ref, &anchor, &tip)?;
        }
    }

    let review = match &pending {
        Some(review) => store.reviews().finalize(
            &review.id,
            FinalizeReviewInput {
                kind: input.kind,
                content: input.content.clone(),
                commit_id: anchor,
                official: input.official,
                stale,
            },
        )?,
        None => store.reviews().create_submitted(CreateSubmittedReviewInput {
            pull_id: input.pull_id.clone(),
            reviewer: input.actor.clone(),
            kind: input.kind,
            content: input.content.clone(),
            commit_id: anchor,
            official: input.official,
            stale,
        })?,
    };

    let summary = store.comments().create(CreateCommentInput {
        pull_id: pull.id.clone(),
        author: input.actor.clone(),
        kind: CommentKind::Review,
        tree_path: String::new(),
        line: 0,
        commit_sha: review.commit_id.clone(),
        patch: String::new(),
        invalidated: false,
        review_id: Some(review.id.clone()),
        content: input.content.clone(),
        attachments: input.attachments.clone(),
    })?;

    // Everything attached to the review becomes visible now: one event for
    // the summary, one per code comment.
    let mut events = Vec::new();
    let summary_mentions = mentions::resolve(&store.users(), &input.actor, &summary.content)?;
    events.push(EventBody::ReviewSubmitted {
        review: review.clone(),
        summary: summary.clone(),
        mentions: summary_mentions,
    });
    for comment in code_comments {
        let comment_mentions = mentions::resolve(&store.users(), &comment.author, &comment.content)?;
        events.push(EventBody::CodeCommentCreated {
            comment,
            mentions: comment_mentions,
        });
    }

    Ok(((review, summary), events))
}

fn build_event_record(ctx: &RequestContext, body: EventBody) -> Result<EventRecord, PerchError> {
    let value = serde_json::to_value(body).map_err(|err| PerchError::Internal {
        message: err.to_string(),
    })?;
    Ok(EventRecord {
        id: String::new(),
        seq: 0,
        at: Utc::now(),
        correlation_id: ctx.correlation_id.clone(),
        source: ctx.source,
        body: value,
    })
}
