// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stories and galleries under moderation.
//!
//! Both content types share one set of workflow operations, generic over
//! [`ModeratedContent`]. Only creation and draft edits are type specific.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{load, matches_search};
use crate::{
    audit_log,
    auth::{roles::MODERATOR_ROLES, AuthenticatedUser},
    domain::{
        clean_tags, new_id, Comment, Feature, Gallery, GalleryImage, GalleryView, HealthTopic,
        Moderated, ModerationStatus, Story, StoryView, Viewer,
    },
    error::{ServiceError, ServiceResult},
    models::{validate_page, PageParams, Paginated},
    state::AppState,
    storage::{AuditEventType, Document, OwnedResource, OwnershipEnforcer},
    validation::{Validate, Validator},
};

/// Content that goes through the moderation workflow.
pub trait ModeratedContent: Moderated + Document + OwnedResource + Clone {
    type View: Serialize;

    /// Toggle that must be on for new submissions.
    const FEATURE: Feature;
    /// Resource type recorded in audit events.
    const KIND: &'static str;

    fn render(&self, viewer: Viewer<'_>) -> Self::View;
    fn created_at(&self) -> DateTime<Utc>;
    fn matches(&self, query: &ContentListQuery) -> bool;

    /// Count a public read.
    fn record_view(&mut self) {}
}

impl ModeratedContent for Story {
    type View = StoryView;
    const FEATURE: Feature = Feature::StorySubmissions;
    const KIND: &'static str = "story";

    fn render(&self, viewer: Viewer<'_>) -> StoryView {
        self.view(viewer)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn matches(&self, query: &ContentListQuery) -> bool {
        let tag = query.tag.as_deref().map(|t| t.trim().to_lowercase());
        query.category.is_none_or(|c| self.category == c)
            && tag.is_none_or(|t| self.tags.contains(&t))
            && matches_search(query.search.as_deref(), &[&self.title, &self.content])
    }

    fn record_view(&mut self) {
        self.view_count = self.view_count.saturating_add(1);
    }
}

impl ModeratedContent for Gallery {
    type View = GalleryView;
    const FEATURE: Feature = Feature::GalleryUploads;
    const KIND: &'static str = "gallery";

    fn render(&self, viewer: Viewer<'_>) -> GalleryView {
        self.view(viewer)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn matches(&self, query: &ContentListQuery) -> bool {
        let description = self.description.as_deref().unwrap_or_default();
        matches_search(query.search.as_deref(), &[&self.title, description])
    }
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStoryRequest {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category: HealthTopic,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub featured_image: Option<String>,
}

impl Validate for CreateStoryRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("title", &self.title, 3, 200);
        v.length("content", &self.content, 20, 20_000);
        v.optional_length("excerpt", self.excerpt.as_deref(), 1, 500);
        v.check(self.tags.len() <= 20, "tags", "at most 20 tags");
        v.optional_url("featured_image", self.featured_image.as_deref());
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<HealthTopic>,
    pub tags: Option<Vec<String>>,
    pub is_anonymous: Option<bool>,
    pub featured_image: Option<String>,
}

impl Validate for UpdateStoryRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 3, 200);
        v.optional_length("content", self.content.as_deref(), 20, 20_000);
        v.optional_length("excerpt", self.excerpt.as_deref(), 1, 500);
        if let Some(tags) = &self.tags {
            v.check(tags.len() <= 20, "tags", "at most 20 tags");
        }
        v.optional_url("featured_image", self.featured_image.as_deref());
    }
}

fn validate_images(v: &mut Validator, images: &[GalleryImage]) {
    v.check(
        (1..=50).contains(&images.len()),
        "images",
        "a gallery needs between 1 and 50 images",
    );
    for image in images {
        v.url("images", &image.url);
        v.optional_length("images.caption", image.caption.as_deref(), 1, 300);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGalleryRequest {
    pub title: String,
    pub description: Option<String>,
    pub images: Vec<GalleryImage>,
    pub related_event: Option<String>,
}

impl Validate for CreateGalleryRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("title", &self.title, 3, 200);
        v.optional_length("description", self.description.as_deref(), 1, 2000);
        validate_images(v, &self.images);
        if let Some(event) = &self.related_event {
            v.uuid("related_event", event);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateGalleryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<GalleryImage>>,
    pub related_event: Option<String>,
}

impl Validate for UpdateGalleryRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("title", self.title.as_deref(), 3, 200);
        v.optional_length("description", self.description.as_deref(), 1, 2000);
        if let Some(images) = &self.images {
            validate_images(v, images);
        }
        if let Some(event) = &self.related_event {
            v.uuid("related_event", event);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub notes: Option<String>,
}

impl Validate for ReviewRequest {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("notes", self.notes.as_deref(), 1, 1000);
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub text: String,
}

impl Validate for CommentRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("text", &self.text, 1, 1000);
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ContentListQuery {
    /// Stories only.
    pub category: Option<HealthTopic>,
    /// Stories only.
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Validate for ContentListQuery {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("tag", self.tag.as_deref(), 1, 50);
        v.optional_length("search", self.search.as_deref(), 1, 100);
        validate_page(v, self.page, self.limit);
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LikeResult {
    pub liked: bool,
    pub like_count: usize,
}

/// A comment awaiting approval, with the content it belongs to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingComment {
    pub content_type: String,
    pub content_id: String,
    pub comment: Comment,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModerationQueue {
    pub stories: Vec<StoryView>,
    pub galleries: Vec<GalleryView>,
    pub pending_comments: Vec<PendingComment>,
}

// =============================================================================
// Shared workflow
// =============================================================================

fn is_moderator(user: &AuthenticatedUser) -> bool {
    user.has_any_role(MODERATOR_ROLES)
}

fn viewer_for<'a, T: ModeratedContent>(item: &T, user: Option<&'a AuthenticatedUser>) -> Viewer<'a> {
    Viewer {
        user_id: user.map(|u| u.user_id.as_str()),
        privileged: user.is_some_and(|u| item.is_owned_by(&u.user_id) || is_moderator(u)),
    }
}

/// Unpublished content exists only for its owner and moderators.
fn load_visible<T: ModeratedContent>(
    state: &AppState,
    id: &str,
    user: Option<&AuthenticatedUser>,
) -> ServiceResult<T> {
    let item: T = load(state.storage(), id)?;
    if item.status() == ModerationStatus::Published || viewer_for(&item, user).privileged {
        Ok(item)
    } else {
        Err(ServiceError::not_found(format!("{} not found", T::LABEL)))
    }
}

async fn insert<T: ModeratedContent>(state: &AppState, owner: &AuthenticatedUser, item: T) -> ServiceResult<T::View> {
    state.settings().await.ensure_enabled(T::FEATURE)?;
    let _gate = state.exclusive().await;
    state.storage().collection::<T>().insert(&item)?;
    tracing::info!(kind = T::KIND, id = item.id(), owner = %owner.user_id, "Content drafted");
    Ok(item.render(viewer_for(&item, Some(owner))))
}

pub async fn get<T: ModeratedContent>(
    state: &AppState,
    id: &str,
    user: Option<&AuthenticatedUser>,
) -> ServiceResult<T::View> {
    let _gate = state.exclusive().await;
    let mut item: T = load_visible(state, id, user)?;
    if item.status() == ModerationStatus::Published {
        item.record_view();
        state.storage().collection::<T>().save(&item)?;
    }
    Ok(item.render(viewer_for(&item, user)))
}

/// Published content, newest first.
pub async fn list_published<T: ModeratedContent>(
    state: &AppState,
    query: ContentListQuery,
    user: Option<&AuthenticatedUser>,
) -> ServiceResult<Paginated<T::View>> {
    let mut items = state
        .storage()
        .collection::<T>()
        .find(|i| i.status() == ModerationStatus::Published && i.matches(&query))?;
    items.sort_by_key(|i| std::cmp::Reverse(i.created_at()));

    let params = PageParams::resolve(query.page, query.limit, state.config());
    Ok(Paginated::from_vec(items, params).map(|i| {
        let viewer = viewer_for(&i, user);
        i.render(viewer)
    }))
}

/// The principal's own content in every state.
pub async fn mine<T: ModeratedContent>(state: &AppState, user: &AuthenticatedUser) -> ServiceResult<Vec<T::View>> {
    let mut items = state
        .storage()
        .collection::<T>()
        .find(|i| i.is_owned_by(&user.user_id))?;
    items.sort_by_key(|i| std::cmp::Reverse(i.created_at()));
    Ok(items.iter().map(|i| i.render(viewer_for(i, Some(user)))).collect())
}

/// Content waiting for review, oldest first.
pub async fn pending<T: ModeratedContent>(state: &AppState, moderator: &AuthenticatedUser) -> ServiceResult<Vec<T::View>> {
    let mut items = state
        .storage()
        .collection::<T>()
        .find(|i| i.status() == ModerationStatus::PendingReview)?;
    items.sort_by_key(|i| i.created_at());
    Ok(items.iter().map(|i| i.render(viewer_for(i, Some(moderator)))).collect())
}

fn pending_comments<T: ModeratedContent>(state: &AppState) -> ServiceResult<Vec<PendingComment>> {
    let items = state
        .storage()
        .collection::<T>()
        .find(|i| i.comments().iter().any(|c| !c.is_approved))?;
    Ok(items
        .iter()
        .flat_map(|i| {
            i.pending_comments().into_iter().map(move |comment| PendingComment {
                content_type: T::KIND.to_string(),
                content_id: i.id().to_string(),
                comment,
            })
        })
        .collect())
}

pub async fn queue(state: &AppState, moderator: &AuthenticatedUser) -> ServiceResult<ModerationQueue> {
    let mut comments = pending_comments::<Story>(state)?;
    comments.extend(pending_comments::<Gallery>(state)?);
    comments.sort_by_key(|c| c.comment.created_at);

    Ok(ModerationQueue {
        stories: pending::<Story>(state, moderator).await?,
        galleries: pending::<Gallery>(state, moderator).await?,
        pending_comments: comments,
    })
}

/// Load under the gate, apply `f`, then save.
async fn mutate<T, R>(
    state: &AppState,
    id: &str,
    actor: &AuthenticatedUser,
    f: impl FnOnce(&mut T) -> ServiceResult<R>,
) -> ServiceResult<(T, R)>
where
    T: ModeratedContent,
{
    let _gate = state.exclusive().await;
    let mut item: T = load_visible(state, id, Some(actor))?;
    let result = f(&mut item)?;
    state.storage().collection::<T>().save(&item)?;
    Ok((item, result))
}

pub async fn submit<T: ModeratedContent>(
    state: &AppState,
    owner: &AuthenticatedUser,
    id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<T::View> {
    state.settings().await.ensure_enabled(T::FEATURE)?;
    let (item, ()) = mutate::<T, _>(state, id, owner, |item| {
        item.verify_ownership(owner)?;
        item.submit(now)
    })
    .await?;
    Ok(item.render(viewer_for(&item, Some(owner))))
}

pub async fn approve<T: ModeratedContent>(
    state: &AppState,
    moderator: &AuthenticatedUser,
    id: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> ServiceResult<T::View> {
    let (item, ()) = mutate::<T, _>(state, id, moderator, |item| item.approve(&moderator.user_id, notes, now)).await?;
    audit_log!(state.storage(), AuditEventType::ContentApproved, moderator, T::KIND, id);
    Ok(item.render(viewer_for(&item, Some(moderator))))
}

pub async fn reject<T: ModeratedContent>(
    state: &AppState,
    moderator: &AuthenticatedUser,
    id: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> ServiceResult<T::View> {
    let (item, ()) = mutate::<T, _>(state, id, moderator, |item| item.reject(&moderator.user_id, notes, now)).await?;
    audit_log!(state.storage(), AuditEventType::ContentRejected, moderator, T::KIND, id);
    Ok(item.render(viewer_for(&item, Some(moderator))))
}

/// Owner or moderator.
pub async fn archive<T: ModeratedContent>(
    state: &AppState,
    actor: &AuthenticatedUser,
    id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<T::View> {
    let (item, ()) = mutate::<T, _>(state, id, actor, |item| {
        if !is_moderator(actor) {
            item.verify_ownership(actor)?;
        }
        item.archive(now)
    })
    .await?;
    audit_log!(state.storage(), AuditEventType::ContentArchived, actor, T::KIND, id);
    Ok(item.render(viewer_for(&item, Some(actor))))
}

pub async fn toggle_like<T: ModeratedContent>(
    state: &AppState,
    user: &AuthenticatedUser,
    id: &str,
) -> ServiceResult<LikeResult> {
    let (item, liked) = mutate::<T, _>(state, id, user, |item| item.toggle_like(&user.user_id)).await?;
    Ok(LikeResult {
        liked,
        like_count: item.likes().len(),
    })
}

pub async fn add_comment<T: ModeratedContent>(
    state: &AppState,
    user: &AuthenticatedUser,
    id: &str,
    text: String,
    now: DateTime<Utc>,
) -> ServiceResult<Comment> {
    let (_, comment) = mutate::<T, _>(state, id, user, |item| {
        item.add_comment(&user.user_id, text.trim().to_string(), now)
    })
    .await?;
    Ok(comment)
}

pub async fn approve_comment<T: ModeratedContent>(
    state: &AppState,
    moderator: &AuthenticatedUser,
    id: &str,
    comment_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<T::View> {
    let (item, ()) = mutate::<T, _>(state, id, moderator, |item| item.approve_comment(comment_id, now)).await?;
    audit_log!(state.storage(), AuditEventType::CommentApproved, moderator, T::KIND, id);
    Ok(item.render(viewer_for(&item, Some(moderator))))
}

/// Comment author or content owner.
pub async fn delete_comment<T: ModeratedContent>(
    state: &AppState,
    actor: &AuthenticatedUser,
    id: &str,
    comment_id: &str,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    mutate::<T, _>(state, id, actor, |item| {
        let owns = item.is_owned_by(&actor.user_id);
        item.remove_comment(comment_id, &actor.user_id, owns, now)
    })
    .await?;
    Ok(())
}

// =============================================================================
// Stories
// =============================================================================

pub async fn create_story(
    state: &AppState,
    author: &AuthenticatedUser,
    req: CreateStoryRequest,
    now: DateTime<Utc>,
) -> ServiceResult<StoryView> {
    let story = Story {
        id: new_id(),
        title: req.title.trim().to_string(),
        content: req.content.trim().to_string(),
        excerpt: req.excerpt,
        author_id: author.user_id.clone(),
        category: req.category,
        tags: clean_tags(req.tags),
        is_anonymous: req.is_anonymous,
        featured_image: req.featured_image,
        status: ModerationStatus::Draft,
        likes: Default::default(),
        comments: Vec::new(),
        review: None,
        published_at: None,
        view_count: 0,
        created_at: now,
        updated_at: now,
    };
    insert(state, author, story).await
}

pub async fn update_story(
    state: &AppState,
    author: &AuthenticatedUser,
    id: &str,
    req: UpdateStoryRequest,
    now: DateTime<Utc>,
) -> ServiceResult<StoryView> {
    let (story, ()) = mutate::<Story, _>(state, id, author, |story| {
        story.verify_ownership(author)?;
        story.ensure_editable()?;
        if let Some(title) = req.title {
            story.title = title.trim().to_string();
        }
        if let Some(content) = req.content {
            story.content = content.trim().to_string();
        }
        if req.excerpt.is_some() {
            story.excerpt = req.excerpt;
        }
        super::assign(&mut story.category, req.category);
        if let Some(tags) = req.tags {
            story.tags = clean_tags(tags);
        }
        super::assign(&mut story.is_anonymous, req.is_anonymous);
        if req.featured_image.is_some() {
            story.featured_image = req.featured_image;
        }
        story.updated_at = now;
        Ok(())
    })
    .await?;
    Ok(story.render(viewer_for(&story, Some(author))))
}

// =============================================================================
// Galleries
// =============================================================================

pub async fn create_gallery(
    state: &AppState,
    owner: &AuthenticatedUser,
    req: CreateGalleryRequest,
    now: DateTime<Utc>,
) -> ServiceResult<GalleryView> {
    let gallery = Gallery {
        id: new_id(),
        title: req.title.trim().to_string(),
        description: req.description,
        images: req.images,
        related_event: req.related_event,
        uploaded_by: owner.user_id.clone(),
        status: ModerationStatus::Draft,
        likes: Default::default(),
        comments: Vec::new(),
        review: None,
        created_at: now,
        updated_at: now,
    };
    insert(state, owner, gallery).await
}

pub async fn update_gallery(
    state: &AppState,
    owner: &AuthenticatedUser,
    id: &str,
    req: UpdateGalleryRequest,
    now: DateTime<Utc>,
) -> ServiceResult<GalleryView> {
    let (gallery, ()) = mutate::<Gallery, _>(state, id, owner, |gallery| {
        gallery.verify_ownership(owner)?;
        gallery.ensure_editable()?;
        if let Some(title) = req.title {
            gallery.title = title.trim().to_string();
        }
        if req.description.is_some() {
            gallery.description = req.description;
        }
        super::assign(&mut gallery.images, req.images);
        if req.related_event.is_some() {
            gallery.related_event = req.related_event;
        }
        gallery.updated_at = now;
        Ok(())
    })
    .await?;
    Ok(gallery.render(viewer_for(&gallery, Some(owner))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::test_support::principal;
    use crate::state::tests::test_state;

    fn story_req(is_anonymous: bool) -> CreateStoryRequest {
        CreateStoryRequest {
            title: "How I learned to say no".into(),
            content: "A story about boundaries, burnout and asking for help.".into(),
            excerpt: None,
            category: HealthTopic::MentalHealth,
            tags: vec!["Burnout".into()],
            is_anonymous,
            featured_image: None,
        }
    }

    #[tokio::test]
    async fn story_goes_from_draft_to_published() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let author = principal(&state, "author", &[Role::Member]);
        let moderator = principal(&state, "mod", &[Role::Moderator]);
        let reader = principal(&state, "reader", &[Role::Member]);

        let draft = create_story(&state, &author, story_req(true), now).await.unwrap();
        assert!(matches!(
            get::<Story>(&state, &draft.id, Some(&reader)).await,
            Err(ServiceError::NotFound(_))
        ));

        submit::<Story>(&state, &author, &draft.id, now).await.unwrap();
        let queue = queue(&state, &moderator).await.unwrap();
        assert_eq!(queue.stories.len(), 1);

        let published = approve::<Story>(&state, &moderator, &draft.id, Some("Lovely".into()), now)
            .await
            .unwrap();
        assert_eq!(published.status, ModerationStatus::Published);
        assert_eq!(published.published_at, Some(now));

        let public = get::<Story>(&state, &draft.id, Some(&reader)).await.unwrap();
        assert!(public.author_id.is_none());
        assert!(public.review.is_none());
        assert_eq!(public.view_count, 1);

        let page = list_published::<Story>(&state, ContentListQuery::default(), None).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn only_owner_submits_and_edits_drafts() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let author = principal(&state, "author", &[Role::Member]);
        let moderator = principal(&state, "mod", &[Role::Moderator]);

        let draft = create_story(&state, &author, story_req(false), now).await.unwrap();
        assert!(matches!(
            submit::<Story>(&state, &moderator, &draft.id, now).await,
            Err(ServiceError::Forbidden(_))
        ));

        let edit = UpdateStoryRequest { title: Some("A new title".into()), ..Default::default() };
        let updated = update_story(&state, &author, &draft.id, edit.clone(), now).await.unwrap();
        assert_eq!(updated.title, "A new title");

        submit::<Story>(&state, &author, &draft.id, now).await.unwrap();
        assert!(matches!(
            update_story(&state, &author, &draft.id, edit, now).await,
            Err(ServiceError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn likes_and_comments_on_published_gallery() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let owner = principal(&state, "owner", &[Role::Member]);
        let moderator = principal(&state, "mod", &[Role::Moderator]);
        let fan = principal(&state, "fan", &[Role::Member]);
        let other = principal(&state, "other", &[Role::Member]);

        let gallery = create_gallery(
            &state,
            &owner,
            CreateGalleryRequest {
                title: "Health fair 2026".into(),
                description: None,
                images: vec![GalleryImage { url: "/uploads/fair.jpg".into(), caption: None }],
                related_event: None,
            },
            now,
        )
        .await
        .unwrap();
        submit::<Gallery>(&state, &owner, &gallery.id, now).await.unwrap();
        approve::<Gallery>(&state, &moderator, &gallery.id, None, now).await.unwrap();

        assert!(toggle_like::<Gallery>(&state, &fan, &gallery.id).await.unwrap().liked);
        let unliked = toggle_like::<Gallery>(&state, &fan, &gallery.id).await.unwrap();
        assert!(!unliked.liked);
        assert_eq!(unliked.like_count, 0);

        let comment = add_comment::<Gallery>(&state, &fan, &gallery.id, "Great photos".into(), now)
            .await
            .unwrap();
        let public = get::<Gallery>(&state, &gallery.id, Some(&other)).await.unwrap();
        assert!(public.comments.is_empty());
        assert_eq!(queue(&state, &moderator).await.unwrap().pending_comments.len(), 1);

        approve_comment::<Gallery>(&state, &moderator, &gallery.id, &comment.id, now)
            .await
            .unwrap();
        let public = get::<Gallery>(&state, &gallery.id, Some(&other)).await.unwrap();
        assert_eq!(public.comments.len(), 1);

        assert!(matches!(
            delete_comment::<Gallery>(&state, &other, &gallery.id, &comment.id, now).await,
            Err(ServiceError::Forbidden(_))
        ));
        delete_comment::<Gallery>(&state, &owner, &gallery.id, &comment.id, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn archive_is_absorbing_and_owner_or_moderator_only() {
        let (state, _temp) = test_state();
        let now = Utc::now();
        let author = principal(&state, "author", &[Role::Member]);
        let stranger = principal(&state, "stranger", &[Role::Member]);
        let moderator = principal(&state, "mod", &[Role::Moderator]);

        let draft = create_story(&state, &author, story_req(false), now).await.unwrap();
        submit::<Story>(&state, &author, &draft.id, now).await.unwrap();
        assert!(archive::<Story>(&state, &stranger, &draft.id, now).await.is_err());

        let archived = archive::<Story>(&state, &moderator, &draft.id, now).await.unwrap();
        assert_eq!(archived.status, ModerationStatus::Archived);
        assert!(approve::<Story>(&state, &moderator, &draft.id, None, now).await.is_err());
    }

    #[tokio::test]
    async fn disabled_submissions_block_new_stories() {
        let (state, _temp) = test_state();
        let author = principal(&state, "author", &[Role::Member]);
        let mut settings = state.settings().await;
        settings.features.story_submissions = false;
        state.replace_settings(settings).await.unwrap();

        assert!(matches!(
            create_story(&state, &author, story_req(false), Utc::now()).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
