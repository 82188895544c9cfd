use axum::body::Bytes;
use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::plugins::posts::handlers::{validate_comment, validate_description, validate_new_post, Upload, MAX_MEDIA_PER_POST};
use crate::plugins::posts::models::{MediaKind, PostMediaRow, PostRow};
use crate::plugins::posts::repo::{attach, list_sql, Page, PostFilter, MAX_PAGE};

fn row(id: Uuid) -> PostRow {
    PostRow {
        id,
        owner_id: Uuid::new_v4(),
        username: "ada".into(),
        profile_pic: None,
        description: "sunset".into(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        likes_count: 2,
        comment_count: 0,
        has_liked: true,
        has_saved: false,
    }
}

fn media(post_id: Uuid, kind: MediaKind, url: &str) -> PostMediaRow {
    PostMediaRow { id: Uuid::new_v4(), post_id, kind: kind.as_str().into(), media: url.into() }
}

fn upload(kind: MediaKind, bytes: &'static [u8]) -> Upload {
    Upload { kind, file_name: Some("clip".into()), bytes: Bytes::from_static(bytes) }
}

#[test]
fn media_fields_map_to_kinds() {
    assert_eq!(MediaKind::from_field("images"), Some(MediaKind::Image));
    assert_eq!(MediaKind::from_field("video"), Some(MediaKind::Video));
    assert_eq!(MediaKind::from_field("description"), None);
}

#[test]
fn attach_splits_media_by_post_and_kind() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let rows = vec![row(a), row(b)];
    let media = vec![
        media(b, MediaKind::Video, "/media/files/b.mp4"),
        media(a, MediaKind::Image, "/media/files/a1.jpg"),
        media(a, MediaKind::Image, "/media/files/a2.jpg"),
    ];

    let posts = attach(rows, media);

    assert_eq!(posts[0].id, a);
    let urls: Vec<&str> = posts[0].images.iter().map(|m| m.url.as_str()).collect();
    assert_eq!(urls, ["/media/files/a1.jpg", "/media/files/a2.jpg"]);
    assert!(posts[0].videos.is_empty());
    assert_eq!(posts[1].videos.len(), 1);
    assert!(posts[1].images.is_empty());
    assert_eq!(posts[0].user.username, "ada");
}

#[test]
fn list_sql_numbers_paging_after_the_filter_argument() {
    let (sql, subject) = list_sql(PostFilter::Everyone);
    assert!(subject.is_none());
    assert!(sql.ends_with("LIMIT $2 OFFSET $3"));

    let user = Uuid::new_v4();
    let (sql, subject) = list_sql(PostFilter::LikedBy(user));
    assert_eq!(subject, Some(user));
    assert!(sql.contains("post_likes l WHERE l.post_id = p.id AND l.user_id = $2"));
    assert!(sql.ends_with("LIMIT $3 OFFSET $4"));

    let (sql, subject) = list_sql(PostFilter::Followees);
    assert!(subject.is_none());
    assert!(sql.contains("follower_id = $1"));
}

#[test]
fn page_is_clamped() {
    assert_eq!(Page::new(None, None), Page { limit: 30, offset: 0 });
    assert_eq!(Page::new(Some(10_000), Some(-5)), Page { limit: MAX_PAGE, offset: 0 });
    assert_eq!(Page::new(Some(0), Some(20)).limit, 1);
}

#[test]
fn posts_need_a_caption_or_media() {
    assert!(validate_new_post("", &[]).is_err());
    assert!(validate_new_post("just words", &[]).is_ok());
    assert!(validate_new_post("", &[upload(MediaKind::Image, b"jpg")]).is_ok());

    let err = validate_new_post("", &[upload(MediaKind::Video, b"")]).unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.code.as_deref(), Some("invalid_media"));

    let many: Vec<Upload> = (0..=MAX_MEDIA_PER_POST).map(|_| upload(MediaKind::Image, b"jpg")).collect();
    assert!(validate_new_post("", &many).is_err());
}

#[test]
fn description_and_comment_limits() {
    assert_eq!(validate_description("  hello  ").unwrap(), "hello");
    assert!(validate_description(&"x".repeat(2201)).is_err());

    assert_eq!(validate_comment(" nice ").unwrap(), "nice");
    assert!(validate_comment("   ").is_err());
    assert!(validate_comment(&"x".repeat(1001)).is_err());
}
