use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

mod common;

#[tokio::test]
async fn posts_feed_likes_saves_and_comments() -> anyhow::Result<()> {
    let Some(test_db) = common::test_database_url("posts_feed_likes_saves_and_comments") else {
        return Ok(());
    };
    let (pool, _guard) = common::create_test_db_and_pool(&test_db).await?;
    let media_root = std::env::temp_dir().join(format!("instaworld-posts-{}", uuid::Uuid::new_v4()));
    let (plugins, _codes) = common::full_plugin_set(&pool, &media_root);
    let (base, server_handle) = common::spawn_app_with_plugins(plugins).await?;
    let client = reqwest::Client::new();

    let (alice, alice_token) = common::create_active_user(&pool, "alice").await?;
    let (bob, bob_token) = common::create_active_user(&pool, "bob").await?;
    let (_carol, carol_token) = common::create_active_user(&pool, "carol").await?;

    let res = client
        .post(format!("{}/social/follow", base))
        .bearer_auth(&bob_token)
        .json(&json!({ "user_id": alice }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let form = Form::new()
        .text("description", "  first light  ")
        .part("images", Part::bytes(b"jpeg-one".to_vec()).file_name("one.jpg"))
        .part("images", Part::bytes(b"jpeg-two".to_vec()).file_name("two.jpg"))
        .part("videos", Part::bytes(b"mp4-bytes".to_vec()).file_name("clip.mp4"));
    let res = client.post(format!("{}/posts", base)).bearer_auth(&alice_token).multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let post: Value = res.json().await?;
    let post_id = post["id"].as_str().expect("id").to_string();
    assert_eq!(post["description"], "first light");
    assert_eq!(post["user"]["username"], "alice");
    assert_eq!(post["images"].as_array().unwrap().len(), 2);
    assert_eq!(post["videos"].as_array().unwrap().len(), 1);
    let image_url = post["images"][0]["url"].as_str().expect("url").to_string();
    assert!(image_url.ends_with(".jpg"));

    let res = client.get(format!("{}{}", base, image_url)).send().await?;
    assert_eq!(res.bytes().await?.as_ref(), b"jpeg-one");

    let empty = Form::new().text("description", "   ");
    let res = client.post(format!("{}/posts", base)).bearer_auth(&alice_token).multipart(empty).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // bob follows alice, carol does not
    let feed: Value = client.get(format!("{}/posts/feed", base)).bearer_auth(&bob_token).send().await?.json().await?;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["id"], post_id.as_str());
    let feed: Value = client.get(format!("{}/posts/feed", base)).bearer_auth(&carol_token).send().await?.json().await?;
    assert!(feed.as_array().unwrap().is_empty());

    let explore: Value = client.get(format!("{}/posts/explore", base)).bearer_auth(&carol_token).send().await?.json().await?;
    assert_eq!(explore[0]["id"], post_id.as_str());
    assert_eq!(explore[0]["images"].as_array().unwrap().len(), 2);
    let explore: Value = client.get(format!("{}/posts/explore", base)).bearer_auth(&bob_token).send().await?.json().await?;
    assert!(explore.as_array().unwrap().is_empty());

    let liked: Value = client
        .post(format!("{}/posts/{}/like", base, post_id))
        .bearer_auth(&bob_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["likes_count"], 1);

    let saved: Value = client
        .post(format!("{}/posts/{}/save", base, post_id))
        .bearer_auth(&bob_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(saved["saved"], true);

    let res = client
        .post(format!("{}/posts/{}/comments", base, post_id))
        .bearer_auth(&bob_token)
        .json(&json!({ "comment": "gorgeous" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let comment: Value = res.json().await?;
    assert_eq!(comment["username"], "bob");

    let res = client
        .post(format!("{}/posts/{}/comments", base, post_id))
        .bearer_auth(&bob_token)
        .json(&json!({ "comment": "  " }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let comments: Value = client
        .get(format!("{}/posts/{}/comments", base, post_id))
        .bearer_auth(&carol_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(comments.as_array().unwrap().len(), 1);

    let seen: Value = client.get(format!("{}/posts/{}", base, post_id)).bearer_auth(&bob_token).send().await?.json().await?;
    assert_eq!(seen["likes_count"], 1);
    assert_eq!(seen["comment_count"], 1);
    assert_eq!(seen["has_liked"], true);
    assert_eq!(seen["has_saved"], true);
    let seen: Value = client.get(format!("{}/posts/{}", base, post_id)).bearer_auth(&carol_token).send().await?.json().await?;
    assert_eq!(seen["has_liked"], false);

    let liked_list: Value = client
        .get(format!("{}/posts/liked?user_id={}", base, bob))
        .bearer_auth(&carol_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(liked_list.as_array().unwrap().len(), 1);
    let saved_list: Value = client.get(format!("{}/posts/saved", base)).bearer_auth(&bob_token).send().await?.json().await?;
    assert_eq!(saved_list.as_array().unwrap().len(), 1);
    let res = client
        .get(format!("{}/posts/saved?user_id={}", base, bob))
        .bearer_auth(&carol_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let by_alice: Value = client
        .get(format!("{}/posts/user/{}", base, alice))
        .bearer_auth(&bob_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(by_alice.as_array().unwrap().len(), 1);

    // unlike
    let liked: Value = client
        .post(format!("{}/posts/{}/like", base, post_id))
        .bearer_auth(&bob_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(liked["liked"], false);
    assert_eq!(liked["likes_count"], 0);

    let res = client
        .put(format!("{}/posts/{}", base, post_id))
        .bearer_auth(&bob_token)
        .json(&json!({ "description": "mine now" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let updated: Value = client
        .put(format!("{}/posts/{}", base, post_id))
        .bearer_auth(&alice_token)
        .json(&json!({ "description": "golden hour" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(updated["description"], "golden hour");

    let res = client.delete(format!("{}/posts/{}", base, post_id)).bearer_auth(&bob_token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = client.delete(format!("{}/posts/{}", base, post_id)).bearer_auth(&alice_token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client.get(format!("{}/posts/{}", base, post_id)).bearer_auth(&alice_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client.post(format!("{}/posts/{}/like", base, post_id)).bearer_auth(&bob_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // deleting the post drops its files
    let res = client.get(format!("{}{}", base, image_url)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server_handle.abort();
    let _ = tokio::fs::remove_dir_all(&media_root).await;
    Ok(())
}

#[tokio::test]
async fn profile_picture_and_birthday_show_up_on_stories() -> anyhow::Result<()> {
    let Some(test_db) = common::test_database_url("profile_picture_and_birthday_show_up_on_stories") else {
        return Ok(());
    };
    let (pool, _guard) = common::create_test_db_and_pool(&test_db).await?;
    let media_root = std::env::temp_dir().join(format!("instaworld-profile-{}", uuid::Uuid::new_v4()));
    let (plugins, _codes) = common::full_plugin_set(&pool, &media_root);
    let (base, server_handle) = common::spawn_app_with_plugins(plugins).await?;
    let client = reqwest::Client::new();

    let (_gina, token) = common::create_active_user(&pool, "gina").await?;

    let form = Form::new().part("image", Part::bytes(b"avatar".to_vec()).file_name("me.png"));
    let res = client.put(format!("{}/users/me/image", base)).bearer_auth(&token).multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let profile: Value = res.json().await?;
    let image = profile["image"].as_str().expect("image").to_string();

    let form = Form::new()
        .part("image", Part::bytes(b"a".to_vec()).file_name("a.png"))
        .part("image", Part::bytes(b"b".to_vec()).file_name("b.png"));
    let res = client.put(format!("{}/users/me/image", base)).bearer_auth(&token).multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "duplicate_media");

    let res = client
        .put(format!("{}/users/me", base))
        .bearer_auth(&token)
        .json(&json!({ "date_of_birth": "2999-01-01" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let profile: Value = client
        .put(format!("{}/users/me", base))
        .bearer_auth(&token)
        .json(&json!({ "date_of_birth": "1990-05-17" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(profile["date_of_birth"], "1990-05-17");

    let form = Form::new().part("media", Part::bytes(b"story".to_vec()).file_name("s.jpg"));
    let story: Value = client
        .post(format!("{}/stories", base))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(story["profile_pic"], image.as_str());

    let feed: Value = client.get(format!("{}/stories", base)).bearer_auth(&token).send().await?.json().await?;
    assert_eq!(feed[0]["profile_pic"], image.as_str());

    server_handle.abort();
    let _ = tokio::fs::remove_dir_all(&media_root).await;
    Ok(())
}
