mod common;

use anyhow::Result;
use common::{send, TestServer};
use devconnect_api::types::ObjectId;
use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_post(server: &TestServer, token: &str, text: &str) -> Result<Value> {
    let (status, post) = send(server.post("/api/post", token).json(&json!({ "text": text }))).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(post)
}

fn post_id(post: &Value) -> String {
    post["_id"].as_str().expect("post id").to_string()
}

#[tokio::test]
async fn create_post_snapshots_author() -> Result<()> {
    let server = TestServer::start().await?;
    let (user, token) = server.seed_user("Ada").await?;

    let post = create_post(&server, &token, "Hello").await?;

    assert_eq!(post["text"], "Hello");
    assert_eq!(post["user"], user.id.to_hex());
    assert_eq!(post["name"], "Ada");
    assert_eq!(post["likes"], json!([]));
    assert_eq!(post["comments"], json!([]));
    Ok(())
}

#[tokio::test]
async fn empty_text_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_user("Ada").await?;

    let (status, body) = send(server.post("/api/post", &token).json(&json!({ "text": "   " }))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "text");
    Ok(())
}

#[tokio::test]
async fn posts_are_listed_newest_first() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_user("Ada").await?;
    create_post(&server, &token, "first").await?;
    create_post(&server, &token, "second").await?;

    let (status, posts) = send(server.get("/api/post", &token)).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(posts[0]["text"], "second");
    assert_eq!(posts[1]["text"], "first");
    Ok(())
}

#[tokio::test]
async fn like_twice_is_rejected_and_unlike_restores() -> Result<()> {
    let server = TestServer::start().await?;
    let (user, token) = server.seed_user("Ada").await?;
    let id = post_id(&create_post(&server, &token, "Hello").await?);

    let (status, likes) = send(server.put(&format!("/api/post/like/{}", id), &token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(likes, json!([{ "user": user.id.to_hex() }]));

    let (status, body) = send(server.put(&format!("/api/post/like/{}", id), &token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Post already liked");

    let (status, likes) = send(server.put(&format!("/api/post/unlike/{}", id), &token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(likes, json!([]));

    let (status, body) = send(server.put(&format!("/api/post/unlike/{}", id), &token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Post has not yet been liked");
    Ok(())
}

#[tokio::test]
async fn concurrent_likes_by_one_user_succeed_once() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_user("Ada").await?;
    let id = post_id(&create_post(&server, &token, "race").await?);
    let path = format!("/api/post/like/{}", id);

    let responses = join_all((0..16).map(|_| server.put(&path, &token).send())).await;
    let successes = responses
        .into_iter()
        .filter(|r| matches!(r, Ok(resp) if resp.status() == StatusCode::OK))
        .count();
    assert_eq!(successes, 1);

    let (_, post) = send(server.get(&format!("/api/post/{}", id), &token)).await?;
    assert_eq!(post["likes"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn malformed_or_unknown_post_id_is_not_found() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_user("Ada").await?;

    let (status, body) = send(server.put("/api/post/like/not-an-id", &token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");

    let (status, body) = send(server.get(&format!("/api/post/{}", ObjectId::new()), &token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
    Ok(())
}

#[tokio::test]
async fn only_the_author_deletes_a_post() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, ada) = server.seed_user("Ada").await?;
    let (_, eve) = server.seed_user("Eve").await?;
    let id = post_id(&create_post(&server, &ada, "mine").await?);
    let path = format!("/api/post/{}", id);

    let (status, body) = send(server.delete(&path, &eve)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not authorized");

    let (status, body) = send(server.delete(&path, &ada)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post removed");

    let (status, _) = send(server.get(&path, &ada)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn comments_are_prepended_and_owner_gated() -> Result<()> {
    let server = TestServer::start().await?;
    let (ada_user, ada) = server.seed_user("Ada").await?;
    let (_, eve) = server.seed_user("Eve").await?;
    let id = post_id(&create_post(&server, &ada, "discuss").await?);
    let comment_path = format!("/api/post/comment/{}", id);

    send(server.post(&comment_path, &eve).json(&json!({ "text": "first" }))).await?;
    let (status, comments) = send(server.post(&comment_path, &ada).json(&json!({ "text": "second" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments[0]["text"], "second");
    assert_eq!(comments[0]["name"], "Ada");
    assert_eq!(comments[0]["user"], ada_user.id.to_hex());
    assert_eq!(comments[1]["name"], "Eve");

    let ada_comment = comments[0]["_id"].as_str().expect("comment id").to_string();
    let remove_path = format!("{}/{}", comment_path, ada_comment);

    let (status, body) = send(server.delete(&remove_path, &eve)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not authorized");

    let (status, comments) = send(server.delete(&remove_path, &ada)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().map(Vec::len), Some(1));
    assert_eq!(comments[0]["text"], "first");

    let (status, body) = send(server.delete(&remove_path, &ada)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Comment does not exist for that post");
    Ok(())
}

#[tokio::test]
async fn comment_requires_text() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.seed_user("Ada").await?;
    let id = post_id(&create_post(&server, &token, "quiet").await?);

    let (status, body) = send(server.post(&format!("/api/post/comment/{}", id), &token).json(&json!({}))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "Text is required");
    Ok(())
}
