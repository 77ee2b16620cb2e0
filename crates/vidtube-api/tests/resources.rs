mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{TestApp, json_request, request};

#[tokio::test]
async fn non_owners_are_forbidden_regardless_of_body() {
    let app = TestApp::new();
    let (_, ana) = app.signed_in("ana").await;
    let (_, bob) = app.signed_in("bob").await;
    let video = app.publish_video(&ana, "ana's clip").await;
    let uri = format!("/api/v1/videos/{}", video["id"].as_str().unwrap());

    let (status, _, _) = app
        .send(json_request("PATCH", &uri, Some(&bob), json!({ "title": "stolen" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(json_request("PATCH", &uri, Some(&bob), json!({ "title": 42, "bogus": true })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app.send(request("DELETE", &uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let toggle_uri = format!("/api/v1/videos/toggle/publish/{}", video["id"].as_str().unwrap());
    let (status, _, _) = app.send(request("PATCH", &toggle_uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body, _) = app
        .send(json_request("PATCH", &uri, Some(&ana), json!({ "title": "renamed", "description": " " })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "renamed");
    assert_eq!(body["data"]["description"], "a video");
}

#[tokio::test]
async fn draft_mutations_by_non_owners_are_forbidden() {
    let app = TestApp::new();
    let (_, ana) = app.signed_in("ana").await;
    let (_, bob) = app.signed_in("bob").await;
    let video = app.publish_video(&ana, "draft").await;
    let id = video["id"].as_str().unwrap();
    let uri = format!("/api/v1/videos/{id}");
    let toggle_uri = format!("/api/v1/videos/toggle/publish/{id}");

    let (status, _, _) = app.send(request("PATCH", &toggle_uri, Some(&ana))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = app
        .send(json_request("PATCH", &uri, Some(&bob), json!({ "title": "stolen" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized to update this video");

    let (status, _, _) = app
        .send(json_request("PATCH", &uri, Some(&bob), json!({ "title": 42 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body, _) = app.send(request("DELETE", &uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized to delete this video");

    let (status, body, _) = app.send(request("PATCH", &toggle_uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized to change publish status");

    // still a draft, still untouched
    let (status, body, _) = app.send(request("GET", &uri, Some(&ana))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "draft");
    assert_eq!(body["data"]["isPublished"], false);
}

#[tokio::test]
async fn deleting_missing_resources_is_not_found_every_time() {
    let app = TestApp::new();
    let (_, ana) = app.signed_in("ana").await;
    let missing = Uuid::new_v4();

    for uri in [
        format!("/api/v1/comments/c/{missing}"),
        format!("/api/v1/tweets/{missing}"),
        format!("/api/v1/videos/{missing}"),
    ] {
        for _ in 0..2 {
            let (status, body, _) = app.send(request("DELETE", &uri, Some(&ana))).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["success"], false);
        }
    }

    let (status, body, _) = app.send(request("DELETE", "/api/v1/tweets/abc", Some(&ana))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid tweet ID");
}

#[tokio::test]
async fn drafts_are_hidden_from_other_users() {
    let app = TestApp::new();
    let (ana_id, ana) = app.signed_in("ana").await;
    let (_, bob) = app.signed_in("bob").await;
    let video = app.publish_video(&ana, "draft").await;
    let id = video["id"].as_str().unwrap();

    let (status, body, _) = app
        .send(request("PATCH", &format!("/api/v1/videos/toggle/publish/{id}"), Some(&ana)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], false);

    let (status, _, _) = app.send(request("GET", &format!("/api/v1/videos/{id}"), Some(&bob))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body, _) = app.send(request("GET", "/api/v1/videos", Some(&bob))).await;
    assert_eq!(body["data"], json!([]));

    let (_, body, _) = app
        .send(request("GET", &format!("/api/v1/dashboard/videos/{ana_id}"), Some(&ana)))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body, _) = app
        .send(request("GET", &format!("/api/v1/dashboard/videos/{ana_id}"), Some(&bob)))
        .await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn viewing_counts_and_fills_history() {
    let app = TestApp::new();
    let (ana_id, ana) = app.signed_in("ana").await;
    let (_, bob) = app.signed_in("bob").await;
    let first = app.publish_video(&ana, "first").await;
    let second = app.publish_video(&ana, "second").await;

    for video in [&first, &second, &first] {
        let uri = format!("/api/v1/videos/{}", video["id"].as_str().unwrap());
        let (status, _, _) = app.send(request("GET", &uri, Some(&bob))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body, _) = app.send(request("GET", "/api/v1/users/history", Some(&bob))).await;
    let titles: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["first", "second"]);

    let (_, body, _) = app
        .send(request("GET", &format!("/api/v1/dashboard/stats/{ana_id}"), Some(&bob)))
        .await;
    assert_eq!(body["data"]["totalVideos"], 2);
    assert_eq!(body["data"]["totalViews"], 3);

    let (_, body, _) = app
        .send(request("GET", "/api/v1/videos?sortBy=views&sortType=asc", Some(&bob)))
        .await;
    assert_eq!(body["data"][0]["title"], "second");

    let (_, body, _) = app.send(request("GET", "/api/v1/videos?query=SEC", Some(&bob))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn comments_and_tweets_lifecycle() {
    let app = TestApp::new();
    let (ana_id, ana) = app.signed_in("ana").await;
    let (_, bob) = app.signed_in("bob").await;
    let video = app.publish_video(&ana, "clip").await;
    let comments_uri = format!("/api/v1/comments/{}", video["id"].as_str().unwrap());

    let (status, _, _) = app
        .send(json_request("POST", &comments_uri, Some(&bob), json!({ "content": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = app
        .send(json_request("POST", &comments_uri, Some(&bob), json!({ "content": "nice" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_uri = format!("/api/v1/comments/c/{}", body["data"]["id"].as_str().unwrap());

    let (status, _, _) = app
        .send(json_request("PATCH", &comment_uri, Some(&ana), json!({ "content": "edited" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body, _) = app
        .send(json_request("PATCH", &comment_uri, Some(&bob), json!({ "content": "very nice" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "very nice");

    let (_, body, _) = app.send(request("GET", &comments_uri, Some(&ana))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _, _) = app
        .send(json_request(
            "POST",
            &format!("/api/v1/comments/{}", Uuid::new_v4()),
            Some(&bob),
            json!({ "content": "hello?" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app.send(request("DELETE", &comment_uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = app.send(request("DELETE", &comment_uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body, _) = app
        .send(json_request("POST", "/api/v1/tweets", Some(&ana), json!({ "content": "hi all" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let tweet_id = body["data"]["id"].as_str().unwrap().to_string();

    let like_uri = format!("/api/v1/likes/toggle/t/{tweet_id}");
    let (status, body, _) = app.send(request("POST", &like_uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Tweet liked");

    let (status, _, _) = app
        .send(request("POST", &format!("/api/v1/likes/toggle/c/{}", Uuid::new_v4()), Some(&bob)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body, _) = app
        .send(request("GET", &format!("/api/v1/tweets/user/{ana_id}"), Some(&bob)))
        .await;
    assert_eq!(body["data"][0]["content"], "hi all");

    let tweet_uri = format!("/api/v1/tweets/{tweet_id}");
    let (status, _, _) = app.send(request("DELETE", &tweet_uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = app.send(request("DELETE", &tweet_uri, Some(&ana))).await;
    assert_eq!(status, StatusCode::OK);
}
