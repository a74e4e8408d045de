mod support;

use support::{sample_recipe, TestApp, GIF, PNG};
use warp::http::StatusCode;

async fn recipe_with_owner(app: &TestApp) -> (String, String) {
    let token = app.login("a@x.com").await;
    let recipe = app.create_recipe(&token, sample_recipe("Dal")).await;
    (token, format!("/api/recipes/{}", recipe["id"]))
}

#[tokio::test]
async fn upload_stores_and_serves_the_image() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;

    let response = app
        .upload(&format!("{recipe}/image/"), Some(&token), "image", PNG)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let image = response.body["image"].as_str().unwrap().to_owned();
    assert!(image.starts_with("/media/uploads/recipe/"));
    assert!(image.ends_with(".png"));

    let stored = app.state.media.path_of(&image).unwrap();
    assert!(stored.starts_with(app.media_root()));
    assert_eq!(std::fs::read(&stored).unwrap(), PNG);

    let detail = app.get(&format!("{recipe}/"), Some(&token)).await;
    assert_eq!(detail.body["image"], image.as_str());

    let served = warp::test::request()
        .method("GET")
        .path(&image)
        .reply(&recipe_catalog::routes(app.state.clone()))
        .await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.body().as_ref(), PNG);
}

#[tokio::test]
async fn non_image_leaves_prior_image_unchanged() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;
    let path = format!("{recipe}/image/");
    let first = app.upload(&path, Some(&token), "image", PNG).await;
    let image = first.body["image"].clone();

    let response = app
        .upload(&path, Some(&token), "image", b"notanimage")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.get("image").is_some());
    let detail = app.get(&format!("{recipe}/"), Some(&token)).await;
    assert_eq!(detail.body["image"], image);
}

#[tokio::test]
async fn text_with_a_bitmap_prefix_is_not_an_image() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;
    let path = format!("{recipe}/image/");
    let first = app.upload(&path, Some(&token), "image", PNG).await;
    let image = first.body["image"].clone();

    let response = app
        .upload(
            &path,
            Some(&token),
            "image",
            b"BMI notes: this is plain text, not a bitmap at all.",
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.get("image").is_some());
    let detail = app.get(&format!("{recipe}/"), Some(&token)).await;
    assert_eq!(detail.body["image"], image);
    let uploads = std::fs::read_dir(app.media_root().join("uploads/recipe")).unwrap();
    assert_eq!(uploads.count(), 1);
}

#[tokio::test]
async fn bare_png_signature_is_not_an_image() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;

    let response = app
        .upload(&format!("{recipe}/image/"), Some(&token), "image", &PNG[..8])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.get("image").is_some());
}

#[tokio::test]
async fn replacing_an_image_removes_the_old_file() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;
    let path = format!("{recipe}/image/");

    let first = app.upload(&path, Some(&token), "image", PNG).await;
    let old = app
        .state
        .media
        .path_of(first.body["image"].as_str().unwrap())
        .unwrap();
    let second = app.upload(&path, Some(&token), "image", GIF).await;

    assert_eq!(second.status, StatusCode::OK);
    assert!(second.body["image"].as_str().unwrap().ends_with(".gif"));
    assert!(!old.exists());
}

#[tokio::test]
async fn missing_image_part_is_a_validation_error() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;

    let response = app
        .upload(&format!("{recipe}/image/"), Some(&token), "photo", PNG)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.get("image").is_some());
}

#[tokio::test]
async fn upload_to_another_users_recipe_is_not_found() {
    let app = TestApp::new();
    let (_, recipe) = recipe_with_owner(&app).await;
    let intruder = app.login("b@x.com").await;

    let response = app
        .upload(&format!("{recipe}/image/"), Some(&intruder), "image", PNG)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_requires_authentication() {
    let app = TestApp::new();
    let (_, recipe) = recipe_with_owner(&app).await;

    let response = app
        .upload(&format!("{recipe}/image/"), None, "image", PNG)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_a_recipe_removes_its_image() {
    let app = TestApp::new();
    let (token, recipe) = recipe_with_owner(&app).await;
    let uploaded = app
        .upload(&format!("{recipe}/image/"), Some(&token), "image", PNG)
        .await;
    let stored = app
        .state
        .media
        .path_of(uploaded.body["image"].as_str().unwrap())
        .unwrap();

    let response = app.delete(&format!("{recipe}/"), Some(&token)).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(!stored.exists());
}
