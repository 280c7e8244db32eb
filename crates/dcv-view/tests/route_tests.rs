//! Preview route over HTTP

use chrono::Utc;
use dcv_artifact::{ArtifactStore, MemoryArtifactStore};
use dcv_test_utils::{preview_key, rtdc_resource, sample_resource, test_presigner, test_store};
use dcv_view::{
    preview_filter, preview_url, DatasetRecord, MemberAccess, MemoryCatalog, PreviewRoute,
    RouteConfig, NO_PREVIEW_AVAILABLE, RESOURCE_NOT_FOUND,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use warp::http::StatusCode;

const PUBLIC_ID: &str = "public-ds";
const PRIVATE_ID: &str = "private-ds";
const READER_TOKEN: &str = "reader-token-1";

fn catalog() -> MemoryCatalog {
    let public = DatasetRecord::new(PUBLIC_ID, Utc::now())
        .with_resource(sample_resource().with_s3_available(true))
        .with_resource(rtdc_resource("ab12cd34ef", "not_mirrored.rtdc", 0));
    let private = DatasetRecord::new(PRIVATE_ID, Utc::now())
        .with_private(true)
        .with_reader(READER_TOKEN)
        .with_resource(rtdc_resource("99aa88bb77cc", "secret_cells.rtdc", 0).with_s3_available(true));
    MemoryCatalog::new().with_dataset(public).with_dataset(private)
}

fn route_over(store: Arc<MemoryArtifactStore>) -> Arc<PreviewRoute> {
    Arc::new(PreviewRoute::new(
        Arc::new(catalog()),
        Arc::new(MemberAccess),
        store,
        RouteConfig::default(),
    ))
}

async fn store_with_previews() -> Arc<MemoryArtifactStore> {
    let store = test_store();
    let public = sample_resource();
    let private = rtdc_resource("99aa88bb77cc", "secret_cells.rtdc", 0);
    for resource in [&public, &private] {
        store.upload(&preview_key(resource), b"\xFF\xD8jpeg", false).await.unwrap();
    }
    store
}

async fn get(
    route: &Arc<PreviewRoute>,
    path: &str,
    token: Option<&str>,
) -> warp::http::Response<warp::hyper::body::Bytes> {
    let mut request = warp::test::request().method("GET").path(path);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    request.reply(&preview_filter(Arc::clone(route))).await
}

fn location(response: &warp::http::Response<warp::hyper::body::Bytes>) -> String {
    response.headers()["location"].to_str().unwrap().to_string()
}

#[tokio::test]
async fn public_preview_redirects_for_a_day() {
    let route = route_over(store_with_previews().await);
    let resource = sample_resource();

    let response = get(&route, &preview_url(PUBLIC_ID, &resource.id), None).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let link = test_presigner().verify_at(&location(&response), Utc::now()).unwrap();
    assert_eq!(link.object_name, preview_key(&resource).object_name());
    assert_eq!(link.filename, "calibration_beads_47_preview.jpg");
    let lifetime = link.expires - Utc::now().timestamp();
    assert!((86_390..=86_400).contains(&lifetime), "lifetime {lifetime}");
}

#[tokio::test]
async fn private_preview_needs_a_reader_and_expires_in_an_hour() {
    let route = route_over(store_with_previews().await);
    let path = preview_url(PRIVATE_ID, "99aa88bb77cc");

    let anonymous = get(&route, &path, None).await;
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);
    assert_eq!(anonymous.body().as_ref(), RESOURCE_NOT_FOUND.as_bytes());

    let stranger = get(&route, &path, Some("someone-else")).await;
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);
    assert_eq!(stranger.body().as_ref(), RESOURCE_NOT_FOUND.as_bytes());

    let member = get(&route, &path, Some(READER_TOKEN)).await;
    assert_eq!(member.status(), StatusCode::FOUND);
    let link = test_presigner().verify_at(&location(&member), Utc::now()).unwrap();
    assert_eq!(link.filename, "secret_cells_preview.jpg");
    let lifetime = link.expires - Utc::now().timestamp();
    assert!((3_590..=3_600).contains(&lifetime), "lifetime {lifetime}");
}

#[tokio::test]
async fn unknown_and_foreign_resources_look_the_same() {
    let route = route_over(store_with_previews().await);

    let unknown_dataset = get(&route, &preview_url("nope", &sample_resource().id), None).await;
    let unknown_resource = get(&route, &preview_url(PUBLIC_ID, "0000000000"), None).await;
    // resource exists, but belongs to the private dataset
    let foreign = get(&route, &preview_url(PUBLIC_ID, "99aa88bb77cc"), None).await;

    for response in [unknown_dataset, unknown_resource, foreign] {
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), RESOURCE_NOT_FOUND.as_bytes());
    }
}

#[tokio::test]
async fn missing_preview_is_not_found() {
    let store = test_store();
    let route = route_over(Arc::clone(&store));

    let response = get(&route, &preview_url(PUBLIC_ID, &sample_resource().id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), NO_PREVIEW_AVAILABLE.as_bytes());
    assert_eq!(store.stats().presigns, 0);
}

#[tokio::test]
async fn store_not_consulted_without_mirror_flag() {
    let store = store_with_previews().await;
    store
        .upload(&preview_key(&rtdc_resource("ab12cd34ef", "x.rtdc", 0)), b"jpeg", false)
        .await
        .unwrap();
    let before = store.stats().exists_calls;
    let route = route_over(Arc::clone(&store));

    let response = get(&route, &preview_url(PUBLIC_ID, "ab12cd34ef"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), NO_PREVIEW_AVAILABLE.as_bytes());
    assert_eq!(store.stats().exists_calls, before);
}

#[tokio::test]
async fn unavailable_store_is_not_found() {
    let store = store_with_previews().await;
    store.set_available(false);
    let route = route_over(Arc::clone(&store));

    let response = get(&route, &preview_url(PUBLIC_ID, &sample_resource().id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), NO_PREVIEW_AVAILABLE.as_bytes());
}

#[tokio::test]
async fn only_get_is_routed() {
    let route = route_over(store_with_previews().await);
    let response = warp::test::request()
        .method("POST")
        .path(&preview_url(PUBLIC_ID, &sample_resource().id))
        .reply(&preview_filter(route))
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
