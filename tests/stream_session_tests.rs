// Live stream sessions: start, watch URL, stop

mod common;

use common::{bearer, connect, mock_deploy, names};
use directai_client::{StopOutcome, StreamClassifierConfig, TrackerConfig};
use directai_core::{DeployRequest, DeploymentKind, DetectorDefaults};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn test_tracker_session_lifecycle() {
    let configs = tempfile::tempdir().unwrap();
    let path = configs.path().join("tracker.json");
    std::fs::write(
        &path,
        json!({
            "stream_url": "rtsp://10.0.0.12:8554/front-door",
            "webhook_url": "https://hooks.example/front-door",
            "tracker_config": {
                "rebroadcast_annotations": "True",
                "detectors": [
                    {"name": "person", "incs": ["person"], "excs": []},
                    {"name": "package", "incs": ["cardboard box", "parcel"], "excs": ["trash can"]}
                ]
            }
        })
        .to_string(),
    )
    .unwrap();

    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let start = server
        .mock("POST", "/run_tracker_on_url_stream")
        .match_header("authorization", bearer().as_str())
        .match_body(Matcher::PartialJson(json!({
            "stream_url": "rtsp://10.0.0.12:8554/front-door",
            "tracker_config": {
                "detectors": [
                    {"name": "person"},
                    {"name": "package", "excs": ["trash can"]}
                ]
            }
        })))
        .with_status(200)
        .with_body(r#"{"tracker_instance_id": "a1b2c3"}"#)
        .create_async()
        .await;
    let stop = server
        .mock("POST", "/stop_tracker")
        .match_header("authorization", bearer().as_str())
        .match_query(Matcher::UrlEncoded(
            "tracker_instance_id".into(),
            "a1b2c3".into(),
        ))
        .with_status(200)
        .with_body(r#"{"message": "OK"}"#)
        .create_async()
        .await;

    let tracker = TrackerConfig::from_file(&path).unwrap();
    let session = client.start_tracker(&tracker).await.unwrap();
    assert_eq!(session.tracker_instance_id, "a1b2c3");
    assert!(session.watch_url.ends_with("/a1b2c3"));

    let outcome = client.stop_stream(&session).await.unwrap();
    assert_eq!(outcome, StopOutcome::Stopped);

    start.assert_async().await;
    stop.assert_async().await;
}

#[tokio::test]
async fn test_stream_classifier_deploys_then_starts() {
    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let _deploy = mock_deploy(&mut server, "/deploy_classifier", "dep-live").await;
    let start = server
        .mock("POST", "/run_classifier_on_url_stream")
        .match_body(Matcher::PartialJson(json!({
            "stream_url": "rtmp://live.example/app/cam",
            "deployed_id": "dep-live",
            "rebroadcast_annotations": "True",
            "webhook_url": "https://hooks.example/frames"
        })))
        .with_status(200)
        .with_body(r#"{"tracker_instance_id": "s-55"}"#)
        .create_async()
        .await;
    let _stop = server
        .mock("POST", "/stop_tracker")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"message": "instance s-55 already terminated"}"#)
        .create_async()
        .await;

    let request = DeployRequest::from_class_names(
        DeploymentKind::Classifier,
        &names(&["open door", "closed door"]),
        &DetectorDefaults::default(),
    );
    let handle = client.deploy(&request).await.unwrap();
    let config = StreamClassifierConfig::new("rtmp://live.example/app/cam", &handle)
        .with_webhook(Some("https://hooks.example/frames".to_string()));
    let session = client.start_classifier_stream(&config).await.unwrap();
    start.assert_async().await;

    match client.stop_stream(&session).await.unwrap() {
        StopOutcome::NotConfirmed(message) => assert!(message.contains("already terminated")),
        StopOutcome::Stopped => panic!("Expected unconfirmed stop"),
    }
}
