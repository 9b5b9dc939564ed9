// Failures at each stage abort the run before any results file is written

mod common;

use common::{config_for, connect, credentials, mock_deploy, names, write_files};
use directai_client::{BatchRunner, Classifier, ClientError, DirectAIClient, RunOptions};
use directai_core::{DeployRequest, DeploymentKind, DetectorDefaults, Error};
use mockito::Matcher;

fn cat_dog() -> Classifier {
    Classifier::new(DeployRequest::from_class_names(
        DeploymentKind::Classifier,
        &names(&["cat", "dog"]),
        &DetectorDefaults::default(),
    ))
    .unwrap()
}

#[tokio::test]
async fn test_rejected_credentials_stop_before_deploy() {
    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"detail": "unknown client"}"#)
        .create_async()
        .await;
    let deploy = server
        .mock("POST", "/deploy_classifier")
        .expect(0)
        .create_async()
        .await;

    let result = DirectAIClient::connect(config_for(&server), &credentials()).await;

    match result {
        Err(ClientError::Authentication(msg)) => {
            assert!(msg.contains("403"));
            assert!(msg.contains("unknown client"));
        }
        Err(other) => panic!("Expected Authentication error, got {:?}", other),
        Ok(_) => panic!("Expected Authentication error"),
    }
    deploy.assert_async().await;
}

#[tokio::test]
async fn test_deploy_failure_stops_before_inference() {
    let data = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    write_files(data.path(), &["a.jpg"]);

    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let _deploy = server
        .mock("POST", "/deploy_classifier")
        .with_status(500)
        .with_body(r#"{"message": "no GPU available"}"#)
        .create_async()
        .await;
    let classify = server
        .mock("POST", "/classify")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let kind = cat_dog();
    let options = RunOptions::new(data.path(), results.path()).with_routing(true);
    let err = BatchRunner::new(&client, &kind, options)
        .execute()
        .await
        .unwrap_err();

    match err {
        ClientError::Deployment(msg) => assert!(msg.contains("no GPU available")),
        other => panic!("Expected Deployment error, got {:?}", other),
    }
    classify.assert_async().await;
    assert!(!results.path().join("classification_results.json").exists());
    // sinks are prepared before deploying
    assert!(results.path().join("cat").is_dir());
}

#[tokio::test]
async fn test_inference_failure_mid_run_writes_nothing() {
    let data = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    write_files(data.path(), &["a.jpg", "b.jpg", "c.jpg"]);

    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let _deploy = mock_deploy(&mut server, "/deploy_classifier", "dep-1").await;
    let _fail = server
        .mock("POST", "/classify")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("upstream timeout")
        .create_async()
        .await;

    let kind = cat_dog();
    let options = RunOptions::new(data.path(), results.path()).with_routing(true);
    let err = BatchRunner::new(&client, &kind, options)
        .execute()
        .await
        .unwrap_err();

    match err {
        ClientError::Inference(msg) => {
            assert!(msg.contains("502"));
            assert!(msg.contains("upstream timeout"));
        }
        other => panic!("Expected Inference error, got {:?}", other),
    }
    assert!(!results.path().join("classification_results.json").exists());
}

#[tokio::test]
async fn test_unsupported_file_aborts_run() {
    let data = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    write_files(data.path(), &["scan.tiff"]);

    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let _deploy = mock_deploy(&mut server, "/deploy_classifier", "dep-1").await;

    let kind = cat_dog();
    let err = BatchRunner::new(&client, &kind, RunOptions::new(data.path(), results.path()))
        .execute()
        .await
        .unwrap_err();

    match err {
        ClientError::Core(Error::UnsupportedMediaType(msg)) => {
            assert!(msg.contains("scan.tiff"));
            assert!(msg.contains("unsupported image type"));
        }
        other => panic!("Expected UnsupportedMediaType, got {:?}", other),
    }
    assert!(!results.path().join("classification_results.json").exists());
}

#[tokio::test]
async fn test_prediction_without_sink_is_fatal() {
    let data = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    write_files(data.path(), &["a.jpg"]);

    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let _deploy = mock_deploy(&mut server, "/deploy_classifier", "dep-1").await;
    let _classify = server
        .mock("POST", "/classify")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"scores": {"horse": 1.0}, "pred": "horse"}"#)
        .create_async()
        .await;

    let kind = cat_dog();
    let options = RunOptions::new(data.path(), results.path()).with_routing(true);
    let err = BatchRunner::new(&client, &kind, options)
        .execute()
        .await
        .unwrap_err();

    match err {
        ClientError::Core(Error::MissingSink { class, .. }) => assert_eq!(class, "horse"),
        other => panic!("Expected MissingSink, got {:?}", other),
    }
    assert!(!results.path().join("horse").exists());
    assert!(!results.path().join("classification_results.json").exists());
}

#[tokio::test]
async fn test_missing_input_dir_is_io_error() {
    let results = tempfile::tempdir().unwrap();

    let mut server = mockito::Server::new_async().await;
    let (client, _token) = connect(&mut server).await;
    let _deploy = mock_deploy(&mut server, "/deploy_classifier", "dep-1").await;

    let kind = cat_dog();
    let options = RunOptions::new(results.path().join("does-not-exist"), results.path());
    let err = BatchRunner::new(&client, &kind, options)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Core(Error::Io(_))));
}
