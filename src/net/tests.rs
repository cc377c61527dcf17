use std::collections::HashMap;

use crate::ArcStr;

use super::Net;

#[tokio::test]
async fn mock_answers_known_urls() {
    let net = Net::mock([("https://a.test/x", "{\"ok\":true}")]);

    let body = net.get(ArcStr::from("https://a.test/x")).await.unwrap();
    assert_eq!(&*body, "{\"ok\":true}");
}

#[tokio::test]
async fn mock_fails_unknown_urls_and_records_requests() {
    let net = Net::mock(Vec::<(String, String)>::new());

    assert!(net.get(ArcStr::from("https://a.test/missing")).await.is_err());

    net.respond(HashMap::from([(
        "https://a.test/late".to_string(),
        "late".to_string(),
    )]))
    .await;
    assert_eq!(&*net.get(ArcStr::from("https://a.test/late")).await.unwrap(), "late");

    assert_eq!(
        net.requested().await.unwrap(),
        vec!["https://a.test/missing", "https://a.test/late"]
    );
}
