use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;

/// Build an S3 client from the default credential and region chain.
///
/// `region` overrides whatever the environment resolves.
pub async fn build_client(region: Option<String>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region));
    }
    let config = loader.load().await;
    Client::new(&config)
}
