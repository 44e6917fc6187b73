use async_trait::async_trait;
use log::error;
use rand::{thread_rng, Rng};
use reqwest::{Client, RequestBuilder, Response, Url};
use std::time::Duration;
use tokio::time::sleep;

const MAX_RETRIES: u32 = 6;

#[async_trait]
pub trait ExponentialRetry {
    fn get_client(&self) -> &Client;

    fn retry_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Send with jittered exponential backoff. Only transport errors are
    /// retried; any HTTP response, whatever its status, is returned as is.
    /// Errors never carry the request url, it may hold credentials.
    async fn send_with_retry<F>(&self, request: F) -> Result<Response, reqwest::Error>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut timeout = self.retry_delay().as_secs_f64();
        let mut tries = 0;
        loop {
            match request(self.get_client()).send().await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    let err = err.without_url();
                    tries += 1;
                    if tries >= MAX_RETRIES {
                        return Err(err);
                    }
                    error!("Got error {:?} , retrying", err);
                    sleep(Duration::from_secs_f64(timeout)).await;
                    timeout *= thread_rng().gen_range(1.5..2.5);
                }
            }
        }
    }

    async fn get(&self, url: &Url) -> Result<Response, reqwest::Error> {
        self.send_with_retry(|client| client.get(url.clone())).await
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.send_with_retry(|client| client.post(url.clone()).form(form))
            .await
    }
}
