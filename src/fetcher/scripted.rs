// In-memory stand-in for the network. Each URL gets a queue of canned
// replies; the last reply repeats forever. Unknown URLs fail like a refused
// connection.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::ContentFetcher;
use crate::errors::FetchCause;

type Reply = Result<String, FetchCause>;

struct Route {
    delay: Duration,
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<u32>,
}

#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: HashMap<String, Route>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(mut self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                delay: Duration::ZERO,
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            },
        );
        self
    }

    pub(crate) fn body(self, url: &str, body: &str) -> Self {
        self.script(url, vec![Ok(body.to_string())])
    }

    pub(crate) fn fail(self, url: &str, cause: FetchCause) -> Self {
        self.script(url, vec![Err(cause)])
    }

    pub(crate) fn delayed(mut self, url: &str, body: &str, delay: Duration) -> Self {
        self = self.body(url, body);
        if let Some(route) = self.routes.get_mut(url) {
            route.delay = delay;
        }
        self
    }

    pub(crate) fn calls(&self, url: &str) -> u32 {
        self.routes
            .get(url)
            .map(|route| *route.calls.lock().unwrap())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch(&self, location: &Url) -> Result<String, FetchCause> {
        let Some(route) = self.routes.get(location.as_str()) else {
            return Err(FetchCause::Transport(format!("no route to {location}")));
        };
        *route.calls.lock().unwrap() += 1;
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        let mut replies = route.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }
}
