//! Shared fixtures for the cross-crate tests.

use std::sync::Arc;

use domains::{NewPoll, PollRepository};
use services::mirror::EnvironmentProfile;
use services::PollService;

pub fn color_poll(id: &str) -> NewPoll {
    NewPoll {
        id: id.to_string(),
        question: "Color?".to_string(),
        choices: vec!["Red".to_string(), "Blue".to_string()],
    }
}

/// A fixed profile; distinct `agent`s give distinct device signatures.
pub fn profile(agent: &str) -> EnvironmentProfile {
    EnvironmentProfile {
        user_agent: agent.to_string(),
        language: "en-US".to_string(),
        color_depth: 24,
        screen_width: 1280,
        screen_height: 800,
        timezone_offset_minutes: 0,
        hardware_concurrency: Some(8),
        device_memory_gb: None,
    }
}

pub fn service(repo: Arc<dyn PollRepository>) -> PollService {
    PollService::new(repo)
}

#[cfg(feature = "web-axum")]
pub use server::{spawn_server, unreachable_url, TestServer};

#[cfg(feature = "web-axum")]
mod server {
    use std::sync::Arc;

    use api_adapters::{router, AppState};
    use domains::PollRepository;
    use services::PollService;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// A live store on an ephemeral port; stops when dropped.
    pub struct TestServer {
        pub base_url: String,
        task: JoinHandle<()>,
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    pub async fn spawn_server(repo: Arc<dyn PollRepository>) -> anyhow::Result<TestServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(AppState::new(PollService::new(repo)), "/api", true);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(TestServer {
            base_url: format!("http://{addr}/api"),
            task,
        })
    }

    /// A base URL on a port nobody listens on.
    pub async fn unreachable_url() -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        Ok(format!("http://{addr}/api"))
    }
}
