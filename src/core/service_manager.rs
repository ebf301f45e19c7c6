use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info};

// Pause between restarts so a crash loop doesn't spin
const RESTART_DELAY: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
#[error("{0}")]
pub struct Error(String);

impl Error {
    pub fn new(s: &str) -> Error {
        Error(s.to_string())
    }

    pub fn from<E: std::error::Error>(e: E) -> Self {
        Self(e.to_string())
    }
}

#[async_trait]
pub trait Service {
    type Context: Clone + Send;
    const NAME: &'static str;
    async fn new(context: Self::Context) -> Result<Self, Error>
    where
        Self: Sized;
    async fn run(self) -> Result<(), Error>;
}

pub struct ServiceManager<C> {
    context: C,
    services: JoinSet<()>,
}

impl<C> ServiceManager<C>
where
    C: 'static + Clone + Send,
{
    pub fn new(context: C) -> Self {
        Self {
            context,
            services: JoinSet::new(),
        }
    }

    /// Runs the service forever, rebuilding it after every exit or error
    pub fn spawn<T: Service<Context = C> + Send + 'static>(&mut self) {
        let context = self.context.clone();
        self.services.spawn(async move {
            loop {
                info!(service = T::NAME, "Starting service");
                let result = match T::new(context.clone()).await {
                    Ok(service) => service.run().await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => info!(service = T::NAME, "Service stopped, restarting"),
                    Err(e) => error!(service = T::NAME, error = %e, "Service failed, restarting"),
                }
                tokio::time::sleep(RESTART_DELAY).await;
            }
        });
    }

    pub async fn wait(&mut self) -> Result<(), Error> {
        if self.services.join_next().await.is_some() {
            return Err(Error::new("Internal Service Error"));
        }
        Ok(())
    }
}
