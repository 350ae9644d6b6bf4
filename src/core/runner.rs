use crate::domain::ports::Demo;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub name: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Runs every registered demo once, in registration order.
#[derive(Default)]
pub struct DemoRunner {
    demos: Vec<Arc<dyn Demo>>,
}

impl DemoRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, demo: Arc<dyn Demo>) {
        tracing::debug!("Registered demo '{}'", demo.name());
        self.demos.push(demo);
    }

    pub fn names(&self) -> Vec<String> {
        self.demos.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.demos.is_empty()
    }

    /// A failing demo is logged and does not stop the ones after it.
    pub async fn run_all(&self) -> Vec<DemoOutcome> {
        let mut outcomes = Vec::with_capacity(self.demos.len());

        for demo in &self.demos {
            let started = Instant::now();
            tracing::info!("▶️  Running {} demo", demo.name());

            let outcome = match demo.run().await {
                Ok(()) => {
                    tracing::info!(
                        "✅ {} demo finished in {:?}",
                        demo.name(),
                        started.elapsed()
                    );
                    DemoOutcome {
                        name: demo.name().to_string(),
                        succeeded: true,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "❌ {} demo failed: {} (Category: {:?}, Severity: {:?})",
                        demo.name(),
                        e,
                        e.category(),
                        e.severity()
                    );
                    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                    DemoOutcome {
                        name: demo.name().to_string(),
                        succeeded: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    pub async fn shutdown_all(&self) {
        for demo in &self.demos {
            demo.shutdown().await;
        }
    }
}
