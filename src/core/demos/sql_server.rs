use crate::domain::ports::{CustomerRepository, Demo};
use crate::utils::error::Result;
use async_trait::async_trait;

pub struct SqlServerDemo<R: CustomerRepository> {
    repository: R,
    limit: usize,
}

impl<R: CustomerRepository> SqlServerDemo<R> {
    pub fn new(repository: R, limit: usize) -> Self {
        Self { repository, limit }
    }
}

#[async_trait]
impl<R: CustomerRepository> Demo for SqlServerDemo<R> {
    fn name(&self) -> &str {
        "sql-server"
    }

    async fn run(&self) -> Result<()> {
        let customers = self.repository.first_customers(self.limit).await?;
        for customer in &customers {
            tracing::info!("{}", customer);
        }
        tracing::debug!("Read {} customers", customers.len());
        Ok(())
    }
}
