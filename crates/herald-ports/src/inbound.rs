use async_trait::async_trait;

use herald_core::alert::AlertGroup;

use crate::context::Context;

/// Accepts one decoded batch of alerts from the transport.
#[async_trait]
pub trait AlertGroupHandler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle_group(
        &self,
        ctx: &Context,
        source: &str,
        group: AlertGroup,
    ) -> Result<(), Self::Error>;
}
