use service::http::api::client::ApiError;
use service::http::api::v0::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

#[derive(Debug, thiserror::Error)]
pub enum AuthOpError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for RegisterRequest {
    type Error = AuthOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response: RegisterResponse = ctx.client.call(self.clone()).await?;
        Ok(format!(
            "Registered {} with id {}",
            response.username, response.id
        ))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for LoginRequest {
    type Error = AuthOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response: LoginResponse = ctx.client.call(self.clone()).await?;
        Ok(format!(
            "Logged in as {} (id {})",
            response.username, response.id
        ))
    }
}
