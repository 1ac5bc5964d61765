use service::http::api::client::ApiError;
use service::http::api::v0::users::{ListUsersRequest, ListUsersResponse};

#[derive(Debug, thiserror::Error)]
pub enum UsersError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for ListUsersRequest {
    type Error = UsersError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let users: ListUsersResponse = ctx.client.call(self.clone()).await?;

        if users.is_empty() {
            return Ok("No users found".to_string());
        }
        Ok(users
            .iter()
            .map(|user| format!("{}\t{}", user.id, user.username))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
