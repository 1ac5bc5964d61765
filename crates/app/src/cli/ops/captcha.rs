use std::path::PathBuf;

use clap::Args;

use service::http::api::client::ApiError;
use service::http::api::v0::auth::{CaptchaRequest, CaptchaResponse};

#[derive(Args, Debug, Clone)]
pub struct Captcha {
    #[command(flatten)]
    pub request: CaptchaRequest,

    /// Where to write the captcha image
    #[arg(long, default_value = "captcha.svg")]
    pub out: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("captcha image is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write captcha image: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Captcha {
    type Error = CaptchaError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response: CaptchaResponse = ctx.client.call(self.request.clone()).await?;
        std::fs::write(&self.out, response.image_bytes()?)?;

        Ok(format!(
            "Captcha ({}) written to {}\nsession id: {}",
            response.mime_type,
            self.out.display(),
            response.session_id
        ))
    }
}
