mod cli;

use clap::{Parser, Subcommand};
use cli::{
    args::Args, op::Op, Captcha, Health, History, Init, Keygen, Listen, Pubkey, Send, Version,
};
use service::http::api::v0::auth::{LoginRequest, RegisterRequest};
use service::http::api::v0::users::ListUsersRequest;
use tracing_subscriber::EnvFilter;

command_enum! {
    (Init, Init),
    (Keygen, Keygen),
    (Pubkey, Pubkey),
    (Captcha, Captcha),
    (Register, RegisterRequest),
    (Login, LoginRequest),
    (Users, ListUsersRequest),
    (History, History),
    (Send, Send),
    (Listen, Listen),
    (Health, Health),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(tracing::Level::DEBUG.into())
                    .from_env_lossy(),
            )
            .compact()
            .init();
    }

    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());

    // Build context - always has API client initialized
    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
