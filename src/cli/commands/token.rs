use anyhow::Context;
use serde_json::json;

use crate::auth::TokenVerifier;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::types::ObjectId;

pub fn handle(config: AppConfig, user_id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let user: ObjectId = user_id
        .parse()
        .with_context(|| format!("invalid user id {:?}", user_id))?;
    let token = TokenVerifier::new(&config.security).issue(user)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "user": user, "token": token, "expires_in_hours": config.security.jwt_expiry_hours })
        ),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
