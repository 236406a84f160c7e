use anyhow::Result;
use kteeth::cli::{actions, actions::Action, start};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments and initialize telemetry
    let action = start()?;

    // Handle the action
    match action {
        Action::Server(..) => actions::server::handle(action).await?,
    }

    Ok(())
}
