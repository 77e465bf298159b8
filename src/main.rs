use anyhow::Result;

use kernel_gate::{pipeline, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = Settings::from_env()?;
    let report = pipeline::run(&settings).await?;

    println!("{report}");
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
