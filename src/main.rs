use clap::Parser;
use cloud_bdii_provider::utils::{logger, validation::Validate};
use cloud_bdii_provider::{BdiiError, BdiiGenerator, CliConfig, Result, SiteConfig};

async fn run(config: &CliConfig) -> Result<String> {
    config.validate()?;

    let site = SiteConfig::from_file(&config.config)?;
    site.validate()?;
    tracing::info!("📁 Loaded site description for {} from {}", site.site.site_name, config.config);

    let mut generator = BdiiGenerator::new(site.to_provider(), &config.template_dir);
    if let Some(middleware) = config.middleware_provider()? {
        generator = generator.with_middleware(middleware);
    }

    generator.run().await
}

fn fail(e: BdiiError) -> ! {
    tracing::error!("❌ Generation failed: {} (Category: {:?})", e, e.category());
    eprintln!("❌ {}", e);
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting cloud-bdii-provider");
    tracing::debug!("CLI config: middleware={:?} config={} templates={}", config.middleware, config.config, config.template_dir);

    match run(&config).await {
        Ok(ldif) => println!("{}", ldif),
        Err(e) => fail(e),
    }
}
