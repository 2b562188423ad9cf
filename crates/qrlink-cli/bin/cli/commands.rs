use crate::cli::{Command, ExpirationArgs, CLI};
use anyhow::{Context, Result};
use jiff::Timestamp;
use qrlink_core::{ShortCode, UrlRecord};
use qrlink_generator::random::RandomGenerator;
use qrlink_qr::QrOptions;
use qrlink_redirector::{RedirectorService, ResolutionResult};
use qrlink_shortener::{ExpirationPolicy, ShortenParams, Shortener, ShortenerService};
use qrlink_storage::{FileStore, LocalRegistry};
use std::sync::Arc;
use tracing::info;

type SharedRegistry = Arc<LocalRegistry<FileStore>>;

impl ExpirationArgs {
    fn policy(&self) -> ExpirationPolicy {
        match self.expire_in {
            Some(value) => ExpirationPolicy::after(value, self.unit.into()),
            None => ExpirationPolicy::Never,
        }
    }
}

pub async fn run(config: CLI) -> Result<()> {
    let registry: SharedRegistry = Arc::new(LocalRegistry::new(FileStore::new(&config.store_dir)));
    let shortener = ShortenerService::new(registry.clone(), RandomGenerator::new());
    let base_url = config.base_url.as_str();

    match config.command {
        Command::Shorten {
            url,
            alias,
            expiration,
        } => {
            let mut params = ShortenParams::new(url).with_expiration(expiration.policy());
            if let Some(alias) = alias {
                params = params.with_alias(alias);
            }
            let record = shortener.shorten(params).await.context("could not shorten url")?;
            println!("{}", record.short_code.to_url(base_url));
            println!("  {}", describe_expiration(record.expires_at));
        }
        Command::Encode { url, expiration } => {
            let code = shortener
                .shorten_self_encoded(&url, expiration.policy())
                .await
                .context("could not encode url")?;
            println!("{}", code.to_url(base_url));
        }
        Command::Resolve { code, follow, json } => {
            let redirector = RedirectorService::new(registry);
            let resolution = redirector.resolve(&code).await;

            if json {
                let result = ResolutionResult::from(resolution.clone());
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", resolution.title());
                println!("  {}", resolution.message());
            }

            if follow {
                let cancelled = async {
                    // Without a Ctrl-C handler there is nothing to cancel on.
                    if tokio::signal::ctrl_c().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                };
                match redirector.navigate(&resolution, cancelled).await {
                    Some(url) => println!("-> {url}"),
                    None if resolution.is_resolved() => info!("redirect cancelled"),
                    None => {}
                }
            } else if let Some(url) = resolution.destination_url() {
                println!("-> {url}");
            }
        }
        Command::List => {
            let records = shortener.list().await.context("could not read registry")?;
            if records.is_empty() {
                println!("no links yet");
            }
            let now = Timestamp::now();
            for record in &records {
                print_record(record, base_url, now);
            }
        }
        Command::Remove { code } => {
            let code = ShortCode::new(code)?;
            if shortener.delete(&code).await.context("could not update registry")? {
                println!("removed {code}");
            } else {
                anyhow::bail!("no link with code {code}");
            }
        }
        Command::Qr {
            text,
            output,
            size,
            ec_level,
            fg,
            bg,
            logo,
        } => {
            let logo = logo
                .map(|path| {
                    qrlink_qr::load_logo(&path)
                        .with_context(|| format!("could not read logo {}", path.display()))
                })
                .transpose()?;
            let options = QrOptions::builder()
                .size(size)
                .ec_level(ec_level)
                .foreground(fg)
                .background(bg)
                .build();

            let image = qrlink_qr::render(&text, &options, logo.as_ref())?;
            qrlink_qr::save_png(&image, &output)
                .with_context(|| format!("could not write {}", output.display()))?;
            println!("wrote {}", output.display());
        }
    }

    Ok(())
}

fn describe_expiration(expires_at: Option<Timestamp>) -> String {
    match expires_at {
        None => "Never expires".to_string(),
        Some(at) => format!("Expires {at}"),
    }
}

fn print_record(record: &UrlRecord, base_url: &str, now: Timestamp) {
    let status = if record.is_expired(now) { " [EXPIRED]" } else { "" };
    println!("{}{}", record.short_code.to_url(base_url), status);
    println!("  {}", record.original_url);
    println!(
        "  Created: {}  {}  Clicks: {}",
        record.created_at.strftime("%Y-%m-%d"),
        describe_expiration(record.expires_at),
        record.clicks
    );
}
