use anyhow::{bail, Context, Result};

use saleradar_adapters::{Adapter, CategoryAdapter, JsonAdapter, RssAdapter, SitemapAdapter};
use saleradar_common::config::{PreferencesFile, StoreCatalogFile, SourceFileEntry, StoreFileEntry};
use saleradar_common::domain::{RunType, SourceType};
use saleradar_common::Config;
use saleradar_db::StoreRepo;
use saleradar_pipeline::StoreCatalog;

use crate::wiring;

const KNOWN_SOURCE_TYPES: &[&str] = &[
    "sitemap",
    "rss",
    "json",
    "category",
    "browser",
    "mail_from_address",
    "mail_from_domain",
];

pub fn seed(config: &Config) -> Result<()> {
    if config.stores_file.exists() {
        println!("{} already exists, leaving it alone", config.stores_file.display());
    } else {
        let starter = StoreCatalogFile {
            stores: vec![StoreFileEntry {
                slug: "acme".to_string(),
                name: "Acme".to_string(),
                active: true,
                sources: vec![SourceFileEntry {
                    source_type: "sitemap".to_string(),
                    tier: 1,
                    url: Some("https://acme.example/sitemap.xml".to_string()),
                    config: serde_json::json!({}),
                }],
            }],
        };
        let yaml = serde_yaml::to_string(&starter)?;
        std::fs::write(&config.stores_file, yaml)
            .with_context(|| format!("writing {}", config.stores_file.display()))?;
        println!("wrote starter {}", config.stores_file.display());
    }

    if config.preferences_file.exists() {
        println!("{} already exists, leaving it alone", config.preferences_file.display());
    } else {
        let yaml = serde_yaml::to_string(&PreferencesFile::default())?;
        std::fs::write(&config.preferences_file, yaml)
            .with_context(|| format!("writing {}", config.preferences_file.display()))?;
        println!("wrote starter {}", config.preferences_file.display());
    }
    Ok(())
}

pub async fn init(config: &Config) -> Result<()> {
    let pool = wiring::connect(config).await?;
    saleradar_db::run_migrations(&pool).await?;
    println!("migrations applied");
    Ok(())
}

pub async fn sync_stores(config: &Config) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let catalog = StoreCatalog::new(StoreRepo::new(pool));
    let file = StoreCatalogFile::load(&config.stores_file)?;
    let synced = catalog.sync(&file).await?;
    println!("synced {synced} stores from {}", config.stores_file.display());
    Ok(())
}

pub async fn run_daily(config: &Config, dry_run: bool) -> Result<()> {
    run_pipeline(config, RunType::Daily, dry_run).await
}

pub async fn run_weekly(config: &Config, dry_run: bool) -> Result<()> {
    run_pipeline(config, RunType::Weekly, dry_run).await
}

async fn run_pipeline(config: &Config, run_type: RunType, dry_run: bool) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let orchestrator = wiring::build_orchestrator(config, pool).await?;
    let today = chrono::Utc::now().date_naive();
    let outcome = orchestrator.run(run_type, today, dry_run).await?;

    println!("{}", serde_json::to_string_pretty(&outcome.stats.to_json())?);
    if let Some(path) = &outcome.archive_path {
        println!("digest written to {}", path.display());
    }
    Ok(())
}

pub fn sources_validate(config: &Config) -> Result<()> {
    let file = StoreCatalogFile::load(&config.stores_file)?;
    let mut errors = Vec::new();
    let mut seen_slugs = std::collections::HashSet::new();

    for store in &file.stores {
        if !seen_slugs.insert(store.slug.clone()) {
            errors.push(format!("duplicate store slug '{}'", store.slug));
        }
        if store.sources.is_empty() {
            errors.push(format!("store '{}' has no sources", store.slug));
        }
        for source in &store.sources {
            if !KNOWN_SOURCE_TYPES.contains(&source.source_type.as_str()) {
                errors.push(format!(
                    "store '{}' has unknown source_type '{}'",
                    store.slug, source.source_type
                ));
            }
            let needs_url = !matches!(source.source_type.as_str(), "mail_from_address" | "mail_from_domain");
            if needs_url && source.url.is_none() {
                errors.push(format!("store '{}' source '{}' has no url", store.slug, source.source_type));
            }
        }
    }

    if errors.is_empty() {
        println!("{} stores valid", file.stores.len());
        Ok(())
    } else {
        for e in &errors {
            eprintln!("error: {e}");
        }
        bail!("{} validation error(s) in {}", errors.len(), config.stores_file.display());
    }
}

pub async fn sources_debug(config: &Config, store_slug: &str, source_type: &str) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let store_repo = StoreRepo::new(pool);
    let store = store_repo
        .find_by_slug(store_slug)
        .await?
        .with_context(|| format!("no store with slug '{store_slug}'"))?;

    let configs = store_repo.active_sources_for_store(store.id).await?;
    let wanted = parse_source_type(source_type)?;
    let source_config = configs
        .into_iter()
        .find(|c| c.source_type == wanted)
        .with_context(|| format!("store '{store_slug}' has no active {source_type} source"))?;

    let fetcher = || saleradar_fetch::Fetcher::new(reqwest::Client::new(), config.bot_user_agent.clone());
    let adapter: Box<dyn Adapter> = match wanted {
        SourceType::Sitemap => Box::new(SitemapAdapter::new(fetcher())),
        SourceType::Rss => Box::new(RssAdapter::new(fetcher())),
        SourceType::Json => Box::new(JsonAdapter::new(fetcher())),
        SourceType::Category => Box::new(CategoryAdapter::new(fetcher())),
        SourceType::Browser | SourceType::MailFromAddress | SourceType::MailFromDomain => {
            bail!("'{source_type}' cannot be debugged standalone")
        }
    };

    let result = adapter.discover(&source_config).await;
    println!(
        "signals={} not_modified={} error={:?}",
        result.signals.len(),
        result.not_modified,
        result.error
    );
    Ok(())
}

pub async fn sources_report(config: &Config) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let store_repo = StoreRepo::new(pool);
    let stores = store_repo.active_stores().await?;

    for store in stores {
        let sources = store_repo.active_sources_for_store(store.id).await?;
        println!("{} ({} sources)", store.slug, sources.len());
        for source in sources {
            println!(
                "  tier={} type={:?} last_success={:?} failures={}",
                source.tier, source.source_type, source.last_successful_run, source.failure_count
            );
        }
    }
    Ok(())
}

pub async fn stores_list(config: &Config) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let stores = StoreRepo::new(pool).active_stores().await?;
    for store in stores {
        println!("{}\t{}", store.slug, store.name);
    }
    Ok(())
}

pub async fn stores_search(config: &Config, query: &str) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let stores = StoreRepo::new(pool).search(query).await?;
    for store in stores {
        println!("{}\t{}", store.slug, store.name);
    }
    Ok(())
}

pub fn stores_allowlist(config: &Config) -> Result<()> {
    let prefs = PreferencesFile::load(&config.preferences_file)?;
    if prefs.digest_store_allowlist.is_empty() {
        println!("(no allowlist configured — all active stores are eligible)");
    } else {
        for slug in &prefs.digest_store_allowlist {
            println!("{slug}");
        }
    }
    Ok(())
}

pub async fn status(config: &Config) -> Result<()> {
    let pool = wiring::connect(config).await?;
    let runs = saleradar_db::RunRepo::new(pool);
    for run_type in [RunType::Daily, RunType::Weekly] {
        match runs.latest(run_type).await? {
            Some(run) => println!(
                "{:?}: {:?} digest_date={} started={} finished={:?} digest_sent={:?}",
                run_type, run.status, run.digest_date, run.started_at, run.finished_at, run.digest_sent_at
            ),
            None => println!("{run_type:?}: no runs yet"),
        }
    }
    Ok(())
}

fn parse_source_type(raw: &str) -> Result<SourceType> {
    Ok(match raw {
        "sitemap" => SourceType::Sitemap,
        "rss" => SourceType::Rss,
        "json" => SourceType::Json,
        "category" => SourceType::Category,
        "browser" => SourceType::Browser,
        "mail_from_address" => SourceType::MailFromAddress,
        "mail_from_domain" => SourceType::MailFromDomain,
        other => bail!("unknown source_type '{other}'"),
    })
}
