//! Reconciles `stores.yaml` into the database and offers catalog lookups
//! used by the CLI and the digest store allowlist.

use anyhow::Result;
use saleradar_common::config::StoreCatalogFile;
use saleradar_common::domain::{SourceType, Store};
use saleradar_db::StoreRepo;

pub struct StoreCatalog {
    repo: StoreRepo,
}

impl StoreCatalog {
    pub fn new(repo: StoreRepo) -> Self {
        Self { repo }
    }

    /// Upserts every store and source in `file`. Existing rows are
    /// updated in place; nothing already in the database but absent from
    /// the file is deleted — catalog sync only ever adds or refreshes.
    pub async fn sync(&self, file: &StoreCatalogFile) -> Result<usize> {
        let mut synced = 0;
        for entry in &file.stores {
            let store = self.repo.upsert_store(&entry.slug, &entry.name, entry.active).await?;
            for source in &entry.sources {
                let source_type = parse_source_type(&source.source_type)?;
                self.repo
                    .upsert_source(
                        store.id,
                        source_type,
                        source.tier,
                        source.url.as_deref(),
                        source.config.clone(),
                    )
                    .await?;
            }
            synced += 1;
        }
        Ok(synced)
    }

    pub async fn active_stores(&self) -> Result<Vec<Store>> {
        self.repo.active_stores().await
    }

    pub async fn active_sources(&self, store_id: saleradar_common::domain::StoreId) -> Result<Vec<saleradar_common::domain::SourceConfig>> {
        self.repo.active_sources_for_store(store_id).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Store>> {
        self.repo.search(query).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Store>> {
        self.repo.find_by_slug(slug).await
    }
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
        other => anyhow::bail!("unknown source_type '{other}' in stores.yaml"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_type_accepts_every_known_variant() {
        assert_eq!(parse_source_type("sitemap").unwrap(), SourceType::Sitemap);
        assert_eq!(parse_source_type("rss").unwrap(), SourceType::Rss);
        assert_eq!(parse_source_type("json").unwrap(), SourceType::Json);
        assert_eq!(parse_source_type("category").unwrap(), SourceType::Category);
        assert_eq!(parse_source_type("browser").unwrap(), SourceType::Browser);
        assert_eq!(parse_source_type("mail_from_address").unwrap(), SourceType::MailFromAddress);
        assert_eq!(parse_source_type("mail_from_domain").unwrap(), SourceType::MailFromDomain);
    }

    #[test]
    fn parse_source_type_rejects_unknown_strings() {
        assert!(parse_source_type("carrier_pigeon").is_err());
    }
}
