//! String<->enum conversions for columns stored as `text` rather than a
//! native Postgres enum, so adding a variant never requires a migration.

use saleradar_common::domain::{ChangeType, ExtractionStatus, PromoStatus, PromoVertical, RunStatus, RunType, SourceType};

pub fn source_type_to_str(t: SourceType) -> &'static str {
    match t {
        SourceType::Sitemap => "sitemap",
        SourceType::Rss => "rss",
        SourceType::Json => "json",
        SourceType::Category => "category",
        SourceType::Browser => "browser",
        SourceType::MailFromAddress => "mail_from_address",
        SourceType::MailFromDomain => "mail_from_domain",
    }
}

pub fn source_type_from_str(s: &str) -> anyhow::Result<SourceType> {
    Ok(match s {
        "sitemap" => SourceType::Sitemap,
        "rss" => SourceType::Rss,
        "json" => SourceType::Json,
        "category" => SourceType::Category,
        "browser" => SourceType::Browser,
        "mail_from_address" => SourceType::MailFromAddress,
        "mail_from_domain" => SourceType::MailFromDomain,
        other => anyhow::bail!("unknown source_type '{other}'"),
    })
}

pub fn promo_status_to_str(s: PromoStatus) -> &'static str {
    match s {
        PromoStatus::Active => "active",
        PromoStatus::Expired => "expired",
    }
}

pub fn promo_status_from_str(s: &str) -> anyhow::Result<PromoStatus> {
    Ok(match s {
        "active" => PromoStatus::Active,
        "expired" => PromoStatus::Expired,
        other => anyhow::bail!("unknown promo status '{other}'"),
    })
}

pub fn vertical_to_str(v: PromoVertical) -> &'static str {
    match v {
        PromoVertical::Flight => "flight",
        PromoVertical::Retail => "retail",
        PromoVertical::Other => "other",
    }
}

pub fn vertical_from_str(s: &str) -> anyhow::Result<PromoVertical> {
    Ok(match s {
        "flight" => PromoVertical::Flight,
        "retail" => PromoVertical::Retail,
        "other" | "" => PromoVertical::Other,
        other => anyhow::bail!("unknown vertical '{other}'"),
    })
}

pub fn change_type_to_str(c: ChangeType) -> &'static str {
    match c {
        ChangeType::Created => "created",
        ChangeType::EndExtended => "end_extended",
        ChangeType::DiscountChanged => "discount_changed",
        ChangeType::CodeAdded => "code_added",
        ChangeType::CodeChanged => "code_changed",
    }
}

pub fn change_type_from_str(s: &str) -> anyhow::Result<ChangeType> {
    Ok(match s {
        "created" => ChangeType::Created,
        "end_extended" => ChangeType::EndExtended,
        "discount_changed" => ChangeType::DiscountChanged,
        "code_added" => ChangeType::CodeAdded,
        "code_changed" => ChangeType::CodeChanged,
        other => anyhow::bail!("unknown change_type '{other}'"),
    })
}

pub fn run_type_to_str(t: RunType) -> &'static str {
    match t {
        RunType::Daily => "daily",
        RunType::Weekly => "weekly",
    }
}

pub fn run_type_from_str(s: &str) -> anyhow::Result<RunType> {
    Ok(match s {
        "daily" => RunType::Daily,
        "weekly" => RunType::Weekly,
        other => anyhow::bail!("unknown run_type '{other}'"),
    })
}

pub fn run_status_to_str(s: RunStatus) -> &'static str {
    match s {
        RunStatus::Running => "running",
        RunStatus::Success => "success",
        RunStatus::Failed => "failed",
    }
}

pub fn run_status_from_str(s: &str) -> anyhow::Result<RunStatus> {
    Ok(match s {
        "running" => RunStatus::Running,
        "success" => RunStatus::Success,
        "failed" => RunStatus::Failed,
        other => anyhow::bail!("unknown run status '{other}'"),
    })
}

pub fn extraction_status_to_str(s: ExtractionStatus) -> &'static str {
    match s {
        ExtractionStatus::Pending => "pending",
        ExtractionStatus::Success => "success",
        ExtractionStatus::Error => "error",
        ExtractionStatus::SkippedDuplicate => "skipped_duplicate",
    }
}

pub fn extraction_status_from_str(s: &str) -> anyhow::Result<ExtractionStatus> {
    Ok(match s {
        "pending" => ExtractionStatus::Pending,
        "success" => ExtractionStatus::Success,
        "error" => ExtractionStatus::Error,
        "skipped_duplicate" => ExtractionStatus::SkippedDuplicate,
        other => anyhow::bail!("unknown extraction status '{other}'"),
    })
}
