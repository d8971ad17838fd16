use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use betaflix::cli::{Cli, Commands};
use betaflix::db::Database;
use betaflix::{views, Aggregator, Config};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    betaflix::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let mut config = Config::load(cli.config.as_deref()).context("load config")?;
    if let Some(url) = &cli.base_url {
        config.upstream.base_url = url.clone();
    }
    if let Some(url) = &cli.database_url {
        config.cache.database_url = Some(url.clone());
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    let cache = if config.cache.enabled {
        let db = Database::connect(config.cache.database_url.as_deref()).await.context("open response cache")?;
        db.run_migrations().await?;
        Some(db)
    } else {
        None
    };

    let mut agg = Aggregator::new(config.clone()).context("build upstream client")?.with_refresh(cli.refresh);
    if let Some(db) = &cache {
        agg = agg.with_cache(Arc::new(db.clone()));
        match agg.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "dropped expired cached responses"),
            Err(e) => tracing::warn!(error = %e, "failed to purge expired cache entries"),
        }
    }

    match cli.command {
        Commands::Latest { page } => print_json(&agg.latest(page).await),
        Commands::Recommended { page } => print_json(&agg.recommended(page).await),
        Commands::Series { page, limit } => print_json(&agg.series_only(page, limit).await),
        Commands::Movies { page, view, filter } => {
            let movies = match view {
                Some(v) => agg.movie_catalog(v).await,
                None => agg.movies(page).await,
            };
            let movies = match filter {
                Some(q) => views::filter_by_title(movies, &q),
                None => movies,
            };
            print_json(&movies)
        }
        Commands::Catalog { page, query } => match query {
            Some(q) => print_json(&agg.search_series(&q, config.search.series_limit).await),
            None => print_json(&agg.series_catalog(page).await),
        },
        Commands::Search { query, limit } => {
            let limit = limit.unwrap_or(config.search.default_limit);
            print_json(&agg.search(&query, limit).await)
        }
        Commands::Detail { slug } => print_json(&agg.detail(&slug).await),
        Commands::Video { chapter, resolution } => print_json(&agg.video(&chapter, resolution).await),
        Commands::Home { seed } => {
            let feed = match seed {
                Some(s) => agg.home_with_rng(&mut StdRng::seed_from_u64(s)).await,
                None => agg.home().await,
            };
            print_json(&feed)
        }
        Commands::CacheClear { prefix } => {
            let removed = agg.clear_cache(prefix.as_deref()).await?;
            if let Some(db) = &cache {
                db.vacuum().await;
            }
            tracing::info!(removed, "cleared cached responses");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}
