//! Token reports (`nft list | get | rarity | distribution`).

use crate::cli::args::{FormatArgs, TokenArgs};
use crate::config::schema::AppConfig;
use crate::error::SkyntError;
use crate::service::{PhiService, TokenView};

use super::emit;

/// Lists the first tokens of the collection.
///
/// # Errors
///
/// Returns an error if the source cannot report the total supply.
pub async fn list(config: &AppConfig, args: &FormatArgs) -> Result<(), SkyntError> {
    let service = PhiService::from_config(config)?;
    let list = service.tokens().await?;
    emit(args.format, &list, |l| {
        println!("{} of {} tokens ({})", l.nfts.len(), l.total, l.source);
        for token in &l.nfts {
            print_token_line(token);
        }
    })
}

/// Shows one token.
///
/// # Errors
///
/// Returns an error if the token does not exist or the source cannot answer.
pub async fn get(config: &AppConfig, args: &TokenArgs) -> Result<(), SkyntError> {
    let service = PhiService::from_config(config)?;
    let token = service.token(args.token_id).await?;
    emit(args.format, &token, |t| {
        println!("token      #{}", t.token_id);
        println!("owner      {}", t.owner);
        println!("tier       {}", t.metadata.rarity_tier);
        println!("rarity     {}", t.metadata.rarity);
        println!("phi value  {}", t.metadata.phi_value);
        println!("supply     {}", t.metadata.supply);
        println!("demand     {}", t.metadata.demand);
        println!("minted     {}", t.metadata.mint_time);
        println!("source     {}", t.source);
    })
}

/// Recomputes one token's rarity score.
///
/// # Errors
///
/// Returns an error if the token does not exist or the source cannot answer.
pub async fn rarity(config: &AppConfig, args: &TokenArgs) -> Result<(), SkyntError> {
    let service = PhiService::from_config(config)?;
    let report = service.rarity(args.token_id).await?;
    emit(args.format, &report, |r| {
        println!(
            "token #{}: score {} (stored {}) from supply={} demand={} phi={} ({})",
            r.token_id, r.rarity_score, r.rarity, r.supply, r.demand, r.phi_value, r.source
        );
        println!("{}", r.formula);
    })
}

/// Counts tokens per rarity tier.
///
/// # Errors
///
/// Returns an error if the source cannot report the total supply.
pub async fn distribution(config: &AppConfig, args: &FormatArgs) -> Result<(), SkyntError> {
    let service = PhiService::from_config(config)?;
    let report = service.distribution().await?;
    emit(args.format, &report, |r| {
        println!("{} of {} tokens counted ({})", r.counted, r.total, r.source);
        for (tier, count) in r.distribution.iter() {
            println!("  {:<10} {count}", tier.as_str());
        }
    })
}

fn print_token_line(token: &TokenView) {
    println!(
        "  #{:<5} {:<10} rarity={:<6} phi={:<6} owner={}",
        token.token_id,
        token.metadata.rarity_tier.as_str(),
        token.metadata.rarity.to_string(),
        token.metadata.phi_value.to_string(),
        token.owner
    );
}
