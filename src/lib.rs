//! `skynt-phi` - Φ scoring engine and on-chain parameter reader
//!
//! Computes the weighted Φ aggregate and its entropy-shift metrics, scores
//! NFT rarity, and reads live parameters and token metadata from the SKYNT
//! contracts over JSON-RPC, falling back to labelled mock data when the
//! chain is unreachable.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod observability;
pub mod service;
pub mod source;
