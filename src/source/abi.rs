//! Contract interfaces for the view calls the contract source makes.
//!
//! Signatures are kept in human-readable form and parsed with
//! [`ethers::abi::parse_abi`]; call data and return data go through the
//! parsed [`Function`]s. [`Outputs`] narrows decoded tokens to the Rust types
//! the source needs and reports a [`UpstreamError::Malformed`] on any shape
//! mismatch.

use ethereum_types::U256;
use ethers::abi::{Abi, Function, Token, parse_abi};

use crate::error::UpstreamError;

/// `Admin` view functions.
pub const ADMIN_ABI: &[&str] = &[
    "function computePhi() external view returns (uint256)",
    "function getPhiDetails() external view returns (uint256[], uint256[], uint256[], uint256)",
];

/// `SKYNTLaunchNFT` view functions.
pub const NFT_ABI: &[&str] = &[
    "function totalSupply() external view returns (uint256)",
    "function getMetadata(uint256 tokenId) external view returns (uint256, uint256, uint256, uint256, uint256, string)",
    "function ownerOf(uint256 tokenId) external view returns (address)",
    "function getRarityTier(uint256 tokenId) external view returns (string)",
];

/// A parsed contract interface.
#[derive(Debug, Clone)]
pub struct Interface {
    abi: Abi,
}

impl Interface {
    /// Parses human-readable function signatures.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if a signature does not parse.
    pub fn parse(signatures: &[&str]) -> Result<Self, UpstreamError> {
        let abi = parse_abi(signatures)
            .map_err(|e| UpstreamError::Malformed(format!("contract interface: {e}")))?;
        Ok(Self { abi })
    }

    /// The `Admin` interface.
    ///
    /// # Errors
    ///
    /// See [`Interface::parse`].
    pub fn admin() -> Result<Self, UpstreamError> {
        Self::parse(ADMIN_ABI)
    }

    /// The `SKYNTLaunchNFT` interface.
    ///
    /// # Errors
    ///
    /// See [`Interface::parse`].
    pub fn nft() -> Result<Self, UpstreamError> {
        Self::parse(NFT_ABI)
    }

    /// Looks up a function by name.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the interface has no such
    /// function.
    pub fn function(&self, name: &str) -> Result<&Function, UpstreamError> {
        self.abi
            .function(name)
            .map_err(|e| UpstreamError::Malformed(format!("{name}: {e}")))
    }

    /// Encodes call data for `name` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the function is unknown or the
    /// arguments do not match its inputs.
    pub fn encode(&self, name: &str, args: &[Token]) -> Result<Vec<u8>, UpstreamError> {
        self.function(name)?
            .encode_input(args)
            .map_err(|e| UpstreamError::Malformed(format!("{name} call data: {e}")))
    }

    /// Decodes the return data of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the data does not match the
    /// function's outputs.
    pub fn decode(&self, name: &'static str, data: &[u8]) -> Result<Outputs, UpstreamError> {
        let tokens = self
            .function(name)?
            .decode_output(data)
            .map_err(|e| UpstreamError::Malformed(format!("{name} return data: {e}")))?;
        Ok(Outputs { function: name, tokens })
    }
}

/// Decoded return values of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    function: &'static str,
    tokens: Vec<Token>,
}

impl Outputs {
    /// `uint256` at position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the value is missing or not a
    /// `uint256`.
    pub fn uint(&self, index: usize) -> Result<U256, UpstreamError> {
        match self.tokens.get(index) {
            Some(Token::Uint(value)) => Ok(*value),
            other => Err(self.mismatch(index, "uint256", other)),
        }
    }

    /// `uint256[]` at position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the value is missing or not a
    /// `uint256` array.
    pub fn uint_array(&self, index: usize) -> Result<Vec<U256>, UpstreamError> {
        let Some(Token::Array(items)) = self.tokens.get(index) else {
            return Err(self.mismatch(index, "uint256[]", self.tokens.get(index)));
        };
        items
            .iter()
            .map(|item| match item {
                Token::Uint(value) => Ok(*value),
                other => Err(self.mismatch(index, "uint256[]", Some(other))),
            })
            .collect()
    }

    /// `string` at position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the value is missing or not a
    /// `string`.
    pub fn string(&self, index: usize) -> Result<String, UpstreamError> {
        match self.tokens.get(index) {
            Some(Token::String(value)) => Ok(value.clone()),
            other => Err(self.mismatch(index, "string", other)),
        }
    }

    /// `address` at position `index`, as a lowercase `0x` string.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Malformed`] if the value is missing or not an
    /// `address`.
    pub fn address(&self, index: usize) -> Result<String, UpstreamError> {
        match self.tokens.get(index) {
            Some(Token::Address(value)) => Ok(format!("{value:#x}")),
            other => Err(self.mismatch(index, "address", other)),
        }
    }

    fn mismatch(&self, index: usize, expected: &str, found: Option<&Token>) -> UpstreamError {
        let found = found.map_or_else(|| "nothing".to_string(), |t| format!("{t:?}"));
        UpstreamError::Malformed(format!(
            "{}: output {index} should be {expected}, found {found}",
            self.function
        ))
    }
}
