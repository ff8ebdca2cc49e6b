use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use web3::ethabi::{self, Function, Token};
use web3::types::Address;

use crate::to_checksum_address;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("unable to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artifact is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("artifact abi is invalid: {0}")]
    Abi(#[from] ethabi::Error),

    #[error("artifact bytecode is not valid hex: {0}")]
    Bytecode(#[from] hex::FromHexError),
}

/// A compiled contract: its name, ABI and creation bytecode.
///
/// Artifacts are read from the JSON files a hardhat compile produces,
/// laid out as `<dir>/<Name>.sol/<Name>.json`. An artifact is the
/// "factory" half of a contract; [`Artifact::attach`] pairs it with an
/// on-chain address to produce a [`ContractHandle`].
#[derive(Debug, Clone)]
pub struct Artifact {
    name: String,
    abi: ethabi::Contract,
    bytecode: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, abi: ethabi::Contract, bytecode: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    /// Parses a hardhat artifact. `contractName` is optional and falls back
    /// to `fallback_name`.
    pub fn from_json(bytes: &[u8], fallback_name: &str) -> Result<Self, ArtifactError> {
        let full_json: serde_json::Value = serde_json::from_slice(bytes)?;
        let abi_bytes = serde_json::to_vec(
            full_json
                .get("abi")
                .ok_or(ArtifactError::MissingField("abi"))?,
        )?;
        let abi = ethabi::Contract::load(&*abi_bytes)?;

        let bytecode = full_json
            .get("bytecode")
            .and_then(|b| b.as_str())
            .ok_or(ArtifactError::MissingField("bytecode"))?;
        let bytecode = hex::decode(bytecode.trim_start_matches("0x"))?;

        let name = full_json
            .get("contractName")
            .and_then(|n| n.as_str())
            .unwrap_or(fallback_name)
            .to_string();

        Ok(Self {
            name,
            abi,
            bytecode,
        })
    }

    /// Path of the artifact for `name` under a hardhat `artifacts/contracts` dir.
    pub fn path_in(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.sol")).join(format!("{name}.json"))
    }

    pub async fn load(dir: &Path, name: &str) -> Result<Self, ArtifactError> {
        let path = Self::path_in(dir, name);
        log::debug!("loading {} artifact from {}", name, path.display());
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ArtifactError::Io { path, source })?;
        Self::from_json(&bytes, name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &ethabi::Contract {
        &self.abi
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Creation payload: bytecode followed by the encoded constructor args.
    pub fn deploy_data(&self, args: &[Token]) -> Result<Vec<u8>, ethabi::Error> {
        match self.abi.constructor() {
            Some(constructor) => constructor.encode_input(self.bytecode.clone(), args),
            None if args.is_empty() => Ok(self.bytecode.clone()),
            None => Err(ethabi::Error::InvalidData),
        }
    }

    pub fn attach(self: &Arc<Self>, address: Address) -> ContractHandle {
        ContractHandle {
            artifact: Arc::clone(self),
            address,
        }
    }
}

/// A deployed contract: the artifact it was built from and its address.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    artifact: Arc<Artifact>,
    address: Address,
}

impl ContractHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        self.artifact.name()
    }

    pub fn artifact(&self) -> &Arc<Artifact> {
        &self.artifact
    }

    pub fn function(&self, method: &str) -> Result<&Function, ethabi::Error> {
        self.artifact.abi().function(method)
    }
}

impl std::fmt::Display for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name(), to_checksum_address(&self.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BALLOT_ARTIFACT: &str = r#"{
        "contractName": "Ballot",
        "abi": [
            {
                "inputs": [{ "internalType": "bytes32[]", "name": "proposalNames", "type": "bytes32[]" }],
                "stateMutability": "nonpayable",
                "type": "constructor"
            },
            {
                "inputs": [],
                "name": "chairperson",
                "outputs": [{ "internalType": "address", "name": "", "type": "address" }],
                "stateMutability": "view",
                "type": "function"
            }
        ],
        "bytecode": "0x6080604052"
    }"#;

    #[test]
    fn parses_hardhat_artifacts() {
        let artifact = Artifact::from_json(BALLOT_ARTIFACT.as_bytes(), "Fallback").unwrap();
        assert_eq!(artifact.name(), "Ballot");
        assert_eq!(artifact.bytecode(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert!(artifact.abi().function("chairperson").is_ok());
    }

    #[test]
    fn appends_constructor_args_to_bytecode() {
        let artifact = Artifact::from_json(BALLOT_ARTIFACT.as_bytes(), "Ballot").unwrap();
        let args = [crate::bytes32_array(&["a", "b"]).unwrap()];
        let data = artifact.deploy_data(&args).unwrap();
        assert!(data.starts_with(artifact.bytecode()));
        // offset word, length word, then one word per name
        assert_eq!(data.len(), artifact.bytecode().len() + 32 * 4);
    }

    #[test]
    fn reports_missing_fields() {
        let err = Artifact::from_json(br#"{ "bytecode": "0x" }"#, "Ballot").unwrap_err();
        assert!(matches!(err, ArtifactError::MissingField("abi")));
    }

    #[tokio::test]
    async fn loads_from_hardhat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = Artifact::path_in(dir.path(), "Ballot");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(BALLOT_ARTIFACT.as_bytes())
            .unwrap();

        let artifact = Arc::new(Artifact::load(dir.path(), "Ballot").await.unwrap());
        let handle = artifact.attach(Address::from_low_u64_be(7));
        assert_eq!(handle.name(), "Ballot");
        assert_eq!(handle.address(), Address::from_low_u64_be(7));

        let missing = Artifact::load(dir.path(), "Token").await.unwrap_err();
        assert!(matches!(missing, ArtifactError::Io { .. }));
    }
}
