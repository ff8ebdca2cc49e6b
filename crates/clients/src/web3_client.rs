use async_trait::async_trait;
use ballot_types::{
    to_checksum_address, Artifact, BlockSummary, ContractHandle, Receipt, Signer, TxOptions,
};
use web3::ethabi::{Function, Token};
use web3::signing::SecretKeyRef;
use web3::transports::Http;
use web3::types::{
    Address, BlockId, BlockNumber, Bytes, CallRequest, TransactionParameters, TransactionReceipt,
    TransactionRequest, H256, U256, U64,
};
use web3::Web3;

use crate::{ChainClient, ChainError};

/// Alchemy endpoint for the Goerli test network.
pub fn alchemy_goerli_url(api_key: &str) -> String {
    format!("https://eth-goerli.g.alchemy.com/v2/{api_key}")
}

/// [`ChainClient`] backed by a JSON-RPC node over HTTP.
#[derive(Clone, Debug)]
pub struct Web3Client {
    web3: Web3<Http>,
}

impl Web3Client {
    pub fn new(web3: Web3<Http>) -> Self {
        Self { web3 }
    }

    pub fn connect(rpc_url: &str) -> Result<Self, ChainError> {
        let http = Http::new(rpc_url).map_err(ChainError::from)?;
        log::info!("connecting to {}", rpc_url);
        Ok(Self::new(Web3::new(http)))
    }

    pub async fn chain_id(&self) -> Result<U256, ChainError> {
        Ok(self.web3.eth().chain_id().await?)
    }

    fn function<'a>(
        contract: &'a ContractHandle,
        method: &str,
    ) -> Result<&'a Function, ChainError> {
        contract
            .function(method)
            .map_err(|_| ChainError::UnknownMethod {
                contract: contract.name().to_string(),
                method: method.to_string(),
            })
    }

    fn encode_call(
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
    ) -> Result<Vec<u8>, ChainError> {
        Self::function(contract, method)?
            .encode_input(args)
            .map_err(|e| ChainError::InvalidArguments {
                method: method.to_string(),
                reason: e.to_string(),
            })
    }

    async fn submit(
        &self,
        signer: &Signer,
        to: Option<Address>,
        data: Vec<u8>,
        options: TxOptions,
    ) -> Result<H256, ChainError> {
        match signer {
            Signer::Node(from) => {
                let request = TransactionRequest {
                    from: *from,
                    to,
                    gas: options.gas,
                    value: options.value,
                    data: Some(Bytes(data)),
                    ..Default::default()
                };
                Ok(self.web3.eth().send_transaction(request).await?)
            }
            Signer::Local { address, key } => {
                let gas = match options.gas {
                    Some(gas) => gas,
                    None => {
                        let estimate = CallRequest {
                            from: Some(*address),
                            to,
                            value: options.value,
                            data: Some(Bytes(data.clone())),
                            ..Default::default()
                        };
                        self.web3.eth().estimate_gas(estimate, None).await?
                    }
                };
                log::debug!("providing {} gas for transaction", gas);
                let params = TransactionParameters {
                    to,
                    gas,
                    value: options.value.unwrap_or_default(),
                    data: Bytes(data),
                    ..Default::default()
                };
                let signed = self
                    .web3
                    .accounts()
                    .sign_transaction(params, SecretKeyRef::new(key))
                    .await?;
                Ok(self
                    .web3
                    .eth()
                    .send_raw_transaction(signed.raw_transaction)
                    .await?)
            }
        }
    }
}

/// Converts a node receipt, treating receipts without a block as pending.
pub fn receipt_from_web3(receipt: TransactionReceipt) -> Option<Receipt> {
    let block_number = receipt.block_number?.as_u64();
    Some(Receipt {
        transaction_hash: receipt.transaction_hash,
        block_number,
        block_hash: receipt.block_hash,
        gas_used: receipt.gas_used,
        contract_address: receipt.contract_address,
        // pre-byzantium receipts carry no status
        success: receipt.status.map_or(true, |s| s == U64::from(1)),
    })
}

#[async_trait]
impl ChainClient for Web3Client {
    async fn latest_block(&self) -> Result<BlockSummary, ChainError> {
        let block = self
            .web3
            .eth()
            .block(BlockId::Number(BlockNumber::Latest))
            .await?
            .ok_or_else(|| ChainError::Provider("latest block unavailable".to_string()))?;
        let number = block
            .number
            .ok_or_else(|| ChainError::Provider("latest block has no number".to_string()))?;
        Ok(BlockSummary {
            number: number.as_u64(),
            hash: block.hash,
        })
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.web3.eth().balance(address, None).await?)
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError> {
        Ok(self.web3.eth().code(address, None).await?.0)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.web3.eth().accounts().await?)
    }

    async fn deploy(
        &self,
        signer: &Signer,
        artifact: &Artifact,
        args: &[Token],
        options: TxOptions,
    ) -> Result<H256, ChainError> {
        let data = artifact
            .deploy_data(args)
            .map_err(|e| ChainError::InvalidArguments {
                method: format!("{} constructor", artifact.name()),
                reason: e.to_string(),
            })?;
        log::debug!(
            "deploying {} from {}",
            artifact.name(),
            to_checksum_address(&signer.address())
        );
        self.submit(signer, None, data, options).await
    }

    async fn send(
        &self,
        signer: &Signer,
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
        options: TxOptions,
    ) -> Result<H256, ChainError> {
        let data = Self::encode_call(contract, method, args)?;
        self.submit(signer, Some(contract.address()), data, options)
            .await
    }

    async fn call(
        &self,
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
        from: Option<Address>,
    ) -> Result<Vec<Token>, ChainError> {
        let data = Self::encode_call(contract, method, args)?;
        let request = CallRequest {
            from,
            to: Some(contract.address()),
            data: Some(Bytes(data)),
            ..Default::default()
        };
        let output = self.web3.eth().call(request, None).await?;
        Self::function(contract, method)?
            .decode_output(&output.0)
            .map_err(|e| ChainError::Decoding {
                method: method.to_string(),
                reason: e.to_string(),
            })
    }

    async fn receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError> {
        let receipt = self.web3.eth().transaction_receipt(hash).await?;
        Ok(receipt.and_then(receipt_from_web3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_receipt(fields: serde_json::Value) -> TransactionReceipt {
        let mut receipt = serde_json::json!({
            "transactionHash": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "transactionIndex": "0x0",
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "cumulativeGasUsed": "0x5208",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
        });
        if let (Some(receipt), Some(fields)) = (receipt.as_object_mut(), fields.as_object()) {
            receipt.extend(fields.clone());
        }
        serde_json::from_value(receipt).unwrap()
    }

    #[test]
    fn pending_receipts_have_no_block() {
        let pending = node_receipt(serde_json::json!({}));
        assert!(receipt_from_web3(pending).is_none());
    }

    #[test]
    fn reads_status_and_created_address() {
        let mined = node_receipt(serde_json::json!({
            "blockNumber": "0xc",
            "contractAddress": "0x00000000000000000000000000000000000000c0",
            "status": "0x0",
        }));
        let receipt = receipt_from_web3(mined).unwrap();
        assert_eq!(receipt.transaction_hash, H256::from_low_u64_be(1));
        assert_eq!(receipt.block_number, 12);
        assert_eq!(receipt.contract_address, Some(Address::from_low_u64_be(0xc0)));
        assert!(!receipt.success);
    }

    #[test]
    fn builds_alchemy_urls() {
        assert_eq!(
            alchemy_goerli_url("abc"),
            "https://eth-goerli.g.alchemy.com/v2/abc"
        );
    }

    #[tokio::test]
    async fn unreachable_node_is_a_connectivity_error() {
        let client = Web3Client::connect("http://127.0.0.1:1").unwrap();
        let err = client.latest_block().await.unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::Connectivity);
    }
}
