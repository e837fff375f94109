//! End-to-end action tests against an in-memory node. Every test builds its
//! own fixtures; nothing is shared through globals.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use evm_rpc_client::{
    api::{BlockSelector, BlockTransactions, Transaction, TransactionSelector},
    rpc::transport::Transport,
    utils::{from_units, u256_to_hex},
    ChainDefinition, Client, ClientError, RpcError, TestNodeMode, U256,
};

const ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const TX_HASH: &str = "0x2ecd08e86079f08cfc27c326aa01b1c8d62f288d5961118056bac7da315f94d9";

/// Minimal node double: balances mutate like a real test node, everything
/// else replays canned responses per method.
#[derive(Default)]
struct MockNode {
    balances: Mutex<HashMap<String, U256>>,
    canned: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<String>>,
    production: bool,
}

impl MockNode {
    fn respond(self, method: &str, response: Value) -> Self {
        self.canned
            .lock()
            .unwrap()
            .entry(method.to_owned())
            .or_default()
            .push_back(response);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockNode {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push(method.to_owned());
        match method {
            "anvil_setBalance" | "hardhat_setBalance" => {
                let address = params[0].as_str().unwrap().to_owned();
                let value = params[1].as_str().unwrap().trim_start_matches("0x").to_owned();
                let value = U256::from_str_radix(&value, 16).unwrap();
                // overwrite, not accumulate
                self.balances.lock().unwrap().insert(address, value);
                Ok(Value::Null)
            }
            "eth_getBalance" => {
                let address = params[0].as_str().unwrap();
                let balance = self
                    .balances
                    .lock()
                    .unwrap()
                    .get(address)
                    .copied()
                    .unwrap_or_default();
                Ok(json!(u256_to_hex(balance)))
            }
            _ => {
                let canned = self
                    .canned
                    .lock()
                    .unwrap()
                    .get_mut(method)
                    .and_then(|queue| queue.pop_front());
                match canned {
                    Some(response) => Ok(response),
                    None => Err(ClientError::Rpc {
                        method: method.to_owned(),
                        error: RpcError {
                            code: -32601,
                            message: format!("the method {} does not exist", method),
                            data: None,
                        },
                    }),
                }
            }
        }
    }

    fn is_production(&self) -> bool {
        self.production
    }
}

fn test_client(node: MockNode) -> Result<Client> {
    Ok(Client::builder()
        .chain(ChainDefinition::dev())
        .transport(node)
        .test_actions(TestNodeMode::Anvil)
        .build()?)
}

fn op_client(node: MockNode) -> Result<Client> {
    Ok(Client::builder()
        .chain(ChainDefinition::op_mainnet())
        .transport(node)
        .build()?)
}

#[tokio::test]
async fn test_set_balance_overwrites() -> Result<()> {
    let client = test_client(MockNode::default())?;
    let account = ACCOUNT.parse()?;
    let decimals = client.decimals();

    client
        .set_balance(&account, from_units("420", decimals)?)
        .await?;
    assert_eq!(
        client.get_balance(&account, None).await?.to_string(),
        "420000000000000000000"
    );

    // a second set replaces the balance, it does not add to it
    client
        .set_balance(&account, from_units("69", decimals)?)
        .await?;
    assert_eq!(
        client.get_balance(&account, None).await?.to_string(),
        "69000000000000000000"
    );
    Ok(())
}

#[tokio::test]
async fn test_test_namespace_disabled_fails_before_dispatch() -> Result<()> {
    let node = Arc::new(MockNode::default());
    let client = Client::builder()
        .chain(ChainDefinition::dev())
        .shared_transport(node.clone())
        .build()?;
    let account = ACCOUNT.parse()?;

    let err = client.set_balance(&account, U256::from(1u64)).await.unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedOperation { .. }));
    // refused locally, nothing reached the wire
    assert_eq!(node.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_production_transport_refuses_test_methods() -> Result<()> {
    let node = MockNode {
        production: true,
        ..Default::default()
    };
    let client = test_client(node)?;
    let account = ACCOUNT.parse()?;

    let err = client.set_balance(&account, U256::from(1u64)).await.unwrap_err();
    match err {
        ClientError::UnsupportedOperation { method } => {
            assert_eq!(method, "anvil_setBalance");
        }
        other => panic!("expected UnsupportedOperation, got {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_node_method_not_found_becomes_unsupported() -> Result<()> {
    // MockNode answers -32601 for methods without canned responses
    let client = test_client(MockNode::default())?;
    let err = client.mine(Some(1), None).await.unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedOperation { .. }));
    Ok(())
}

fn raw_deposit_tx() -> Value {
    json!({
        "hash": TX_HASH,
        "nonce": "0x0",
        "blockHash": "0xc350d807505fb835650f0013632c5515592987ba169bbc6626d9fc54d91f0f0b",
        "blockNumber": "0xfdb984",
        "transactionIndex": "0x0",
        "from": "0xdeaddeaddeaddeaddeaddeaddeaddeaddead0001",
        "to": "0x4200000000000000000000000000000000000015",
        "value": "0x0",
        "gas": "0xf4240",
        "input": "0x",
        "type": "0x7e",
        "sourceHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
        "mint": "0x0",
        "isSystemTx": true,
    })
}

fn raw_eip1559_tx() -> Value {
    json!({
        "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
        "nonce": "0x1",
        "blockHash": "0xc350d807505fb835650f0013632c5515592987ba169bbc6626d9fc54d91f0f0b",
        "blockNumber": "0xfdb984",
        "transactionIndex": "0x1",
        "from": "0xa1e4380a3b1f749673e270229993ee55f35663b4",
        "to": "0x5df9b87991262f6ba471f09758cde1c0fc1de734",
        "value": "0x38d7ea4c68000",
        "gas": "0x5208",
        "maxFeePerGas": "0x2d79883d2000",
        "maxPriorityFeePerGas": "0x3b9aca00",
        "chainId": "0xa",
        "accessList": [],
        "type": "0x2",
        "input": "0x",
    })
}

fn raw_block(transactions: Value) -> Value {
    json!({
        "hash": "0xc350d807505fb835650f0013632c5515592987ba169bbc6626d9fc54d91f0f0b",
        "parentHash": "0x4e3a3754410177e6937ef1f84bba68ea139e8d1a2258c5f85db9f1cd715a1bdd",
        "number": "0xfdb984",
        "timestamp": "0x63bfe4db",
        "miner": "0xa1e4380a3b1f749673e270229993ee55f35663b4",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0xf4240",
        "stateRoot": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
        "receiptsRoot": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
        "transactionsRoot": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
        "transactions": transactions,
    })
}

#[tokio::test]
async fn test_get_block_hash_shape() -> Result<()> {
    let node = MockNode::default().respond(
        "eth_getBlockByNumber",
        raw_block(json!([TX_HASH])),
    );
    let client = op_client(node)?;

    let block = client
        .get_block(BlockSelector::Number(16628100), false)
        .await?;
    assert_eq!(block.number, Some(16628100));
    match block.transactions {
        BlockTransactions::Hashes(hashes) => {
            assert_eq!(hashes.len(), 1);
            assert_eq!(hashes[0].to_hex(), TX_HASH);
        }
        BlockTransactions::Full(_) => panic!("expected hash strings"),
    }
    Ok(())
}

#[tokio::test]
async fn test_get_block_full_shape_keeps_order() -> Result<()> {
    let node = MockNode::default().respond(
        "eth_getBlockByNumber",
        raw_block(json!([raw_deposit_tx(), raw_eip1559_tx()])),
    );
    let client = op_client(node)?;

    let block = client
        .get_block(BlockSelector::Number(16628100), true)
        .await?;
    match block.transactions {
        BlockTransactions::Full(txs) => {
            assert_eq!(txs.len(), 2);
            // node order preserved: deposit first, then the fee-market tx
            assert_eq!(txs[0].type_name(), "deposit");
            assert_eq!(txs[1].type_name(), "eip1559");
        }
        BlockTransactions::Hashes(_) => panic!("expected full transactions"),
    }
    Ok(())
}

#[tokio::test]
async fn test_get_transaction_by_block_and_index() -> Result<()> {
    let node = MockNode::default().respond(
        "eth_getTransactionByBlockNumberAndIndex",
        raw_deposit_tx(),
    );
    let client = op_client(node)?;

    let tx = client
        .get_transaction(TransactionSelector::BlockAndIndex {
            block: BlockSelector::Number(16628100),
            index: 0,
        })
        .await?;
    // the discriminant comes from the closed set; extension fields exist
    // only on the deposit variant
    match tx {
        Transaction::Deposit(tx) => {
            assert!(tx.is_system_tx);
            assert_eq!(tx.mint, Some(U256::zero()));
        }
        other => panic!("expected deposit, got {}", other.type_name()),
    }
    Ok(())
}

#[tokio::test]
async fn test_get_transaction_not_found() -> Result<()> {
    let node = MockNode::default().respond("eth_getTransactionByHash", Value::Null);
    let client = op_client(node)?;

    let err = client
        .get_transaction(TransactionSelector::Hash(TX_HASH.parse()?))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_receipt_l1_fee_on_op_chain() -> Result<()> {
    let node = MockNode::default().respond(
        "eth_getTransactionReceipt",
        json!({
            "transactionHash": TX_HASH,
            "transactionIndex": "0x1",
            "blockHash": "0xc350d807505fb835650f0013632c5515592987ba169bbc6626d9fc54d91f0f0b",
            "blockNumber": "0xfdb984",
            "from": "0xa1e4380a3b1f749673e270229993ee55f35663b4",
            "to": "0x5df9b87991262f6ba471f09758cde1c0fc1de734",
            "cumulativeGasUsed": "0x5208",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x342770c0",
            "status": "0x1",
            "type": "0x2",
            "logs": [],
            "l1Fee": "0x44585d4b7e",
            "l1GasPrice": "0x90a2657d",
            "l1GasUsed": "0x640",
            "l1FeeScalar": "0.684",
        }),
    );
    let client = op_client(node)?;

    let receipt = client.get_transaction_receipt(&TX_HASH.parse()?).await?;
    let l1 = receipt.l1.expect("op chain always attaches the L1 block");
    // decoded integers, never raw hex strings
    assert_eq!(l1.l1_fee, Some(U256::from(0x44585d4b7eu64)));
    assert_eq!(l1.l1_gas_price, Some(U256::from(0x90a2657du64)));
    assert_eq!(l1.l1_gas_used, Some(U256::from(0x640u64)));
    assert_eq!(l1.l1_fee_scalar, Some(0.684));
    Ok(())
}

#[tokio::test]
async fn test_quantity_reads() -> Result<()> {
    let node = MockNode::default()
        .respond("eth_blockNumber", json!("0xfdb984"))
        .respond("eth_chainId", json!("0xa"))
        .respond("eth_gasPrice", json!("0x342770c0"));
    let client = op_client(node)?;

    assert_eq!(client.get_block_number().await?, 16628100);
    assert_eq!(client.get_chain_id().await?, 10);
    assert_eq!(client.get_gas_price().await?, U256::from(0x342770c0u64));
    Ok(())
}

#[tokio::test]
async fn test_decode_failure_does_not_poison_the_client() -> Result<()> {
    let node = MockNode::default()
        // malformed quantity, then a healthy response
        .respond("eth_blockNumber", json!("not-hex"))
        .respond("eth_blockNumber", json!("0x10"));
    let client = op_client(node)?;

    assert!(client.get_block_number().await.is_err());
    // the shared registry/transport stays usable after a decode failure
    assert_eq!(client.get_block_number().await?, 16);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls_share_one_client() -> Result<()> {
    let client = test_client(MockNode::default())?;
    let account = ACCOUNT.parse()?;
    client.set_balance(&account, U256::from(7u64)).await?;

    let futures: Vec<_> = (0..16)
        .map(|_| {
            let client = client.clone();
            async move { client.get_balance(&ACCOUNT.parse().unwrap(), None).await }
        })
        .collect();
    for result in futures_util::future::join_all(futures).await {
        assert_eq!(result?, U256::from(7u64));
    }
    Ok(())
}

#[tokio::test]
async fn test_mutation_is_one_wire_call() -> Result<()> {
    let node = Arc::new(MockNode::default());
    let client = Client::builder()
        .chain(ChainDefinition::dev())
        .shared_transport(node.clone())
        .test_actions(TestNodeMode::Anvil)
        .build()?;
    let account = ACCOUNT.parse()?;

    client.set_balance(&account, U256::from(1u64)).await?;
    // exactly one dispatch, no hidden retries around a mutation
    assert_eq!(node.call_count(), 1);
    assert_eq!(node.calls.lock().unwrap()[0], "anvil_setBalance");
    Ok(())
}
