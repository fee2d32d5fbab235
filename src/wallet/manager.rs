//! Wallet balances, allowances and on-chain approval setup

use super::contracts::{
    decode_bool, decode_uint, IConditionalTokens, IERC20, CONDITIONAL_TOKENS_ADDRESS,
    CONDITIONAL_TOKEN_DECIMALS, CTF_EXCHANGE_ADDRESS, EXCHANGE_SPENDERS, MIN_USDC_ALLOWANCE,
    NEG_RISK_CTF_EXCHANGE_ADDRESS, POL_DECIMALS, USDC_ADDRESS, USDC_DECIMALS,
};
use super::retry::{RpcRetryPolicy, Sleeper};
use super::rpc::ChainRpc;
use super::submitter::{SubmitterSettings, TransactionSubmitter};
use crate::config::{ApprovalPacing, Config};
use crate::error::{Error, Result};
use crate::types::{ExchangeApprovals, WalletStatus};
use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Which asset an approval covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApprovalAsset {
    /// ERC-20 allowance on USDC
    Usdc,
    /// ERC-1155 approval-for-all on Conditional Tokens
    ConditionalTokens,
}

impl fmt::Display for ApprovalAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalAsset::Usdc => f.write_str("USDC"),
            ApprovalAsset::ConditionalTokens => f.write_str("ERC1155"),
        }
    }
}

/// (spender label, asset) -> approval is sufficient
pub type ApprovalState = BTreeMap<(&'static str, ApprovalAsset), bool>;

/// One approval transaction sent by [`WalletManager::ensure_approvals`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedApproval {
    pub spender: &'static str,
    pub asset: ApprovalAsset,
    pub tx_hash: String,
}

/// On-chain wallet view plus the approval reconciler
pub struct WalletManager<R> {
    rpc: Arc<R>,
    sleeper: Arc<dyn Sleeper>,
    owner: Address,
    retry: RpcRetryPolicy,
    pacing: ApprovalPacing,
    submitter: TransactionSubmitter<R>,
}

impl<R: ChainRpc> WalletManager<R> {
    pub fn new(config: &Config, rpc: Arc<R>, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let owner = Address::from_str(config.wallet_address.trim()).map_err(|e| {
            Error::Config(format!("POLY_WALLET_ADDRESS is not an address: {}", e))
        })?;

        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .map_err(|e| Error::Wallet(format!("Failed to parse private key: {}", e)))?;

        if signer.address() != owner {
            return Err(Error::Wallet(format!(
                "POLY_PRIVATE_KEY belongs to {:?}, not the configured wallet {:?}",
                signer.address(),
                owner
            )));
        }

        let settings = SubmitterSettings {
            pacing: config.approval_pacing.between_rpc_calls,
            ..SubmitterSettings::default()
        };
        let submitter = TransactionSubmitter::new(
            rpc.clone(),
            sleeper.clone(),
            signer,
            config.chain_id,
            settings,
        );

        Ok(Self {
            rpc,
            sleeper,
            owner,
            retry: settings.retry,
            pacing: config.approval_pacing,
            submitter,
        })
    }

    pub fn address(&self) -> Address {
        self.owner
    }

    pub fn submitter(&self) -> &TransactionSubmitter<R> {
        &self.submitter
    }

    async fn eth_call(&self, label: &str, to: Address, data: Vec<u8>) -> Result<Bytes> {
        let rpc = &*self.rpc;
        let data = Bytes::from(data);
        self.retry
            .run(&*self.sleeper, label, || rpc.call(to, data.clone()))
            .await
    }

    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            self.sleeper.sleep(duration).await;
        }
    }

    /// Native POL balance
    pub async fn pol_balance(&self) -> Result<Decimal> {
        let rpc = &*self.rpc;
        let owner = self.owner;
        let wei = self
            .retry
            .run(&*self.sleeper, "eth_getBalance", || rpc.balance(owner))
            .await?;
        Ok(to_decimal(wei, POL_DECIMALS))
    }

    pub async fn usdc_balance(&self) -> Result<Decimal> {
        let data = IERC20::balanceOfCall { account: self.owner }.abi_encode();
        let ret = self.eth_call("USDC.balanceOf", USDC_ADDRESS, data).await?;
        Ok(to_decimal(decode_uint(&ret)?, USDC_DECIMALS))
    }

    /// Raw USDC allowance (6 decimals) granted to `spender`
    pub async fn usdc_allowance(&self, spender: Address) -> Result<U256> {
        let data = IERC20::allowanceCall {
            owner: self.owner,
            spender,
        }
        .abi_encode();
        let ret = self.eth_call("USDC.allowance", USDC_ADDRESS, data).await?;
        decode_uint(&ret)
    }

    /// ERC-1155 outcome token balance; `token_id` is the decimal CLOB id
    pub async fn conditional_token_balance(&self, token_id: &str) -> Result<Decimal> {
        let id = U256::from_str_radix(token_id.trim(), 10)
            .map_err(|e| Error::Wallet(format!("Invalid token id {}: {}", token_id, e)))?;
        let data = IConditionalTokens::balanceOfCall {
            account: self.owner,
            id,
        }
        .abi_encode();
        let ret = self
            .eth_call("ConditionalTokens.balanceOf", CONDITIONAL_TOKENS_ADDRESS, data)
            .await?;
        Ok(to_decimal(decode_uint(&ret)?, CONDITIONAL_TOKEN_DECIMALS))
    }

    pub async fn is_approved_for_all(&self, operator: Address) -> Result<bool> {
        let data = IConditionalTokens::isApprovedForAllCall {
            account: self.owner,
            operator,
        }
        .abi_encode();
        let ret = self
            .eth_call("ConditionalTokens.isApprovedForAll", CONDITIONAL_TOKENS_ADDRESS, data)
            .await?;
        decode_bool(&ret)
    }

    /// Approval-for-all flags for the two exchanges
    pub async fn exchange_approvals(&self) -> Result<ExchangeApprovals> {
        Ok(ExchangeApprovals {
            ctf_exchange: self.is_approved_for_all(CTF_EXCHANGE_ADDRESS).await?,
            neg_risk_ctf_exchange: self
                .is_approved_for_all(NEG_RISK_CTF_EXCHANGE_ADDRESS)
                .await?,
        })
    }

    pub async fn status(&self) -> Result<WalletStatus> {
        let pol_balance = self.pol_balance().await?;
        let usdc_balance = self.usdc_balance().await?;
        let approvals = self.exchange_approvals().await?;

        Ok(WalletStatus {
            address: format!("{:?}", self.owner),
            pol_balance,
            usdc_balance,
            approvals,
        })
    }

    /// Full required-vs-current approval table, read-only
    pub async fn approval_state(&self) -> Result<ApprovalState> {
        let mut state = ApprovalState::new();
        for (label, spender) in EXCHANGE_SPENDERS {
            let allowance = self.usdc_allowance(spender).await?;
            state.insert((label, ApprovalAsset::Usdc), allowance >= min_allowance());
            self.pause(self.pacing.after_read).await;

            let approved = self.is_approved_for_all(spender).await?;
            state.insert((label, ApprovalAsset::ConditionalTokens), approved);
            self.pause(self.pacing.after_read).await;
        }
        Ok(state)
    }

    /// Approve `spender` for the maximum USDC amount
    pub async fn approve_usdc(&self, spender: Address) -> Result<String> {
        let data = IERC20::approveCall {
            spender,
            amount: U256::MAX,
        }
        .abi_encode();
        info!("Approving USDC for {:?}...", spender);
        self.submitter.submit(USDC_ADDRESS, data).await
    }

    pub async fn approve_conditional_tokens(&self, operator: Address) -> Result<String> {
        let data = IConditionalTokens::setApprovalForAllCall {
            operator,
            approved: true,
        }
        .abi_encode();
        info!("Approving conditional tokens for {:?}...", operator);
        self.submitter.submit(CONDITIONAL_TOKENS_ADDRESS, data).await
    }

    /// Bring every trading approval up to date.
    ///
    /// USDC allowances first, then ERC-1155 approvals; one transaction at a
    /// time, each confirmed before the next. Already-sufficient approvals are
    /// skipped, so a fully approved wallet sends nothing.
    pub async fn ensure_approvals(&self) -> Result<Vec<SubmittedApproval>> {
        let mut submitted = Vec::new();

        let exchanges = self.exchange_approvals().await?;
        debug!("Exchange approvals: {:?}", exchanges);
        self.pause(self.pacing.after_read).await;

        for (label, spender) in EXCHANGE_SPENDERS {
            let allowance = self.usdc_allowance(spender).await?;
            self.pause(self.pacing.after_read).await;

            if allowance < min_allowance() {
                info!("Setting USDC approval for {}", label);
                let tx_hash = self.approve_usdc(spender).await?;
                submitted.push(SubmittedApproval {
                    spender: label,
                    asset: ApprovalAsset::Usdc,
                    tx_hash,
                });
                self.pause(self.pacing.after_write).await;
            }
        }

        // Flags read at the start still hold: the USDC pass only touches allowances
        for (label, operator) in EXCHANGE_SPENDERS {
            let approved = if operator == CTF_EXCHANGE_ADDRESS {
                exchanges.ctf_exchange
            } else if operator == NEG_RISK_CTF_EXCHANGE_ADDRESS {
                exchanges.neg_risk_ctf_exchange
            } else {
                self.is_approved_for_all(operator).await?
            };

            if !approved {
                info!("Setting ERC1155 approval for {}", label);
                let tx_hash = self.approve_conditional_tokens(operator).await?;
                submitted.push(SubmittedApproval {
                    spender: label,
                    asset: ApprovalAsset::ConditionalTokens,
                    tx_hash,
                });
                self.pause(self.pacing.after_write).await;
            }
        }

        if submitted.is_empty() {
            info!("All approvals already in place");
        } else {
            info!("All approvals set up ({} transactions)", submitted.len());
        }
        Ok(submitted)
    }
}

/// Allowance threshold in raw USDC units
fn min_allowance() -> U256 {
    U256::from(MIN_USDC_ALLOWANCE) * U256::from(10u64.pow(USDC_DECIMALS))
}

/// Scale a raw integer amount down by `decimals`. Saturates at
/// `Decimal::MAX` for values beyond its range (e.g. unlimited allowances).
pub fn to_decimal(raw: U256, decimals: u32) -> Decimal {
    let scale = Decimal::from(10u64.pow(decimals));
    match Decimal::from_str(&raw.to_string()) {
        Ok(value) => value / scale,
        Err(_) => Decimal::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::retry::tests::RecordingSleeper;
    use crate::wallet::submitter::tests::{receipt, FakeRpc};
    use rust_decimal_macros::dec;

    fn word(v: U256) -> Bytes {
        Bytes::from(v.to_be_bytes::<32>().to_vec())
    }

    fn test_config(signer: &PrivateKeySigner) -> Config {
        let key = format!("0x{}", hex::encode(signer.to_bytes()));
        let address = format!("{:?}", signer.address());
        Config::from_vars(|name| match name {
            "POLY_PRIVATE_KEY" => Some(key.clone()),
            "POLY_WALLET_ADDRESS" => Some(address.clone()),
            "POLY_APPROVAL_PACING_SECS" => Some("0".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn set_allowance(rpc: &FakeRpc, owner: Address, spender: Address, value: U256) {
        let data = IERC20::allowanceCall { owner, spender }.abi_encode();
        rpc.calls
            .lock()
            .unwrap()
            .insert((USDC_ADDRESS, data), word(value));
    }

    fn set_approved(rpc: &FakeRpc, owner: Address, operator: Address, approved: bool) {
        let data = IConditionalTokens::isApprovedForAllCall {
            account: owner,
            operator,
        }
        .abi_encode();
        rpc.calls
            .lock()
            .unwrap()
            .insert((CONDITIONAL_TOKENS_ADDRESS, data), word(U256::from(approved as u8)));
    }

    fn manager_with(rpc: Arc<FakeRpc>) -> (WalletManager<FakeRpc>, Arc<RecordingSleeper>) {
        let signer = PrivateKeySigner::random();
        let sleeper = Arc::new(RecordingSleeper::default());
        let manager = WalletManager::new(&test_config(&signer), rpc, sleeper.clone()).unwrap();
        (manager, sleeper)
    }

    #[tokio::test]
    async fn test_fully_approved_wallet_sends_nothing() {
        let rpc = Arc::new(FakeRpc::default());
        let (manager, _) = manager_with(rpc.clone());
        let owner = manager.address();

        for (_, spender) in EXCHANGE_SPENDERS {
            set_allowance(&rpc, owner, spender, U256::MAX);
            set_approved(&rpc, owner, spender, true);
        }

        let submitted = manager.ensure_approvals().await.unwrap();
        assert!(submitted.is_empty());
        assert_eq!(rpc.sent_count(), 0);

        // Second run is just as quiet
        assert!(manager.ensure_approvals().await.unwrap().is_empty());
        assert_eq!(rpc.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_only_missing_approvals_are_sent() {
        let rpc = Arc::new(FakeRpc::default());
        rpc.receipts
            .lock()
            .unwrap()
            .extend([Ok(Some(receipt(1))), Ok(Some(receipt(1)))]);
        let (manager, _) = manager_with(rpc.clone());
        let owner = manager.address();

        for (_, spender) in EXCHANGE_SPENDERS {
            set_allowance(&rpc, owner, spender, U256::MAX);
            set_approved(&rpc, owner, spender, true);
        }
        // 999 USDC is below the threshold
        set_allowance(&rpc, owner, EXCHANGE_SPENDERS[2].1, U256::from(999_000_000u64));
        set_approved(&rpc, owner, CTF_EXCHANGE_ADDRESS, false);

        let submitted = manager.ensure_approvals().await.unwrap();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].spender, "Neg Risk Adapter");
        assert_eq!(submitted[0].asset, ApprovalAsset::Usdc);
        assert_eq!(submitted[1].spender, "CTF Exchange");
        assert_eq!(submitted[1].asset, ApprovalAsset::ConditionalTokens);
        assert_eq!(rpc.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_fresh_wallet_needs_six_approvals() {
        let rpc = Arc::new(FakeRpc::default());
        rpc.receipts
            .lock()
            .unwrap()
            .extend((0..6).map(|_| Ok(Some(receipt(1)))));
        let (manager, sleeper) = manager_with(rpc.clone());

        // Unset calls answer with a zero word: no allowance, not approved
        let submitted = manager.ensure_approvals().await.unwrap();
        assert_eq!(submitted.len(), 6);
        assert_eq!(rpc.sent_count(), 6);

        // Zero pacing: only receipt poll intervals were slept
        assert!(sleeper
            .recorded()
            .iter()
            .all(|d| *d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_failed_approval_stops_reconciliation() {
        let rpc = Arc::new(FakeRpc::default());
        rpc.receipts.lock().unwrap().push_back(Ok(Some(receipt(0))));
        let (manager, _) = manager_with(rpc.clone());

        let err = manager.ensure_approvals().await.unwrap_err();
        assert!(err.to_string().contains("Transaction failed"));
        assert_eq!(rpc.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_status_and_balances() {
        let mut fake = FakeRpc::default();
        fake.balance = U256::from(1_500_000_000_000_000_000u128);
        let rpc = Arc::new(fake);
        let (manager, _) = manager_with(rpc.clone());
        let owner = manager.address();

        let data = IERC20::balanceOfCall { account: owner }.abi_encode();
        rpc.calls
            .lock()
            .unwrap()
            .insert((USDC_ADDRESS, data), word(U256::from(25_500_000u64)));
        set_approved(&rpc, owner, CTF_EXCHANGE_ADDRESS, true);

        let status = manager.status().await.unwrap();
        assert_eq!(status.pol_balance, dec!(1.5));
        assert_eq!(status.usdc_balance, dec!(25.5));
        assert!(status.approvals.ctf_exchange);
        assert!(!status.approvals.neg_risk_ctf_exchange);
        assert_eq!(status.address, format!("{:?}", owner));
    }

    #[tokio::test]
    async fn test_approval_state_table() {
        let rpc = Arc::new(FakeRpc::default());
        let (manager, _) = manager_with(rpc.clone());
        let owner = manager.address();
        set_allowance(&rpc, owner, CTF_EXCHANGE_ADDRESS, U256::from(1_000_000_000u64));

        let state = manager.approval_state().await.unwrap();
        assert_eq!(state.len(), 6);
        assert_eq!(state[&("CTF Exchange", ApprovalAsset::Usdc)], true);
        assert_eq!(state[&("Neg Risk Adapter", ApprovalAsset::Usdc)], false);
        assert_eq!(state[&("CTF Exchange", ApprovalAsset::ConditionalTokens)], false);
    }

    #[tokio::test]
    async fn test_conditional_token_balance_rejects_bad_id() {
        let rpc = Arc::new(FakeRpc::default());
        let (manager, _) = manager_with(rpc);
        assert!(manager.conditional_token_balance("not-a-number").await.is_err());
        assert_eq!(
            manager.conditional_token_balance("12345").await.unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_to_decimal_scaling() {
        assert_eq!(to_decimal(U256::from(1_234_567u64), 6), dec!(1.234567));
        assert_eq!(to_decimal(U256::MAX, 6), Decimal::MAX);
    }

    #[test]
    fn test_invalid_wallet_address_is_config_error() {
        let signer = PrivateKeySigner::random();
        let mut config = test_config(&signer);
        config.wallet_address = "not-an-address".to_string();

        let result = WalletManager::new(
            &config,
            Arc::new(FakeRpc::default()),
            Arc::new(RecordingSleeper::default()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_key_for_another_wallet_is_rejected() {
        let signer = PrivateKeySigner::random();
        let other = PrivateKeySigner::random();
        let mut config = test_config(&signer);
        config.wallet_address = format!("{:?}", other.address());

        let rpc = Arc::new(FakeRpc::default());
        let result = WalletManager::new(&config, rpc.clone(), Arc::new(RecordingSleeper::default()));
        match result {
            Err(Error::Wallet(msg)) => assert!(msg.contains("not the configured wallet")),
            Err(e) => panic!("expected wallet error, got {:?}", e),
            Ok(_) => panic!("mismatched key accepted"),
        }
        assert_eq!(rpc.sent_count(), 0);

        // Case of the configured address doesn't matter
        config.wallet_address = format!("{:?}", signer.address()).to_lowercase();
        assert!(WalletManager::new(&config, rpc, Arc::new(RecordingSleeper::default())).is_ok());
    }
}
