//! Post Office postage.
//!
//! A post office pays the BCH fee of a token transaction in exchange for a
//! token "stamp" payment. Its `/postage` endpoint publishes a `weight` (fee
//! satoshis one stamp covers) and a per-token stamp `rate`.
//!
//! [`build_postage_send`] sizes the postage for a payment and
//! [`PostOfficeClient`] keeps the current offers of a set of hosts.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use slp_script::{build_send_script, Script, TokenId};
use tracing::{debug, info, warn};

use crate::coin_chooser::{change_amount, pick, token_type};
use crate::config::{PostOfficeConfig, SelectionConfig};
use crate::error::WalletError;
use crate::types::SpendableTokenCoin;
use crate::wallet_view::WalletView;

/// SEND OP_RETURN output with three amounts (send, postage, change).
const SLP_OUTPUT_MAX_SIZE: i128 = 8 + 1 + 73;
/// SEND OP_RETURN output with two amounts.
const SLP_OUTPUT_MID_SIZE: i128 = SLP_OUTPUT_MAX_SIZE - 9;
/// SEND OP_RETURN output with one amount.
const SLP_OUTPUT_MIN_SIZE: i128 = SLP_OUTPUT_MID_SIZE - 9;
/// P2PKH output.
const OUTPUT_SIZE: i128 = 34;
/// ECDSA-signed P2PKH input.
const INPUT_SIZE: i128 = 149;
/// Version, input count, output count, lock time.
const TX_OVERHEAD: i128 = 4 + 1 + 1 + 4;
/// Satoshis per byte.
const FEE_RATE: i128 = 1;
/// Satoshis carried by each token output.
const DUST: i128 = 546;
/// Upper bound on stamps; offers with a tiny weight never cover the fee.
const MAX_STAMPS: u64 = 10_000;

/// One token a post office accepts, and its price per stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Accepted token.
    #[serde(rename = "tokenId")]
    pub token_id: TokenId,
    /// Token base units per stamp.
    pub rate: u64,
}

/// A post office's `/postage` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostageOffer {
    /// Fee satoshis covered by one stamp.
    pub weight: u64,
    /// Accepted tokens.
    #[serde(default)]
    pub stamps: Vec<Stamp>,
}

impl PostageOffer {
    /// Stamp rate for a token. The last listing wins if a token repeats.
    pub fn rate(&self, token_id: &TokenId) -> Option<u64> {
        self.stamps.iter().rev().find(|s| s.token_id == *token_id).map(|s| s.rate)
    }
}

/// Coins and SEND message paying a post office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostageQuote {
    /// Coins to spend.
    pub coins: Vec<SpendableTokenCoin>,
    /// Stamps bought.
    pub stamp_count: u64,
    /// Token postage paid to the post office.
    pub postage: u64,
    /// Token change returned to the wallet.
    pub change: u64,
    /// Declared SEND amounts.
    pub amounts: Vec<u64>,
    /// The SEND OP_RETURN.
    pub op_return: Script,
}

/// Size the postage for sending `send_amount` of `token_id` through a post
/// office, starting from zero stamps and re-selecting coins as the postage
/// grows until the stamps cover the fee and the dust of the extra outputs.
///
/// Declared amounts are `[send]`, `[send, postage]`, `[send, change]` or
/// `[send, postage, change]`.
pub fn build_postage_send(
    wallet: &dyn WalletView,
    config: &SelectionConfig,
    token_id: &TokenId,
    offer: &PostageOffer,
    send_amount: u64,
) -> Result<PostageQuote, WalletError> {
    let rate = offer.rate(token_id).ok_or(WalletError::NoPostage(*token_id))?;
    let weight = offer.weight as i128;

    let mut stamp_count: u64 = 0;
    loop {
        let postage = u64::try_from(rate as u128 * stamp_count as u128)
            .map_err(|_| WalletError::AmountOverflow(format!("postage of {stamp_count} stamps at rate {rate}")))?;
        let required = send_amount as u128 + postage as u128;
        let coins = pick(wallet, token_id, required, config)?;
        let total: u128 = coins.iter().map(|c| c.amount() as u128).sum();
        let change = change_amount(total, required)?;

        let (dust_outputs, slp_output_size) = match (postage > 0, change > 0) {
            (true, true) => (3, SLP_OUTPUT_MAX_SIZE),
            (false, false) => (1, SLP_OUTPUT_MIN_SIZE),
            _ => (2, SLP_OUTPUT_MID_SIZE),
        };
        let inputs = coins.len() as i128;
        let size = TX_OVERHEAD + INPUT_SIZE * inputs + OUTPUT_SIZE * dust_outputs + slp_output_size;
        let dust_diff = (dust_outputs - inputs) * DUST;
        let shortfall = size * FEE_RATE + dust_diff - stamp_count as i128 * weight;

        if shortfall <= 0 {
            let mut amounts = vec![send_amount];
            if postage > 0 {
                amounts.push(postage);
            }
            if change > 0 {
                amounts.push(change);
            }
            let op_return = build_send_script(token_type(wallet, token_id), *token_id, &amounts)?;
            debug!(token_id = %token_id, stamp_count, postage, change, "postage sized");
            return Ok(PostageQuote { coins, stamp_count, postage, change, amounts, op_return });
        }

        stamp_count += 1;
        if stamp_count > MAX_STAMPS {
            return Err(WalletError::PostOffice(format!(
                "postage for token {token_id} does not converge (weight {})",
                offer.weight
            )));
        }
    }
}

/// A host's stamp rate for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRate {
    /// Post office base URL.
    pub host: String,
    /// Token base units per stamp.
    pub rate: u64,
}

#[derive(Debug, Default)]
struct ClientState {
    offers: HashMap<String, PostageOffer>,
    rates: HashMap<TokenId, Vec<HostRate>>,
    banned: HashSet<String>,
}

/// Keeps the postage offers of a set of post offices.
#[derive(Debug)]
pub struct PostOfficeClient {
    config: PostOfficeConfig,
    client: reqwest::Client,
    state: Mutex<ClientState>,
}

impl PostOfficeClient {
    /// Create a client; nothing is fetched until [`update_all`](Self::update_all).
    pub fn new(config: PostOfficeConfig) -> Self {
        Self { config, client: reqwest::Client::new(), state: Mutex::new(ClientState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Configured hosts.
    pub fn hosts(&self) -> &[String] {
        &self.config.hosts
    }

    /// Fetch `<host>/postage`. An unparsable document drops the host's
    /// previous offer.
    pub async fn update(&self, host: &str) -> Result<PostageOffer, WalletError> {
        let url = format!("{}/postage", host.trim_end_matches('/'));
        let resp = self.client.get(&url).timeout(self.config.timeout()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WalletError::ServerError { status_code: status.as_u16(), message });
        }

        let body = resp.text().await?;
        let mut state = self.lock();
        match serde_json::from_str::<PostageOffer>(&body) {
            Ok(offer) => {
                debug!(host, stamps = offer.stamps.len(), weight = offer.weight, "postage updated");
                state.offers.insert(host.to_string(), offer.clone());
                state.rates = optimize_rates(&state.offers);
                Ok(offer)
            }
            Err(e) => {
                state.offers.remove(host);
                state.rates = optimize_rates(&state.offers);
                Err(WalletError::PostOffice(format!("bad postage document from {host}: {e}")))
            }
        }
    }

    /// Refresh every configured host that is not banned. Failures are
    /// logged; returns the number of hosts that answered.
    pub async fn update_all(&self) -> usize {
        let mut updated = 0;
        for host in &self.config.hosts {
            if self.is_banned(host) {
                continue;
            }
            match self.update(host).await {
                Ok(_) => updated += 1,
                Err(e) => warn!(host = %host, error = %e, "postage update failed"),
            }
        }
        info!(updated, hosts = self.config.hosts.len(), "post office offers refreshed");
        updated
    }

    /// The offer last fetched from `host`.
    pub fn offer(&self, host: &str) -> Option<PostageOffer> {
        self.lock().offers.get(host).cloned()
    }

    /// Every host's rate for `token_id`, cheapest first.
    pub fn rates(&self, token_id: &TokenId) -> Vec<HostRate> {
        self.lock().rates.get(token_id).cloned().unwrap_or_default()
    }

    /// The cheapest allowed host for `token_id` and its offer.
    pub fn best_offer(&self, token_id: &TokenId) -> Option<(String, PostageOffer)> {
        let state = self.lock();
        state
            .rates
            .get(token_id)?
            .iter()
            .filter(|r| !state.banned.contains(&r.host))
            .find_map(|r| state.offers.get(&r.host).map(|o| (r.host.clone(), o.clone())))
    }

    /// Stop using a host.
    pub fn ban(&self, host: &str) {
        if self.lock().banned.insert(host.to_string()) {
            info!(host, "post office banned");
        }
    }

    /// Use a banned host again.
    pub fn allow(&self, host: &str) {
        self.lock().banned.remove(host);
    }

    /// True if `host` is banned.
    pub fn is_banned(&self, host: &str) -> bool {
        self.lock().banned.contains(host)
    }
}

/// Per-token rates across hosts, cheapest first.
fn optimize_rates(offers: &HashMap<String, PostageOffer>) -> HashMap<TokenId, Vec<HostRate>> {
    let mut rates: HashMap<TokenId, Vec<HostRate>> = HashMap::new();
    for (host, offer) in offers {
        for stamp in &offer.stamps {
            rates.entry(stamp.token_id).or_default().push(HostRate { host: host.clone(), rate: stamp.rate });
        }
    }
    for list in rates.values_mut() {
        list.sort_by(|a, b| a.rate.cmp(&b.rate).then_with(|| a.host.cmp(&b.host)));
    }
    rates
}
