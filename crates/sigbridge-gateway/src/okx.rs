//! OKX v5 REST adapter for USDT-margined perpetual swaps.
//!
//! # Signing
//!
//! Private endpoints carry four headers:
//! - `OK-ACCESS-KEY`: API key
//! - `OK-ACCESS-SIGN`: `base64(HMAC-SHA256(secret, timestamp + METHOD + path + body))`
//! - `OK-ACCESS-TIMESTAMP`: ISO-8601 UTC with milliseconds
//! - `OK-ACCESS-PASSPHRASE`: API passphrase
//!
//! `path` includes the query string for GET requests. Demo trading adds
//! `x-simulated-trading: 1`.
//!
//! # Leverage
//!
//! OKX does not take leverage on the order itself. Before the first opening
//! order per (symbol, margin mode), and whenever the requested leverage
//! differs from what was last applied, `set-leverage` is called first.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sigbridge_core::{
    ClientOrderId, MarginMode, OrderRequest, OrderResult, Position, Price, Symbol,
};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{GatewayError, GatewayResult};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";

const MARK_PRICE_PATH: &str = "/api/v5/public/mark-price";
const POSITIONS_PATH: &str = "/api/v5/account/positions";
const ORDER_PATH: &str = "/api/v5/trade/order";
const SET_LEVERAGE_PATH: &str = "/api/v5/account/set-leverage";

/// API credentials. Secret material is zeroized on drop and never printed.
pub struct OkxCredentials {
    api_key: String,
    secret: Zeroizing<String>,
    passphrase: Zeroizing<String>,
}

impl OkxCredentials {
    pub fn new(api_key: String, secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret: Zeroizing::new(secret),
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl fmt::Debug for OkxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkxCredentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OkxConfig {
    pub base_url: String,
    /// Demo trading (`x-simulated-trading: 1`).
    pub simulated: bool,
    /// HTTP-level timeout; the gateway applies its own bound on top.
    pub http_timeout: Duration,
}

impl Default for OkxConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            simulated: false,
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Response envelope shared by all v5 endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPriceEntry {
    inst_id: String,
    mark_px: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionEntry {
    inst_id: String,
    #[serde(default)]
    pos: String,
    /// `net` in one-way mode, `long`/`short` in hedge mode.
    #[serde(default)]
    pos_side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    #[serde(default)]
    ord_id: String,
    #[serde(default)]
    cl_ord_id: String,
    #[serde(default)]
    s_code: String,
    #[serde(default)]
    s_msg: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody<'a> {
    inst_id: &'a str,
    td_mode: &'a str,
    side: &'a str,
    ord_type: &'a str,
    sz: String,
    reduce_only: bool,
    cl_ord_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetLeverageBody<'a> {
    inst_id: &'a str,
    lever: String,
    mgn_mode: &'a str,
}

pub struct OkxClient {
    http: Client,
    config: OkxConfig,
    credentials: OkxCredentials,
    /// Leverage last applied per (symbol, margin mode).
    applied_leverage: DashMap<(Symbol, MarginMode), u32>,
}

impl OkxClient {
    pub fn new(config: OkxConfig, credentials: OkxCredentials) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| GatewayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        if config.simulated {
            info!(base_url = %config.base_url, "OKX client in DEMO (simulated trading) mode");
        } else {
            info!(base_url = %config.base_url, "OKX client in LIVE trading mode");
        }

        Ok(Self {
            http,
            config,
            credentials,
            applied_leverage: DashMap::new(),
        })
    }

    fn timestamp() -> String {
        chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    async fn public_get<T: DeserializeOwned>(&self, path_and_query: &str) -> GatewayResult<Vec<T>> {
        let url = format!("{}{}", self.config.base_url, path_and_query);
        let mut req = self.http.get(&url);
        if self.config.simulated {
            req = req.header("x-simulated-trading", "1");
        }
        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("HTTP request failed: {e}")))?;
        Self::read_envelope(response).await
    }

    async fn private<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<String>,
    ) -> GatewayResult<Vec<T>> {
        let body = body.unwrap_or_default();
        let timestamp = Self::timestamp();
        let signature = sign_request(
            &self.credentials.secret,
            &timestamp,
            method.as_str(),
            path_and_query,
            &body,
        )?;

        let url = format!("{}{}", self.config.base_url, path_and_query);
        let mut req = self
            .http
            .request(method, &url)
            .header("OK-ACCESS-KEY", &self.credentials.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", self.credentials.passphrase.as_str())
            .header("Content-Type", "application/json");
        if self.config.simulated {
            req = req.header("x-simulated-trading", "1");
        }
        if !body.is_empty() {
            req = req.body(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("HTTP request failed: {e}")))?;
        Self::read_envelope(response).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> GatewayResult<Vec<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            // OKX still returns an envelope on most 4xx responses.
            if let Ok(env) = serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
                return Err(GatewayError::Rejected {
                    code: env.code,
                    msg: env.msg,
                });
            }
            return Err(GatewayError::HttpClient(format!("HTTP {status}: {body}")));
        }

        parse_envelope(&body)
    }

    async fn ensure_leverage(&self, order: &OrderRequest) -> GatewayResult<()> {
        let key = (order.symbol.clone(), order.margin_mode);
        if self.applied_leverage.get(&key).map(|v| *v) == Some(order.leverage) {
            return Ok(());
        }

        let body = serde_json::to_string(&SetLeverageBody {
            inst_id: order.symbol.as_str(),
            lever: order.leverage.to_string(),
            mgn_mode: order.margin_mode.as_str(),
        })?;
        let _: Vec<serde_json::Value> = self
            .private(Method::POST, SET_LEVERAGE_PATH, Some(body))
            .await?;

        info!(
            symbol = %order.symbol,
            leverage = order.leverage,
            margin_mode = %order.margin_mode,
            "Leverage applied"
        );
        self.applied_leverage.insert(key, order.leverage);
        Ok(())
    }
}

impl ExchangeClient for OkxClient {
    fn name(&self) -> &'static str {
        "okx"
    }

    fn get_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, GatewayResult<Price>> {
        Box::pin(async move {
            let path = format!("{MARK_PRICE_PATH}?instType=SWAP&instId={symbol}");
            let entries: Vec<MarkPriceEntry> = self.public_get(&path).await?;
            mark_price_from(symbol, &entries)
        })
    }

    fn get_position<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, GatewayResult<Position>> {
        Box::pin(async move {
            let path = format!("{POSITIONS_PATH}?instType=SWAP&instId={symbol}");
            let entries: Vec<PositionEntry> = self.private(Method::GET, &path, None).await?;
            position_from(symbol, &entries)
        })
    }

    fn submit_order<'a>(
        &'a self,
        order: &'a OrderRequest,
    ) -> BoxFuture<'a, GatewayResult<OrderResult>> {
        Box::pin(async move {
            if !order.reduce_only {
                self.ensure_leverage(order).await?;
            }

            let body = serde_json::to_string(&order_body(order))?;
            debug!(body = %body, "Submitting OKX order");

            let acks: Vec<OrderAck> = self.private(Method::POST, ORDER_PATH, Some(body)).await?;
            order_result_from(acks)
        })
    }
}

/// `base64(HMAC-SHA256(secret, timestamp + method + path + body))`.
pub fn sign_request(
    secret: &str,
    timestamp: &str,
    method: &str,
    path_and_query: &str,
    body: &str,
) -> GatewayResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Auth(format!("HMAC key error: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.to_uppercase().as_bytes());
    mac.update(path_and_query.as_bytes());
    mac.update(body.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn parse_envelope<T: DeserializeOwned>(body: &str) -> GatewayResult<Vec<T>> {
    let env: Envelope<serde_json::Value> = serde_json::from_str(body)?;
    if env.code != "0" {
        // Order endpoints put the real reason in data[0].sMsg.
        let detail = env
            .data
            .first()
            .and_then(|d| d.get("sMsg"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        return Err(GatewayError::Rejected {
            code: env.code,
            msg: detail.unwrap_or(env.msg),
        });
    }
    env.data
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(GatewayError::from))
        .collect()
}

fn mark_price_from(symbol: &Symbol, entries: &[MarkPriceEntry]) -> GatewayResult<Price> {
    let entry = entries
        .iter()
        .find(|e| e.inst_id == symbol.as_str())
        .ok_or_else(|| GatewayError::MarketData {
            symbol: symbol.clone(),
            reason: "unknown symbol (no mark price)".to_string(),
        })?;
    entry
        .mark_px
        .parse::<Price>()
        .map_err(|e| GatewayError::Decode(format!("markPx {:?}: {e}", entry.mark_px)))
}

fn position_from(symbol: &Symbol, entries: &[PositionEntry]) -> GatewayResult<Position> {
    for entry in entries.iter().filter(|e| e.inst_id == symbol.as_str()) {
        if entry.pos.is_empty() {
            continue;
        }
        let pos: Decimal = entry
            .pos
            .parse()
            .map_err(|e| GatewayError::Decode(format!("pos {:?}: {e}", entry.pos)))?;
        if pos.is_zero() {
            continue;
        }
        let signed = match entry.pos_side.as_str() {
            "long" => pos.abs(),
            "short" => -pos.abs(),
            "net" | "" => pos,
            other => {
                warn!(pos_side = other, "Unknown posSide, treating pos as net");
                pos
            }
        };
        return Ok(Position::from_signed(signed));
    }
    Ok(Position::flat())
}

fn order_body(order: &OrderRequest) -> OrderBody<'_> {
    OrderBody {
        inst_id: order.symbol.as_str(),
        td_mode: order.margin_mode.as_str(),
        side: order.side.as_str(),
        ord_type: "market",
        sz: order.quantity.to_string(),
        reduce_only: order.reduce_only,
        cl_ord_id: order.client_order_id.as_str(),
    }
}

fn order_result_from(acks: Vec<OrderAck>) -> GatewayResult<OrderResult> {
    let ack = acks
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Decode("order response has no data".to_string()))?;
    if !ack.s_code.is_empty() && ack.s_code != "0" {
        return Err(GatewayError::Rejected {
            code: ack.s_code,
            msg: ack.s_msg,
        });
    }
    if ack.ord_id.is_empty() {
        return Err(GatewayError::Decode("order accepted without ordId".to_string()));
    }
    Ok(OrderResult::Submitted {
        order_id: ack.ord_id,
        client_order_id: ClientOrderId::from_string(ack.cl_ord_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sigbridge_core::{OrderSide, PositionSide, Size};

    fn eth() -> Symbol {
        Symbol::new("ETH-USDT-SWAP").unwrap()
    }

    #[test]
    fn test_sign_get_with_query() {
        let sig = sign_request(
            "test-secret",
            "2024-01-02T03:04:05.678Z",
            "GET",
            "/api/v5/account/positions?instType=SWAP&instId=ETH-USDT-SWAP",
            "",
        )
        .unwrap();
        assert_eq!(sig, "695dZjmOBF8DkV9pFEVg/iwyEhXtr0K6D9sRXRKBvYo=");
    }

    #[test]
    fn test_sign_post_with_body() {
        let sig = sign_request(
            "test-secret",
            "2024-01-02T03:04:05.678Z",
            "POST",
            "/api/v5/account/set-leverage",
            r#"{"instId":"ETH-USDT-SWAP","lever":"10","mgnMode":"cross"}"#,
        )
        .unwrap();
        assert_eq!(sig, "KgYEWWFnwk9/OZ2JkKfAFHD1XlO19arvbLMFjeEm5go=");
    }

    #[test]
    fn test_set_leverage_body_matches_signed_form() {
        let body = serde_json::to_string(&SetLeverageBody {
            inst_id: "ETH-USDT-SWAP",
            lever: "10".to_string(),
            mgn_mode: "cross",
        })
        .unwrap();
        assert_eq!(body, r#"{"instId":"ETH-USDT-SWAP","lever":"10","mgnMode":"cross"}"#);
    }

    #[test]
    fn test_parse_mark_price() {
        let body = r#"{"code":"0","msg":"","data":[{"instId":"ETH-USDT-SWAP","instType":"SWAP","markPx":"2001.5","ts":"1700000000000"}]}"#;
        let entries: Vec<MarkPriceEntry> = parse_envelope(body).unwrap();
        assert_eq!(mark_price_from(&eth(), &entries).unwrap(), Price::new(dec!(2001.5)));
    }

    #[test]
    fn test_parse_mark_price_unknown_symbol() {
        let body = r#"{"code":"0","msg":"","data":[]}"#;
        let entries: Vec<MarkPriceEntry> = parse_envelope(body).unwrap();
        assert!(matches!(
            mark_price_from(&eth(), &entries),
            Err(GatewayError::MarketData { .. })
        ));
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"code":"51001","msg":"Instrument ID does not exist","data":[]}"#;
        let err = parse_envelope::<MarkPriceEntry>(body).unwrap_err();
        match err {
            GatewayError::Rejected { code, msg } => {
                assert_eq!(code, "51001");
                assert!(msg.contains("does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_position_net_mode() {
        let body = r#"{"code":"0","msg":"","data":[{"instId":"ETH-USDT-SWAP","pos":"-0.75","posSide":"net","mgnMode":"cross"}]}"#;
        let entries: Vec<PositionEntry> = parse_envelope(body).unwrap();
        let position = position_from(&eth(), &entries).unwrap();
        assert_eq!(position.side(), PositionSide::Short);
        assert_eq!(position.size().inner(), dec!(0.75));
    }

    #[test]
    fn test_position_hedge_mode_skips_empty_leg() {
        let body = r#"{"code":"0","msg":"","data":[
            {"instId":"ETH-USDT-SWAP","pos":"0","posSide":"short"},
            {"instId":"ETH-USDT-SWAP","pos":"1.2","posSide":"long"}
        ]}"#;
        let entries: Vec<PositionEntry> = parse_envelope(body).unwrap();
        let position = position_from(&eth(), &entries).unwrap();
        assert_eq!(position.side(), PositionSide::Long);
        assert_eq!(position.size().inner(), dec!(1.2));
    }

    #[test]
    fn test_position_none_is_flat() {
        let body = r#"{"code":"0","msg":"","data":[{"instId":"BTC-USDT-SWAP","pos":"3","posSide":"net"}]}"#;
        let entries: Vec<PositionEntry> = parse_envelope(body).unwrap();
        assert!(position_from(&eth(), &entries).unwrap().is_flat());
    }

    #[test]
    fn test_order_body_serialization() {
        let order = OrderRequest::close(
            eth(),
            OrderSide::Sell,
            Size::new(dec!(0.0250)),
            10,
            MarginMode::Cross,
        );
        let json: serde_json::Value = serde_json::to_value(order_body(&order)).unwrap();
        assert_eq!(json["instId"], "ETH-USDT-SWAP");
        assert_eq!(json["tdMode"], "cross");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["ordType"], "market");
        assert_eq!(json["sz"], "0.025");
        assert_eq!(json["reduceOnly"], true);
        assert_eq!(json["clOrdId"], order.client_order_id.as_str());
    }

    #[test]
    fn test_order_rejected_by_s_code() {
        let body = r#"{"code":"1","msg":"Operation failed.","data":[{"ordId":"","clOrdId":"sb1","sCode":"51008","sMsg":"Insufficient margin"}]}"#;
        let err = parse_envelope::<OrderAck>(body).unwrap_err();
        match err {
            GatewayError::Rejected { code, msg } => {
                assert_eq!(code, "1");
                assert_eq!(msg, "Insufficient margin");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_order_accepted() {
        let body = r#"{"code":"0","msg":"","data":[{"ordId":"312269865356374016","clOrdId":"sb1","sCode":"0","sMsg":""}]}"#;
        let acks: Vec<OrderAck> = parse_envelope(body).unwrap();
        let result = order_result_from(acks).unwrap();
        assert_eq!(result.order_id(), Some("312269865356374016"));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = OkxCredentials::new("key".into(), "very-secret".into(), "pass".into());
        let printed = format!("{creds:?}");
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("pass\""));
    }
}
